//! Parsing of raw keyword value strings against a declaration.

use vultra_types::{Error, KeywordDecl, KeywordValueKind, Result};

/// Parse a bool keyword value string.
///
/// The empty string means "defined without a value" and counts as 1, so
/// `-D USE_SHADOW` behaves like `-D USE_SHADOW=1`.
pub fn parse_bool_value(raw: &str) -> Option<u32> {
    match raw {
        "" | "1" | "true" | "TRUE" | "True" => Some(1),
        "0" | "false" | "FALSE" | "False" => Some(0),
        _ => None,
    }
}

/// Resolve a raw value string to a numeric keyword value.
///
/// Bool keywords accept `0`/`1`/`true`/`false` spellings. Enum keywords
/// accept an enumerant name or a numeric index in range; the empty string
/// resolves to the declared default.
pub fn parse_keyword_value(decl: &KeywordDecl, raw: &str) -> Result<u32> {
    if decl.value_kind == KeywordValueKind::Bool {
        return parse_bool_value(raw).ok_or_else(|| {
            Error::parse(format!("invalid bool value for keyword '{}'", decl.name))
        });
    }

    if raw.is_empty() {
        return Ok(decl.default_value);
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return match raw.parse::<u32>() {
            Ok(index) if (index as usize) < decl.enum_values.len() => Ok(index),
            _ => Err(Error::parse(format!(
                "enum index out of range for keyword '{}'",
                decl.name
            ))),
        };
    }

    decl.enum_values
        .iter()
        .position(|v| v == raw)
        .map(|index| index as u32)
        .ok_or_else(|| {
            Error::parse(format!(
                "unknown enum value '{raw}' for keyword '{}'",
                decl.name
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vultra_types::KeywordDispatch;

    fn enum_decl() -> KeywordDecl {
        KeywordDecl {
            name: "SURFACE".to_owned(),
            dispatch: KeywordDispatch::Permutation,
            value_kind: KeywordValueKind::Enum,
            enum_values: vec!["OPAQUE".to_owned(), "CUTOUT".to_owned()],
            default_value: 1,
            ..KeywordDecl::default()
        }
    }

    fn bool_decl() -> KeywordDecl {
        KeywordDecl {
            name: "USE_SHADOW".to_owned(),
            ..KeywordDecl::default()
        }
    }

    #[test]
    fn bool_spellings() {
        for raw in ["", "1", "true", "TRUE", "True"] {
            assert_eq!(parse_keyword_value(&bool_decl(), raw).unwrap(), 1);
        }
        for raw in ["0", "false", "FALSE", "False"] {
            assert_eq!(parse_keyword_value(&bool_decl(), raw).unwrap(), 0);
        }
        assert!(parse_keyword_value(&bool_decl(), "yes").is_err());
    }

    #[test]
    fn enum_accepts_name_or_index() {
        assert_eq!(parse_keyword_value(&enum_decl(), "OPAQUE").unwrap(), 0);
        assert_eq!(parse_keyword_value(&enum_decl(), "CUTOUT").unwrap(), 1);
        assert_eq!(parse_keyword_value(&enum_decl(), "0").unwrap(), 0);
        assert_eq!(parse_keyword_value(&enum_decl(), "1").unwrap(), 1);
    }

    #[test]
    fn enum_empty_resolves_to_default() {
        assert_eq!(parse_keyword_value(&enum_decl(), "").unwrap(), 1);
    }

    #[test]
    fn enum_rejects_out_of_range_and_unknown() {
        assert!(parse_keyword_value(&enum_decl(), "2").is_err());
        assert!(parse_keyword_value(&enum_decl(), "99999999999").is_err());
        assert!(parse_keyword_value(&enum_decl(), "GLASS").is_err());
    }
}
