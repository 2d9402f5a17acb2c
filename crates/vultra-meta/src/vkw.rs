//! The `.vkw` engine-keywords file.
//!
//! Line oriented; blank lines and `#` comments are ignored. Two directives:
//!
//! ```text
//! keyword <dispatch> [<scope>] <NAME>[=<default-or-enumerants>]
//! set <NAME>=<VALUE>
//! ```
//!
//! `set` records the raw value string; interpretation happens later against
//! the matching declaration. Duplicate `set`s overwrite in file order.

use std::collections::BTreeMap;
use std::path::Path;

use vultra_types::{Error, KeywordDecl, Result};

use crate::decl::parse_keyword_decl;

/// Parsed contents of a `.vkw` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineKeywords {
    /// Declarations in file order.
    pub decls: Vec<KeywordDecl>,
    /// Raw `set` assignments, name to unparsed value string.
    pub values: BTreeMap<String, String>,
}

impl EngineKeywords {
    /// The raw value assigned to `name`, if any.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

fn prefix_line(line_no: usize, err: Error) -> Error {
    Error::parse(format!("vkw line {line_no}: {err}"))
}

/// Parse `.vkw` text.
pub fn parse_engine_keywords(text: &str) -> Result<EngineKeywords> {
    let mut out = EngineKeywords::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            "keyword" => {
                let decl = parse_keyword_decl(&tokens).map_err(|e| prefix_line(line_no, e))?;
                out.decls.push(decl);
            }
            "set" => {
                let assignment = tokens.get(1).copied().ok_or_else(|| {
                    Error::parse(format!("vkw line {line_no}: set requires NAME=VALUE"))
                })?;
                let (name, value) = assignment.split_once('=').ok_or_else(|| {
                    Error::parse(format!("vkw line {line_no}: set requires NAME=VALUE"))
                })?;
                out.values.insert(name.to_owned(), value.to_owned());
            }
            other => {
                return Err(Error::parse(format!(
                    "vkw line {line_no}: unknown directive: {other}"
                )));
            }
        }
    }

    Ok(out)
}

/// Read and parse a `.vkw` file.
pub fn load_engine_keywords(path: &Path) -> Result<EngineKeywords> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read vkw file {}: {e}", path.display())))?;
    parse_engine_keywords(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vultra_types::{KeywordDispatch, KeywordScope, KeywordValueKind};

    #[test]
    fn parses_declarations_and_assignments() {
        let text = "\
# engine-wide keywords
keyword permute global SHADOW_QUALITY=LOW|MEDIUM|HIGH

keyword runtime global FOG=0
set SHADOW_QUALITY=HIGH
set FOG=1
";
        let kw = parse_engine_keywords(text).unwrap();
        assert_eq!(kw.decls.len(), 2);
        assert_eq!(kw.decls[0].name, "SHADOW_QUALITY");
        assert_eq!(kw.decls[0].dispatch, KeywordDispatch::Permutation);
        assert_eq!(kw.decls[0].scope, KeywordScope::Global);
        assert_eq!(kw.decls[0].value_kind, KeywordValueKind::Enum);
        assert_eq!(kw.value("SHADOW_QUALITY"), Some("HIGH"));
        assert_eq!(kw.value("FOG"), Some("1"));
        assert_eq!(kw.value("MISSING"), None);
    }

    #[test]
    fn later_set_wins() {
        let kw = parse_engine_keywords("set A=1\nset A=2\n").unwrap();
        assert_eq!(kw.value("A"), Some("2"));
    }

    #[test]
    fn set_value_is_not_interpreted() {
        let kw = parse_engine_keywords("set MODE=not|parsed|here\n").unwrap();
        assert_eq!(kw.value("MODE"), Some("not|parsed|here"));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_engine_keywords("set\n").is_err());
        assert!(parse_engine_keywords("set NOVALUE\n").is_err());
        assert!(parse_engine_keywords("frobnicate A=1\n").is_err());
        assert!(parse_engine_keywords("keyword bogus NAME=0\n").is_err());
    }

    #[test]
    fn error_names_the_line() {
        let err = parse_engine_keywords("# fine\n\nset broken\n").unwrap_err();
        assert!(matches!(&err, Error::Parse(m) if m.contains("line 3")), "{err}");
    }
}
