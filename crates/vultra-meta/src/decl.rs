//! The `keyword` declaration grammar, shared by the `#pragma vultra keyword`
//! directive and the `.vkw` file:
//!
//! ```text
//! keyword <dispatch> [<scope>] <NAME>[=<default-or-enumerants>] [only_if(<expr>)]
//! ```
//!
//! `dispatch` is `permute`, `runtime`, or `special`; the scope token is
//! optional and defaults to shader-local. A RHS of `0` or `1` declares a bool
//! keyword with that default; any other RHS is a `|`-separated enumerant list
//! (default: index 0). A trailing `only_if(...)` — which may contain spaces —
//! is kept as the raw constraint text.

use vultra_types::{Error, KeywordDecl, KeywordDispatch, KeywordScope, KeywordValueKind, Result};

fn parse_dispatch(token: &str) -> Option<KeywordDispatch> {
    match token {
        "permute" => Some(KeywordDispatch::Permutation),
        "runtime" => Some(KeywordDispatch::Runtime),
        "special" => Some(KeywordDispatch::Specialization),
        _ => None,
    }
}

fn parse_scope(token: &str) -> Option<KeywordScope> {
    match token {
        "global" => Some(KeywordScope::Global),
        "material" => Some(KeywordScope::Material),
        "pass" => Some(KeywordScope::Pass),
        "local" | "shader" | "shaderlocal" => Some(KeywordScope::ShaderLocal),
        _ => None,
    }
}

/// Parse a keyword declaration from whitespace-split tokens.
///
/// `tokens[0]` must be the literal `keyword`.
pub fn parse_keyword_decl(tokens: &[&str]) -> Result<KeywordDecl> {
    if tokens.first().copied() != Some("keyword") {
        return Err(Error::parse("expected a keyword declaration"));
    }
    if tokens.len() < 3 {
        return Err(Error::parse("keyword declaration is too short"));
    }

    let mut decl = KeywordDecl::default();

    decl.dispatch = parse_dispatch(tokens[1])
        .ok_or_else(|| Error::parse(format!("unknown keyword dispatch: {}", tokens[1])))?;

    let mut idx = 2;
    if let Some(scope) = parse_scope(tokens[idx]) {
        decl.scope = scope;
        idx += 1;
    }

    let name_token = *tokens
        .get(idx)
        .ok_or_else(|| Error::parse("keyword declaration requires a name"))?;
    idx += 1;

    let (name, rhs) = match name_token.split_once('=') {
        Some((name, rhs)) => (name, rhs),
        None => (name_token, ""),
    };
    if name.is_empty() {
        return Err(Error::parse("keyword declaration requires a name"));
    }
    decl.name = name.to_owned();

    match rhs {
        "" => {}
        "0" | "1" => {
            decl.value_kind = KeywordValueKind::Bool;
            decl.default_value = u32::from(rhs == "1");
        }
        enumerants => {
            decl.value_kind = KeywordValueKind::Enum;
            decl.enum_values = enumerants
                .split('|')
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect();
            if decl.enum_values.is_empty() {
                return Err(Error::parse(format!(
                    "enum keyword '{}' has no enumerants",
                    decl.name
                )));
            }
            decl.default_value = 0;
        }
    }

    // A trailing constraint may span several tokens; everything after the
    // name is taken verbatim.
    if idx < tokens.len() {
        let trailing = tokens[idx..].join(" ");
        if !trailing.starts_with("only_if") {
            return Err(Error::parse(format!(
                "unexpected token after keyword '{}': {}",
                decl.name, tokens[idx]
            )));
        }
        decl.constraint = Some(trailing);
    }

    Ok(decl)
}
