//! The `only_if(...)` constraint evaluator.
//!
//! A tiny recursive-descent engine over keyword values:
//!
//! ```text
//! expr    := or
//! or      := and ('||' and)*
//! and     := cmp ('&&' cmp)*
//! cmp     := primary (('==' | '!=') primary)?
//! primary := IDENT | NUMBER | 'true' | 'false' | '(' expr ')'
//! ```
//!
//! Identifier resolution, in order: the reserved words `true`/`false` (any
//! case), a keyword's current value by name, then an enumerant name looked up
//! across all enum declarations in the context (declaration order, first
//! match wins). A `cmp` without a comparator treats its value as boolean
//! (non-zero is true).

use std::collections::BTreeMap;

use vultra_types::{Error, KeywordDecl, KeywordValueKind, Result};

/// Keyword values and declarations visible to a constraint.
#[derive(Debug, Clone, Default)]
pub struct KeywordValueContext<'a> {
    values: BTreeMap<&'a str, u32>,
    decls: Vec<&'a KeywordDecl>,
}

impl<'a> KeywordValueContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration together with its resolved numeric value.
    pub fn insert(&mut self, decl: &'a KeywordDecl, value: u32) {
        self.values.insert(decl.name.as_str(), value);
        self.decls.push(decl);
    }

    /// Current numeric value of a keyword.
    pub fn value(&self, name: &str) -> Option<u32> {
        self.values.get(name).copied()
    }

    /// Resolve an enumerant name against the enum declarations, in
    /// declaration order.
    fn resolve_enumerant(&self, name: &str) -> Option<u32> {
        for decl in &self.decls {
            if decl.value_kind != KeywordValueKind::Enum {
                continue;
            }
            if let Some(index) = decl.enum_values.iter().position(|v| v == name) {
                return Some(index as u32);
            }
        }
        None
    }
}

/// Evaluate a constraint, wrapped (`only_if(<expr>)`) or bare (`<expr>`).
///
/// An empty constraint is vacuously true.
pub fn eval_only_if(constraint: &str, ctx: &KeywordValueContext<'_>) -> Result<bool> {
    let expr = strip_only_if(constraint);
    if expr.is_empty() {
        return Ok(true);
    }

    let mut parser = Parser::new(expr, ctx)?;
    let value = parser.parse_or()?;
    if parser.current != Token::End {
        return Err(Error::parse("trailing tokens in only_if expression"));
    }
    Ok(value)
}

fn strip_only_if(constraint: &str) -> &str {
    let s = constraint.trim();
    if let Some(rest) = s.strip_prefix("only_if") {
        // Accept only a well-formed wrapper; anything else is evaluated as a
        // bare expression and will fail identifier resolution.
        let rest = rest.trim_start();
        if let Some(inner) = rest.strip_prefix('(') {
            if let Some(inner) = inner.strip_suffix(')') {
                return inner.trim();
            }
        }
    }
    s
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    End,
    Ident(String),
    Number(u32),
    LParen,
    RParen,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
}

struct Lexer<'s> {
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn new(s: &'s str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn next(&mut self) -> Result<Token> {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let Some(&c) = self.bytes.get(self.pos) else {
            return Ok(Token::End);
        };

        let two = |lexer: &Lexer<'_>| lexer.bytes.get(lexer.pos + 1).copied();
        match c {
            b'(' => {
                self.pos += 1;
                Ok(Token::LParen)
            }
            b')' => {
                self.pos += 1;
                Ok(Token::RParen)
            }
            b'=' if two(self) == Some(b'=') => {
                self.pos += 2;
                Ok(Token::EqEq)
            }
            b'!' if two(self) == Some(b'=') => {
                self.pos += 2;
                Ok(Token::NotEq)
            }
            b'&' if two(self) == Some(b'&') => {
                self.pos += 2;
                Ok(Token::AndAnd)
            }
            b'|' if two(self) == Some(b'|') => {
                self.pos += 2;
                Ok(Token::OrOr)
            }
            b'0'..=b'9' => {
                let start = self.pos;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(u8::is_ascii_digit)
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
                let value = text
                    .parse::<u32>()
                    .map_err(|_| Error::parse(format!("number out of range in only_if: {text}")))?;
                Ok(Token::Number(value))
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_')
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| Error::parse("non-ASCII identifier in only_if"))?;
                Ok(Token::Ident(text.to_owned()))
            }
            other => Err(Error::parse(format!(
                "unexpected character in only_if expression: {}",
                char::from(other)
            ))),
        }
    }
}

struct Parser<'s, 'c> {
    lexer: Lexer<'s>,
    current: Token,
    ctx: &'c KeywordValueContext<'c>,
}

impl<'s, 'c> Parser<'s, 'c> {
    fn new(expr: &'s str, ctx: &'c KeywordValueContext<'c>) -> Result<Self> {
        let mut lexer = Lexer::new(expr);
        let current = lexer.next()?;
        Ok(Self { lexer, current, ctx })
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next()?;
        Ok(())
    }

    fn resolve_ident(&self, name: &str) -> Result<u32> {
        if name.eq_ignore_ascii_case("true") {
            return Ok(1);
        }
        if name.eq_ignore_ascii_case("false") {
            return Ok(0);
        }
        if let Some(value) = self.ctx.value(name) {
            return Ok(value);
        }
        if let Some(index) = self.ctx.resolve_enumerant(name) {
            return Ok(index);
        }
        Err(Error::parse(format!("unknown identifier in only_if: {name}")))
    }

    fn parse_primary(&mut self) -> Result<u32> {
        match self.current.clone() {
            Token::Ident(name) => {
                self.advance()?;
                self.resolve_ident(&name)
            }
            Token::Number(value) => {
                self.advance()?;
                Ok(value)
            }
            Token::LParen => {
                self.advance()?;
                let value = self.parse_or()?;
                if self.current != Token::RParen {
                    return Err(Error::parse("expected ')' in only_if expression"));
                }
                self.advance()?;
                Ok(u32::from(value))
            }
            _ => Err(Error::parse("expected a value in only_if expression")),
        }
    }

    fn parse_cmp(&mut self) -> Result<bool> {
        let lhs = self.parse_primary()?;
        match self.current {
            Token::EqEq => {
                self.advance()?;
                let rhs = self.parse_primary()?;
                Ok(lhs == rhs)
            }
            Token::NotEq => {
                self.advance()?;
                let rhs = self.parse_primary()?;
                Ok(lhs != rhs)
            }
            _ => Ok(lhs != 0),
        }
    }

    fn parse_and(&mut self) -> Result<bool> {
        let mut value = self.parse_cmp()?;
        while self.current == Token::AndAnd {
            self.advance()?;
            let rhs = self.parse_cmp()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_or(&mut self) -> Result<bool> {
        let mut value = self.parse_and()?;
        while self.current == Token::OrOr {
            self.advance()?;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vultra_types::KeywordDispatch;

    fn decls() -> Vec<KeywordDecl> {
        vec![
            KeywordDecl {
                name: "SURFACE".to_owned(),
                dispatch: KeywordDispatch::Permutation,
                value_kind: KeywordValueKind::Enum,
                enum_values: vec![
                    "OPAQUE".to_owned(),
                    "CUTOUT".to_owned(),
                    "TRANSPARENT".to_owned(),
                ],
                ..KeywordDecl::default()
            },
            KeywordDecl {
                name: "USE_SHADOW".to_owned(),
                dispatch: KeywordDispatch::Permutation,
                ..KeywordDecl::default()
            },
        ]
    }

    fn ctx<'a>(decls: &'a [KeywordDecl], values: &[u32]) -> KeywordValueContext<'a> {
        let mut ctx = KeywordValueContext::new();
        for (decl, &value) in decls.iter().zip(values) {
            ctx.insert(decl, value);
        }
        ctx
    }

    #[test]
    fn comparison_against_enumerant() {
        let decls = decls();
        let c = ctx(&decls, &[1, 1]);
        assert!(eval_only_if("only_if(SURFACE==CUTOUT && USE_SHADOW)", &c).unwrap());

        let c = ctx(&decls, &[1, 0]);
        assert!(!eval_only_if("only_if(SURFACE==CUTOUT && USE_SHADOW)", &c).unwrap());

        let c = ctx(&decls, &[1, 1]);
        assert!(eval_only_if("only_if(SURFACE==OPAQUE || USE_SHADOW)", &c).unwrap());
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        let decls = decls();
        let c = ctx(&decls, &[0, 0]);
        assert!(eval_only_if("only_if(UNKNOWN)", &c).is_err());
    }

    #[test]
    fn bare_expression_and_wrapped_form_agree() {
        let decls = decls();
        let c = ctx(&decls, &[2, 0]);
        assert_eq!(
            eval_only_if("SURFACE==TRANSPARENT", &c).unwrap(),
            eval_only_if("only_if(SURFACE==TRANSPARENT)", &c).unwrap()
        );
    }

    #[test]
    fn empty_constraint_is_true() {
        let c = KeywordValueContext::new();
        assert!(eval_only_if("", &c).unwrap());
        assert!(eval_only_if("   ", &c).unwrap());
    }

    #[test]
    fn precedence_and_parentheses() {
        let decls = decls();
        // SURFACE=OPAQUE(0), USE_SHADOW=1.
        let c = ctx(&decls, &[0, 1]);
        // && binds tighter than ||.
        assert!(eval_only_if("USE_SHADOW || SURFACE==CUTOUT && false", &c).unwrap());
        assert!(!eval_only_if("(USE_SHADOW || SURFACE==CUTOUT) && false", &c).unwrap());
        assert!(eval_only_if("SURFACE != CUTOUT", &c).unwrap());
    }

    #[test]
    fn reserved_words_any_case() {
        let c = KeywordValueContext::new();
        assert!(eval_only_if("true", &c).unwrap());
        assert!(eval_only_if("TRUE", &c).unwrap());
        assert!(!eval_only_if("False", &c).unwrap());
        assert!(eval_only_if("1", &c).unwrap());
        assert!(!eval_only_if("0", &c).unwrap());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let decls = decls();
        let c = ctx(&decls, &[0, 1]);
        assert!(eval_only_if("USE_SHADOW extra", &c).is_err());
        assert!(eval_only_if("USE_SHADOW @", &c).is_err());
        assert!(eval_only_if("(USE_SHADOW", &c).is_err());
        assert!(eval_only_if("==", &c).is_err());
    }

    #[test]
    fn enumerant_lookup_prefers_declaration_order() {
        let mut a = KeywordDecl {
            name: "A".to_owned(),
            value_kind: KeywordValueKind::Enum,
            enum_values: vec!["X".to_owned(), "SHARED".to_owned()],
            ..KeywordDecl::default()
        };
        let b = KeywordDecl {
            name: "B".to_owned(),
            value_kind: KeywordValueKind::Enum,
            enum_values: vec!["SHARED".to_owned()],
            ..KeywordDecl::default()
        };
        a.dispatch = KeywordDispatch::Permutation;

        let mut c = KeywordValueContext::new();
        c.insert(&a, 0);
        c.insert(&b, 0);
        // SHARED resolves through A (index 1), not B (index 0).
        assert!(eval_only_if("SHARED == 1", &c).unwrap());
    }
}
