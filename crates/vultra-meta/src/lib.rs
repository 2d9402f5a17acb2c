//! The `#pragma vultra` metadata mini-language and its relatives.
//!
//! Three line-oriented recognisers live here:
//!
//! - [`parse_vultra_metadata`]: scans shader source for `#pragma vultra ...`
//!   directives and produces a [`ParsedMetadata`];
//! - [`parse_engine_keywords`]: parses `.vkw` engine-keywords files
//!   (`keyword ...` declarations plus `set NAME=VALUE` assignments);
//! - [`eval_only_if`]: evaluates `only_if(...)` pruning constraints over a
//!   [`KeywordValueContext`].
//!
//! All three are strict: unknown directives, attributes, enumerants, or
//! malformed tokens fail with a `Parse` error carrying a 1-based line number
//! where one applies.

#![forbid(unsafe_code)]

mod decl;
mod expr;
mod metadata;
mod value;
mod vkw;

pub use crate::decl::parse_keyword_decl;
pub use crate::expr::{eval_only_if, KeywordValueContext};
pub use crate::metadata::{parse_vultra_metadata, ParamMeta, ParsedMetadata, TextureMeta};
pub use crate::value::{parse_bool_value, parse_keyword_value};
pub use crate::vkw::{load_engine_keywords, parse_engine_keywords, EngineKeywords};
