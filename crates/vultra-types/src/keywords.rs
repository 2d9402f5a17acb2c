/// When a keyword's value is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum KeywordDispatch {
    /// Participates in build-time variant enumeration.
    Permutation = 0,
    /// Resolved at runtime; never baked into a binary.
    #[default]
    Runtime = 1,
    /// Intended for SPIR-V specialization constants; tracked like a
    /// permutation value but does not widen the variant set in v1.
    Specialization = 2,
}

/// Who owns a keyword's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum KeywordScope {
    #[default]
    ShaderLocal = 0,
    Global = 1,
    Material = 2,
    Pass = 3,
}

/// The shape of a keyword's value space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum KeywordValueKind {
    /// Values 0 or 1.
    #[default]
    Bool = 0,
    /// An index into [`KeywordDecl::enum_values`].
    Enum = 1,
}

/// A keyword declaration, from a `#pragma vultra keyword` line or a `.vkw`
/// file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordDecl {
    pub name: String,
    pub dispatch: KeywordDispatch,
    pub scope: KeywordScope,
    pub value_kind: KeywordValueKind,

    /// Bool: 0/1. Enum: index into `enum_values`.
    pub default_value: u32,

    /// Ordered enumerant names; only populated for enum keywords.
    pub enum_values: Vec<String>,

    /// Raw `only_if(...)` constraint text, evaluated during variant pruning.
    pub constraint: Option<String>,
}
