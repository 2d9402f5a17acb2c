use thiserror::Error;

/// Crate-wide result alias used by every vultra crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy shared across the whole toolchain.
///
/// Errors propagate upward unchanged: the build driver never translates one
/// kind into another, so a `Parse` error raised deep inside the metadata
/// parser is still a `Parse` error at the CLI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A path could not be opened, read, written, or renamed.
    #[error("io error: {0}")]
    Io(String),
    /// Caller-supplied arguments violate a contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Metadata, keywords file, or constraint expression is malformed, or
    /// strict material validation failed.
    #[error("parse error: {0}")]
    Parse(String),
    /// The external compiler rejected the source.
    #[error("compile error: {0}")]
    Compile(String),
    /// The external reflector rejected the SPIR-V.
    #[error("reflect error: {0}")]
    Reflect(String),
    /// A `.vshbin`/`.vshlib` image could not be produced.
    #[error("serialize error: {0}")]
    Serialize(String),
    /// Bytes violate the `.vshbin`/`.vshlib` format contract.
    #[error("deserialize error: {0}")]
    Deserialize(String),
}

impl Error {
    pub fn io(context: impl Into<String>) -> Self {
        Self::Io(context.into())
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Self::InvalidArgument(context.into())
    }

    pub fn parse(context: impl Into<String>) -> Self {
        Self::Parse(context.into())
    }

    pub fn compile(context: impl Into<String>) -> Self {
        Self::Compile(context.into())
    }

    pub fn reflect(context: impl Into<String>) -> Self {
        Self::Reflect(context.into())
    }

    pub fn serialize(context: impl Into<String>) -> Self {
        Self::Serialize(context.into())
    }

    pub fn deserialize(context: impl Into<String>) -> Self {
        Self::Deserialize(context.into())
    }

    /// Short stable name of the error kind, used for exit-code mapping and
    /// log fields.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::Parse(_) => "parse",
            Self::Compile(_) => "compile",
            Self::Reflect(_) => "reflect",
            Self::Serialize(_) => "serialize",
            Self::Deserialize(_) => "deserialize",
        }
    }
}
