/// Error returned by a user-supplied converter function.
pub type ConvertError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Invalid registration or configuration: permanent, fix the setup.
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("cannot convert value from {from} to {to}")]
    Unconvertible { from: String, to: String },

    #[error("converter {from} -> {to} failed: {source}")]
    Converter {
        from: String,
        to: String,
        #[source]
        source: ConvertError,
    },

    #[error("transformer for field '{field}': {reason}")]
    Transformer { field: String, reason: String },

    #[error("sequence element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<CopyError>,
    },

    /// A value did not have the shape its Rust type expects.
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
}

impl CopyError {
    pub fn config(msg: impl Into<String>) -> Self {
        CopyError::Config(msg.into())
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CopyError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CopyError::Mismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// True for errors caused by misconfiguration rather than by the data.
    pub fn is_config(&self) -> bool {
        match self {
            CopyError::Config(_) | CopyError::InvalidPath { .. } | CopyError::Transformer { .. } => true,
            CopyError::Element { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// Add context to the error.
    ///
    /// Message-carrying variants get the context prepended.
    /// Other variants are returned unchanged.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            CopyError::Config(msg) => CopyError::Config(format!("{ctx}: {msg}")),
            CopyError::InvalidPath { path, reason } => CopyError::InvalidPath {
                path,
                reason: format!("{ctx}: {reason}"),
            },
            CopyError::Transformer { field, reason } => CopyError::Transformer {
                field,
                reason: format!("{ctx}: {reason}"),
            },
            other => other,
        }
    }
}
