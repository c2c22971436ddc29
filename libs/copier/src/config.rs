use serde::Deserialize;

use crate::error::CopyError;

/// What happens when a value cannot be converted into the destination type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeErrorPolicy {
    /// Leave the destination at its zero value and keep going.
    #[default]
    Ignore,
    /// Fail the mapping call with a descriptive error.
    Strict,
}

impl TypeErrorPolicy {
    pub fn from_ignore(ignore_type_errors: bool) -> Self {
        if ignore_type_errors {
            TypeErrorPolicy::Ignore
        } else {
            TypeErrorPolicy::Strict
        }
    }
}

/// One source field mapped to one or more destination fields.
///
/// Names are plain field names or dotted paths (`"order.customer.id"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenamePair {
    pub origin: String,
    pub targets: Vec<String>,
}

impl RenamePair {
    pub fn new<I, T>(origin: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            origin: origin.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Copier settings that can live in a file. Converters and transformers are
/// code and are registered on the builder.
#[derive(Debug, Clone, Deserialize)]
pub struct CopierConfig {
    #[serde(default = "default_ignore_type_errors")]
    pub ignore_type_errors: bool,

    #[serde(default)]
    pub skip_zero_values: bool,

    #[serde(default)]
    pub renames: Vec<RenamePair>,
}

fn default_ignore_type_errors() -> bool {
    true
}

impl Default for CopierConfig {
    fn default() -> Self {
        Self {
            ignore_type_errors: default_ignore_type_errors(),
            skip_zero_values: false,
            renames: Vec::new(),
        }
    }
}

impl CopierConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, CopyError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CopyError::config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, CopyError> {
        toml::from_str(toml_str).map_err(|e| CopyError::config(e.to_string()))
    }

    /// Parse configuration from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, CopyError> {
        serde_json::from_str(json).map_err(|e| CopyError::config(e.to_string()))
    }

    pub fn policy(&self) -> TypeErrorPolicy {
        TypeErrorPolicy::from_ignore(self.ignore_type_errors)
    }
}
