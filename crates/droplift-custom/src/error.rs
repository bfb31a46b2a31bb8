//! Error types for template parsing and rendering.

use thiserror::Error;

/// Errors produced while parsing or rendering a custom uploader template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A `{` was never closed.
    #[error("Unclosed placeholder starting at position {0}")]
    UnclosedPlaceholder(usize),

    /// A placeholder had no name (`{}` or `{:x}`).
    #[error("Empty placeholder at position {0}")]
    EmptyPlaceholder(usize),

    /// The placeholder names no known value or function.
    #[error("Unknown function or value '{0}'")]
    UnknownFunction(String),

    /// A function was called with too few arguments.
    #[error("Function '{function}' needs at least {min} argument(s)")]
    MissingArgument { function: &'static str, min: usize },

    /// A regex pattern did not compile.
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The response body is not JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required template field is empty.
    #[error("{0}")]
    Missing(&'static str),
}

impl TemplateError {
    /// Whether the failure came from decoding JSON.
    pub fn is_json(&self) -> bool {
        matches!(self, TemplateError::InvalidJson(_))
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
