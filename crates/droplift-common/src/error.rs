//! Common error types used throughout droplift.
//!
//! Every failure is funnelled into [`Error`]. Callers that need to decide what
//! to do next (retry, give up, report a misconfiguration) ask
//! [`Error::class`] instead of matching on variants.

/// How a caller should react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The operation may succeed if attempted again later.
    Retryable,
    /// The operation failed for a reason that will not change on retry.
    NonRetryable,
    /// The configuration handed to the core cannot satisfy the request.
    Configuration,
}

/// Common error type for droplift.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file is still held open by another writer.
    #[error("File is locked: {0}")]
    FileLocked(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A custom uploader template could not be rendered or parsed.
    #[error("Template error [{host}]: {message}")]
    Template {
        /// Host name of the endpoint the template targets.
        host: String,
        /// Human-readable error description.
        message: String,
    },

    /// A backend rejected the upload (bad credentials, non-2xx status).
    #[error("Backend error [{service}]: {message}")]
    Backend {
        /// Display name of the backend.
        service: String,
        /// Human-readable error description.
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The configuration cannot satisfy the request.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external tool (ffmpeg) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The operation observed a cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error for retry / reporting decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::FileLocked(_) | Error::Io(_) | Error::Transport(_) => ErrorClass::Retryable,
            Error::Config(_) => ErrorClass::Configuration,
            Error::Template { .. }
            | Error::Backend { .. }
            | Error::Tool { .. }
            | Error::Cancelled
            | Error::Internal(_) => ErrorClass::NonRetryable,
        }
    }

    /// Shorthand for `class() == ErrorClass::Retryable`.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Template error attributed to `host`.
    pub fn template<H: Into<String>, S: Into<String>>(host: H, msg: S) -> Self {
        Self::Template {
            host: host.into(),
            message: msg.into(),
        }
    }

    /// Create a new Backend error attributed to `service`.
    pub fn backend<N: Into<String>, S: Into<String>>(service: N, msg: S) -> Self {
        Self::Backend {
            service: service.into(),
            message: msg.into(),
        }
    }

    /// Create a new Transport error.
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new Tool error.
    pub fn tool<T: Into<String>, S: Into<String>>(tool: T, msg: S) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
