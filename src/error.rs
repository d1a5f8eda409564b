//! Error types for the OCI adapter layer.

use crate::native::NativeError;
use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Success sentinel of the two-level error contract.
pub const SQLSTATE_OK: &str = "00000";

/// Generic-failure sentinel of the two-level error contract.
pub const SQLSTATE_GENERAL_ERROR: &str = "HY000";

/// Error type for adapter operations.
///
/// Native commit/rollback failures are deliberately not represented here:
/// they are routine and reported through a boolean return so callers can
/// retry without exception-based control flow.
#[derive(Error, Debug)]
pub enum Error {
    /// The DSN could not be parsed as any supported form.
    #[error("Invalid DSN: {dsn}")]
    InvalidDsn { dsn: String },

    /// The native connect primitive produced no usable handle.
    #[error("Connection failed: {message}")]
    Connect { message: String },

    /// The native statement-parse primitive rejected the SQL text.
    #[error("Statement parse failed: ORA-{code:05}: {message}")]
    Prepare { code: i32, message: String },

    /// Transaction state violation (begin while active, commit/rollback
    /// while idle). Native state is untouched.
    #[error("{message}")]
    Transaction { message: String },

    /// Positional bind index outside the placeholder range.
    #[error("Bind index {index} out of range (placeholders: {count})")]
    Bind { index: usize, count: usize },

    /// Native error reported by a delegated primitive.
    #[error("ORA-{code:05}: {message}")]
    Native { code: i32, message: String },
}

impl Error {
    /// Create a transaction-state violation error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Wrap a native diagnostic pair.
    pub fn native(err: NativeError) -> Self {
        Self::Native {
            code: err.code,
            message: err.message,
        }
    }
}

/// Two-level error report: a state code plus optional native detail.
///
/// When no error occurred the state is [`SQLSTATE_OK`] and both native
/// fields are empty; otherwise the state is [`SQLSTATE_GENERAL_ERROR`] and
/// the native code and message carry the diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// State code, [`SQLSTATE_OK`] or [`SQLSTATE_GENERAL_ERROR`].
    pub state: &'static str,
    /// Native error code, if any.
    pub code: Option<i32>,
    /// Native error message, if any.
    pub message: Option<String>,
}

impl ErrorInfo {
    /// The no-error report.
    pub fn ok() -> Self {
        Self {
            state: SQLSTATE_OK,
            code: None,
            message: None,
        }
    }

    /// A report carrying native diagnostic detail.
    pub fn general(code: i32, message: impl Into<String>) -> Self {
        Self {
            state: SQLSTATE_GENERAL_ERROR,
            code: Some(code),
            message: Some(message.into()),
        }
    }

    /// Whether this report signals success.
    pub fn is_ok(&self) -> bool {
        self.state == SQLSTATE_OK
    }
}
