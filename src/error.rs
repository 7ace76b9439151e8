//! Error types for aptbridge
//!
//! Two layers live here:
//! - [`BridgeError`]: the canonical `{message, code, details}` shape every
//!   facade entry point rejects with.
//! - [`AppError`]: errors of the surrounding CLI (config loading, IO,
//!   output), which may wrap a `BridgeError`.
//!
//! [`RawFailure`] is the input side of the error translator: every failure
//! value the executor or facade can observe, before canonicalization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for facade operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type alias for the CLI and config layers
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PackageNotFound,
    InvalidInput,
    CacheError,
    Locked,
    PermissionDenied,
    CommandFailed,
    ParseError,
    Timeout,
    UnknownError,
    /// Backend-declared code passed through verbatim
    Other(String),
}

impl ErrorCode {
    /// String form as it appears on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Self::PackageNotFound => "PACKAGE_NOT_FOUND",
            Self::InvalidInput => "INVALID_INPUT",
            Self::CacheError => "CACHE_ERROR",
            Self::Locked => "LOCKED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::CommandFailed => "COMMAND_FAILED",
            Self::ParseError => "PARSE_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Other(code) => code,
        }
    }

    /// Parse a wire code, keeping unknown codes as [`ErrorCode::Other`]
    pub fn from_wire(code: &str) -> Self {
        match code {
            "PACKAGE_NOT_FOUND" => Self::PackageNotFound,
            "INVALID_INPUT" => Self::InvalidInput,
            "CACHE_ERROR" => Self::CacheError,
            "LOCKED" => Self::Locked,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "COMMAND_FAILED" => Self::CommandFailed,
            "PARSE_ERROR" => Self::ParseError,
            "TIMEOUT" => Self::Timeout,
            "UNKNOWN_ERROR" => Self::UnknownError,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&code))
    }
}

/// Canonical error returned by every bridge operation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct BridgeError {
    /// Human-readable message
    pub message: String,

    /// Machine-readable code
    pub code: ErrorCode,

    /// Optional technical details (stderr, exit status, offending value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl BridgeError {
    /// Create an error without details
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            details: None,
        }
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Create an INVALID_INPUT error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a PARSE_ERROR error
    pub fn parse(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message).with_details(details)
    }

    /// Create a TIMEOUT error
    pub fn timeout(command: &str, secs: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Command '{}' timed out after {}s", command, secs),
        )
    }

    /// Check the error code
    pub fn is(&self, code: &ErrorCode) -> bool {
        &self.code == code
    }
}

/// Process exit descriptor reported by the executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFailure {
    /// Exit status, if the process exited normally
    pub exit_status: Option<i32>,

    /// Terminating signal, if the process was killed
    pub signal: Option<i32>,

    /// Human-readable reason supplied by the spawning layer
    pub reason: Option<String>,

    /// Captured stderr text
    pub stderr: String,
}

/// Any failure value observed before translation
#[derive(Debug, Clone)]
pub enum RawFailure {
    /// Already canonical
    Canonical(BridgeError),

    /// Arbitrary JSON value (object, string, number, null, ...)
    Value(serde_json::Value),

    /// Process exited unsuccessfully or was killed
    Process(ProcessFailure),

    /// Generic error message (IO errors, internal failures)
    Message(String),
}

impl From<BridgeError> for RawFailure {
    fn from(err: BridgeError) -> Self {
        Self::Canonical(err)
    }
}

impl From<serde_json::Value> for RawFailure {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl From<ProcessFailure> for RawFailure {
    fn from(failure: ProcessFailure) -> Self {
        Self::Process(failure)
    }
}

impl From<std::io::Error> for RawFailure {
    fn from(err: std::io::Error) -> Self {
        Self::Message(err.to_string())
    }
}

impl From<&str> for RawFailure {
    fn from(s: &str) -> Self {
        Self::Value(serde_json::Value::String(s.to_string()))
    }
}

/// Errors of the command-line front end
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out waiting for the package manager lock after {0}s")]
    LockWaitTimeout(u64),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl AppError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Bridge(e) => match e.code {
                ErrorCode::Locked => {
                    Some("Another package manager is running. Try: aptbridge wait-unlocked")
                }
                ErrorCode::PermissionDenied => {
                    Some("Mutating commands need administrator rights (see bridge.elevation_program)")
                }
                ErrorCode::Timeout => Some("Raise bridge.query_timeout_secs in the config"),
                _ => None,
            },
            Self::LockWaitTimeout(_) => Some("Check for a running apt, dpkg or unattended-upgrades"),
            _ => None,
        }
    }
}
