//! Error types for the harness
//!
//! Messages are meant to be read in a test report, so each one says which
//! command or handle was involved and what was expected.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Expectation Errors ===
    #[error("'{command}' output did not contain {expected:?}. Got:\n{output}")]
    ExpectationMismatch {
        command: String,
        expected: Vec<String>,
        output: String,
    },

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Cannot find 'main' in the backtrace")]
    MainFrameNotFound,

    #[error("Process should be in the '{expected}' state, instead the actual state is: '{actual}'")]
    UnexpectedState { expected: String, actual: String },

    // === Adapter Errors ===
    #[error("Debug adapter '{name}' not found. Searched: {searched}")]
    AdapterNotFound { name: String, searched: String },

    #[error("Debug adapter failed to start: {0}")]
    AdapterStartFailed(String),

    #[error("Debug adapter crashed unexpectedly")]
    AdapterCrashed,

    // === DAP Protocol Errors ===
    #[error("DAP protocol error: {0}")]
    DapProtocol(String),

    #[error("DAP request '{command}' failed: {message}")]
    DapRequestFailed { command: String, message: String },

    #[error("Adapter does not support '{0}'")]
    Unsupported(String),

    #[error("Failed to set breakpoint at {location}: {reason}")]
    BreakpointFailed { location: String, reason: String },

    // === Timeout Errors ===
    #[error("Timed out after {0} seconds waiting for the adapter to initialize")]
    InitializeTimeout(u64),

    #[error("Timed out after {0} seconds waiting for a stop event")]
    StopTimeout(u64),

    // === Helper Errors ===
    #[error("Failed to build helper program: {0}")]
    HelperBuild(String),

    #[error("Marker '{marker}' not found in {path}")]
    MarkerNotFound { marker: String, path: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an adapter not found error with search paths
    pub fn adapter_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::AdapterNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a DAP request failed error
    pub fn dap_request_failed(command: &str, message: &str) -> Self {
        Self::DapRequestFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a breakpoint failed error
    pub fn breakpoint_failed(location: &str, reason: &str) -> Self {
        Self::BreakpointFailed {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an expectation mismatch error
    pub fn mismatch(command: &str, expected: &[&str], output: &str) -> Self {
        Self::ExpectationMismatch {
            command: command.to_string(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
        }
    }

    /// Create an unexpected process state error
    pub fn unexpected_state(expected: &str, actual: &str) -> Self {
        Self::UnexpectedState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this error came from the debugger side rather than from a
    /// harness expectation
    pub fn is_debugger_failure(&self) -> bool {
        matches!(
            self,
            Self::AdapterNotFound { .. }
                | Self::AdapterStartFailed(_)
                | Self::AdapterCrashed
                | Self::DapProtocol(_)
                | Self::DapRequestFailed { .. }
                | Self::InitializeTimeout(_)
                | Self::StopTimeout(_)
        )
    }
}
