//! Unified error types for Stealthdriver

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Stealthdriver
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP or WebSocket connection/transport failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected protocol JSON
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation requires a target that does not exist
    #[error("No matching target: {0}")]
    NoTargets(String),

    /// Browser or driver session has been torn down
    #[error("Session ended: {0}")]
    SessionEnded(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Process supervision errors
    #[error("Process error: {0}")]
    Process(String),

    /// Driver patching errors
    #[error("Patcher error: {0}")]
    Patcher(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new no-targets error
    pub fn no_targets<S: Into<String>>(msg: S) -> Self {
        Error::NoTargets(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new process error
    pub fn process<S: Into<String>>(msg: S) -> Self {
        Error::Process(msg.into())
    }

    /// Create a new patcher error
    pub fn patcher<S: Into<String>>(msg: S) -> Self {
        Error::Patcher(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Classify a failure reported while talking to the browser handle.
    ///
    /// There is no distinct wire signal for "the session is gone": the driver
    /// reports it as an error whose message carries `invalid session id`.
    pub fn from_handle_failure<S: Into<String>>(msg: S) -> Self {
        let msg = msg.into();
        if msg.contains("invalid session id") {
            Error::SessionEnded(msg)
        } else {
            Error::Transport(msg)
        }
    }

    /// Whether this error means the browser session has ended
    pub fn is_session_ended(&self) -> bool {
        matches!(self, Error::SessionEnded(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
