use thiserror::Error;

pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;

/// Failures crossing the backend boundary.
///
/// Polls and actions treat every variant the same way: log it, surface a notice when a user
/// asked for the operation, and keep the last known good state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response arrived with a non-success status.
    #[error("backend responded with HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("unknown alert: {0}")]
    UnknownAlert(String),
}

impl ConsoleError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ConsoleError::Status {
            status,
            message: message.into(),
        }
    }

    /// Short label used in logs and notices.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsoleError::Transport(_) => "transport",
            ConsoleError::Status { .. } => "status",
            ConsoleError::Decode(_) => "decode",
            ConsoleError::UnknownAlert(_) => "unknown-alert",
        }
    }
}
