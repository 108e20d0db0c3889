/// Errors raised by a transport implementation before they are normalized for
/// the public turn stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The endpoint answered with a non-success HTTP status.
    #[error("endpoint returned status {status}: {message}")]
    Http { status: u16, message: String },
    /// The request could not be sent at all.
    #[error("request failed: {message}")]
    Connect { message: String },
    /// Reading the response byte stream failed mid-turn.
    #[error("stream read failed: {message}")]
    Read { message: String },
}

impl TransportError {
    /// Creates an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a connection-level error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a mid-stream read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. }
            | Self::Connect { message }
            | Self::Read { message } => message,
        }
    }
}

/// Terminal turn failure sent through `TurnEvent::Error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum TurnFailure {
    /// The server reported a failure on the event stream itself.
    #[error("upstream failure: {message}")]
    Upstream {
        message: String,
        channel: Option<String>,
    },
    /// Network or stream transport failed.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The stream ended without any conclusive event to resolve the turn.
    #[error("inconclusive stream: {message}")]
    Inconclusive { message: String },
    /// No bytes arrived within the configured idle timeout.
    #[error("stream stalled after {idle_ms}ms without data")]
    Stalled { idle_ms: u64 },
    /// The turn was cancelled by the caller.
    #[error("turn cancelled")]
    Cancelled,
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuddyError {
    /// Invalid client/transport configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input to the builder API.
    #[error("validation error: {0}")]
    Validation(String),
    /// Transport error surfaced outside an established turn stream.
    #[error(transparent)]
    Transport(TransportError),
    /// Terminal failure returned from a started turn.
    #[error(transparent)]
    TurnFailed(TurnFailure),
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl BuddyError {
    pub(crate) fn turn_failed(failure: TurnFailure) -> Self {
        Self::TurnFailed(failure)
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<TurnFailure> for BuddyError {
    fn from(value: TurnFailure) -> Self {
        BuddyError::TurnFailed(value)
    }
}

pub(crate) fn turn_failure_from_transport_error(err: &TransportError) -> TurnFailure {
    match err {
        TransportError::Http { status, message } => TurnFailure::Upstream {
            message: format!("status {status}: {message}"),
            channel: None,
        },
        TransportError::Connect { message } | TransportError::Read { message } => {
            TurnFailure::Transport {
                message: message.clone(),
            }
        }
    }
}
