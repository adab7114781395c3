//! Error types for host conversations.
//!
//! One error family covers every failure a conversation can surface, so a
//! caller blocked on a background build sees the same exception kinds the
//! synchronous path raises. We use `thiserror` for `Display`/`Error` impls.
//!
//! Variants carry owned data (no `io::Error` payloads) because a build error
//! is stored once and re-raised to every waiter; `Error` must be `Clone`.

use thiserror::Error;

/// Result type alias for hostlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types raised by host conversations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// I/O failure on the underlying socket or stream
    #[error("I/O error: {0}")]
    Io(String),

    /// The host ended the conversation mid-exchange
    #[error("connection dropped: {0}")]
    ConnectionDropped(String),

    /// Authentication or authorization failure reported by the host
    #[error("security error: {0}")]
    Security(String),

    /// Structured escape message reported by the host
    #[error("server message {id}: {text}")]
    ServerMessage {
        /// Seven-character host message identifier
        id: String,
        /// First-level message text
        text: String,
        /// Second-level help text
        help: String,
    },

    /// The host rejected the request with a bare return code
    #[error("error completing request: return code {0:#06x}")]
    ErrorCompletingRequest(u16),

    /// The function is not available at the host's version level
    #[error("function not supported at this system level")]
    NotSupported,

    /// A blocking wait was interrupted
    #[error("operation interrupted")]
    Interrupted,

    /// Operation attempted in the wrong lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Caller supplied an out-of-range or malformed argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Protocol desync or other condition that should not occur
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl Error {
    /// True when this error came from the host rather than the local stack.
    pub fn is_host_reported(&self) -> bool {
        matches!(
            self,
            Error::ServerMessage { .. } | Error::ErrorCompletingRequest(_) | Error::NotSupported
        )
    }
}
