//! Network error types

use std::io;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with a failure status
    #[error("Request failed ({status} {code}): {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Server is shutting down")]
    ServerShutdown,
}

impl Error {
    /// Machine-readable code of a remote failure
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Error::Remote { code, .. } => Some(code),
            _ => None,
        }
    }
}
