//! Error types used throughout this crate.

use thiserror::Error;

/// Wrapper result type for `std::result::Result`.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure, independent of its underlying cause.
///
/// Mirrors the error-kind taxonomy used to decide how a failure is reported
/// and whether it is fatal to the whole process or just to one task.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidArgument,
    PortExhausted,
    ConnectFailure,
    ProtocolViolation,
    Deserialization,
    Io,
}

/// The error type used throughout this crate.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn wrapped<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::wrapped(ErrorKind::Io, "I/O failure", e)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::wrapped(ErrorKind::Deserialization, "failed to (de)serialize packet", e)
    }
}
