use std::{error::Error, fmt, io};

use crate::participant::ClientId;

/// The sampler's result type.
pub type Result<T> = std::result::Result<T, SamplerError>;

/// All errors that can occur while registering, scoring or sampling participants.
#[derive(Debug)]
pub enum SamplerError {
    /// The operation referenced a participant or arm that was never registered.
    NotFound { what: &'static str, id: ClientId },
    /// A host id with no assignment was queried.
    UnknownHost(usize),
    /// A ratio was requested over an empty host assignment.
    DivideByZero { what: &'static str },
    /// No eligible participant was found within the retry budget.
    Exhausted { host_id: usize, retries: usize },
    /// Invalid configuration, caught at construction time.
    InvalidConfig(String),
    /// Failed to read a configuration or trace file.
    Io(io::Error),
    /// Failed to parse a configuration or trace document.
    Parse(serde_json::Error),
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what, id } => write!(f, "{what} {id} not found"),
            Self::UnknownHost(host_id) => write!(f, "no clients assigned to host {host_id}"),
            Self::DivideByZero { what } => write!(f, "division by zero computing {what}"),
            Self::Exhausted { host_id, retries } => write!(
                f,
                "no eligible client for host {host_id} after {retries} retries"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
        }
    }
}

impl Error for SamplerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SamplerError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SamplerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<SamplerError> for io::Error {
    fn from(value: SamplerError) -> Self {
        match value {
            SamplerError::Io(e) => e,
            SamplerError::Parse(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            other => io::Error::other(other),
        }
    }
}
