use crate::reliability::BootstrapError;
use crate::sender::{ClientError, ErrorKind};
use thiserror::Error;

/// Top-level error type for the forwarder.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Client(#[from] ClientError),

    #[error("Resource bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("Format error: {0}")]
    Format(String),
}

impl ForwarderError {
    /// Backend classification of the underlying failure, if it came from the backend.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ForwarderError::Client(e) => Some(e.kind()),
            ForwarderError::Bootstrap(e) => Some(e.client_error().kind()),
            ForwarderError::Config(_) | ForwarderError::Format(_) => None,
        }
    }
}
