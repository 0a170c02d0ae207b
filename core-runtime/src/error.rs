//! Errors raised while wiring the runtime: bridge validation and logging
//! setup. Playback failures live in `core-playback`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value was rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A bridge the engine needs was not supplied by the host.
    #[error("Missing host bridge {capability}: {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Runtime error: {0}")]
    Internal(String),
}

impl Error {
    /// Name of the missing bridge, if this is a capability error.
    pub fn missing_capability(&self) -> Option<&str> {
        match self {
            Error::CapabilityMissing { capability, .. } => Some(capability),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
