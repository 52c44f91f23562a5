//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A service was listed but its document address is not set.
    #[error("missing required environment variable {var} for service '{service}'")]
    MissingEnv {
        /// Service id.
        service: String,
        /// Variable that was looked up.
        var: String,
    },

    /// The document address could not be interpreted.
    #[error("invalid spec source '{input}': {reason}")]
    InvalidSource {
        /// Raw value as given.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Service ids become directory names and identifier prefixes.
    #[error("invalid service id '{0}': expected [a-z][a-z0-9_-]*")]
    InvalidServiceId(String),

    /// Service ids must be unique.
    #[error("service '{0}' is listed more than once")]
    DuplicateService(String),

    /// A merge needs two or more services.
    #[error("at least two services are required, got {0}")]
    TooFewServices(usize),

    /// The dotenv file could not be read or parsed.
    #[error("failed to read dotenv file {}: {reason}", path.display())]
    Dotenv {
        /// Dotenv file.
        path: PathBuf,
        /// Read or parse failure.
        reason: String,
    },
}
