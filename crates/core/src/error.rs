//! Errors raised by the merge pipeline.

use std::io;
use std::path::{Path, PathBuf};

use apiweave_common::ConfigError;
use thiserror::Error;

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that abort a merge run.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Invalid run configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network failure or non-success status while fetching a document.
    #[error("failed to fetch OpenAPI document from {url}: {reason}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Transport error or status line.
        reason: String,
    },

    /// The document body is not valid JSON (or YAML for local files).
    #[error("failed to parse OpenAPI document {origin}: {reason}")]
    Parse {
        /// URL or path the document came from.
        origin: String,
        /// Deserializer message.
        reason: String,
    },

    /// A generated source file could not be tokenized.
    #[error("failed to parse {}: {reason}", path.display())]
    Syntax {
        /// Offending file.
        path: PathBuf,
        /// Lexer or tree error.
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("failed to {action} {}: {error}", path.display())]
    Io {
        /// Verb for the message (`read`, `write`, ...).
        action: &'static str,
        /// Path operated on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: io::Error,
    },

    /// The per-service client generator failed.
    #[error("client generator failed for service '{service}': {reason}")]
    Generator {
        /// Service being generated.
        service: String,
        /// Spawn failure or exit status with stderr.
        reason: String,
    },

    /// A transport primitive the runtime module is built from was not generated.
    #[error("runtime primitive {name} not found in generated core files")]
    MissingRuntime {
        /// Declaration that was looked for.
        name: String,
    },
}

impl MergeError {
    /// Adapter for `map_err` on filesystem calls.
    pub fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |error| Self::Io {
            action,
            path,
            error,
        }
    }

    /// Attach `path` to a tokenizer error.
    pub fn syntax(path: &Path, err: &crate::ts::SyntaxError) -> Self {
        Self::Syntax {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}
