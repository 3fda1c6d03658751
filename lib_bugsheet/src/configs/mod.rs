//! # Configuration Modules
//!
//! Errors raised while loading startup inputs, and the credential file reader.
//! Anything in here fails before reconciliation begins.

/// Reads API keys from files on disk.
pub mod credentials;

use std::path::PathBuf;
use thiserror::Error;

pub use credentials::read_api_key;

/// Startup configuration failures. None of these are recoverable at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A file was read but its contents could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// The file that was being parsed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A credential file exists but holds no key.
    #[error("Credential file {0} is empty")]
    EmptyCredential(PathBuf),

    /// The team directory violates one of its invariants.
    #[error("Invalid team directory: {0}")]
    InvalidDirectory(String),

    /// A required setting was not provided by any configuration source.
    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    /// A setting was provided but its value is unusable.
    #[error("Invalid value for {name}: {message}")]
    InvalidSetting {
        /// Setting name.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// A configured endpoint is not a usable absolute URL.
    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint {
        /// The endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        message: String,
    },
}
