//! Errors raised while loading `c2cpp.toml`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Well-formed, but asks for something the translator cannot do.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
