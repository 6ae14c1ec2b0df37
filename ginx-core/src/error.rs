//! Error types for ginx-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a watch configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file given on the command line does not exist.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and serde_yaml line context.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no source repository given; pass --source or set `source` in the config file")]
    MissingSource,

    #[error("branch name must not be empty")]
    EmptyBranch,

    #[error("poll interval must be at least one second")]
    ZeroInterval,

    #[error("command timeout must be at least one second")]
    ZeroTimeout,
}
