//! ginx core library: domain types, configuration, working-copy paths.
//!
//! - [`types`]: watch target, commit refs, outcomes
//! - [`config`]: layered settings (file + flags + defaults)
//! - [`paths`]: deterministic working-copy directory
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::WatchSettings;
pub use error::ConfigError;
pub use types::{
    CommitRef, CycleReport, LocalCopy, ReconcileOutcome, RunSummary, SyncPath, WatchTarget,
};
