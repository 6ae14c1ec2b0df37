//! Domain types for the ginx watch-reconcile loop.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque commit identifier as reported by the VCS.
///
/// Only equality is meaningful; no ordering between commits is modeled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitRef(pub String);

impl CommitRef {
    /// First seven characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(7)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CommitRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable configuration for one run, built once by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub source_url: String,
    pub branch: String,
    pub poll_interval: Duration,
    pub run_once: bool,
    pub fail_fast: bool,
    /// Program followed by its arguments. Empty means "sync only".
    pub command: Vec<String>,
    pub command_timeout: Option<Duration>,
    /// Explicit working-copy location; derived from the URL when absent.
    pub workdir: Option<PathBuf>,
}

impl WatchTarget {
    pub fn new(source_url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            branch: branch.into(),
            poll_interval: crate::config::DEFAULT_POLL_INTERVAL,
            run_once: false,
            fail_fast: false,
            command: Vec::new(),
            command_timeout: None,
            workdir: None,
        }
    }

    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }

    /// Where the working copy lives for this target.
    pub fn local_copy_path(&self) -> PathBuf {
        match &self.workdir {
            Some(dir) => dir.clone(),
            None => crate::paths::default_local_copy_dir(&self.source_url, &self.branch),
        }
    }
}

// ---------------------------------------------------------------------------
// Local copy
// ---------------------------------------------------------------------------

/// Handle on the working directory holding a clone of the watched branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCopy {
    pub path: PathBuf,
    pub branch: String,
}

impl LocalCopy {
    pub fn new(path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a stale copy was brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPath {
    Pulled,
    Recloned,
}

impl fmt::Display for SyncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPath::Pulled => write!(f, "pulled"),
            SyncPath::Recloned => write!(f, "recloned"),
        }
    }
}

/// Result of one reconcile step. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NoChange,
    Synchronized,
    SynchronizeFailed,
    CommandSucceeded,
    CommandFailed,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::NoChange => write!(f, "no_change"),
            ReconcileOutcome::Synchronized => write!(f, "synchronized"),
            ReconcileOutcome::SynchronizeFailed => write!(f, "synchronize_failed"),
            ReconcileOutcome::CommandSucceeded => write!(f, "command_succeeded"),
            ReconcileOutcome::CommandFailed => write!(f, "command_failed"),
        }
    }
}

/// What one poll cycle observed and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub remote: CommitRef,
    pub local: CommitRef,
    /// `None` when nothing changed.
    pub sync: Option<SyncPath>,
    pub outcome: ReconcileOutcome,
}

/// Counters accumulated over a whole run, logged when the engine stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub changes: u64,
    pub reclones: u64,
    pub commands_succeeded: u64,
    pub commands_failed: u64,
    pub last_remote: Option<CommitRef>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            cycles: 0,
            changes: 0,
            reclones: 0,
            commands_succeeded: 0,
            commands_failed: 0,
            last_remote: None,
            cancelled: false,
        }
    }

    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.last_remote = Some(report.remote.clone());
        match report.sync {
            Some(SyncPath::Pulled) => self.changes += 1,
            Some(SyncPath::Recloned) => {
                self.changes += 1;
                self.reclones += 1;
            }
            None => {}
        }
        self.record_outcome(report.outcome);
    }

    pub fn record_outcome(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::CommandSucceeded => self.commands_succeeded += 1,
            ReconcileOutcome::CommandFailed => self.commands_failed += 1,
            _ => {}
        }
    }

    /// Wall-clock time since the run started.
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    pub fn commands_run(&self) -> u64 {
        self.commands_succeeded + self.commands_failed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
