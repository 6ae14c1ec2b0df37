//! The watch-reconcile engine.
//!
//! ```text
//! Uninitialized ──clone/open──▶ Ready ──run_once──▶ command ─▶ release ─▶ done
//!                                 │
//!                                 ▼
//!          ┌──────────────▶ poll: remote head, local head
//!          │                      │ equal ───────────────────────┐
//!          │                      ▼ differ                       │
//!          │                 pull ──fail──▶ discard + reclone    │
//!          │                      │               │ fail: fatal  │
//!          │                      ▼               ▼              │
//!          │                 command (if configured)             │
//!          │                      │ fail + fail-fast: fatal      │
//!          └──── sleep ◀──────────┴──────────────────────────────┘
//! ```
//!
//! Fatal conditions come back as [`EngineError`]; the driver decides the exit
//! code. Cancellation through [`Shutdown`] ends the run cleanly.

use std::path::Path;

use tracing::{debug, error, info, warn};

use ginx_core::paths;
use ginx_core::{CycleReport, LocalCopy, ReconcileOutcome, RunSummary, SyncPath, WatchTarget};
use ginx_vcs::Vcs;

use crate::error::{EngineError, RunError};
use crate::runner::CommandRunner;
use crate::shutdown::Shutdown;

pub struct Engine<V, R> {
    target: WatchTarget,
    vcs: V,
    runner: R,
    shutdown: Shutdown,
}

impl<V: Vcs, R: CommandRunner> Engine<V, R> {
    pub fn new(target: WatchTarget, vcs: V, runner: R, shutdown: Shutdown) -> Self {
        Self {
            target,
            vcs,
            runner,
            shutdown,
        }
    }

    /// Initialize, then either execute once or poll until shutdown.
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        let mut summary = RunSummary::start();
        let mut copy = self.initialize().await?;

        if self.target.run_once {
            self.run_once(&copy, &mut summary).await?;
            log_summary(&summary);
            return Ok(summary);
        }

        info!(
            url = %self.target.source_url,
            branch = %self.target.branch,
            interval_secs = self.target.poll_interval.as_secs(),
            "starting remote repository watcher",
        );

        loop {
            if self.shutdown.is_triggered() {
                summary.cancelled = true;
                break;
            }

            let report = self.poll_cycle(&mut copy).await?;
            summary.record(&report);

            tokio::select! {
                _ = tokio::time::sleep(self.target.poll_interval) => {}
                _ = self.shutdown.triggered() => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        log_summary(&summary);
        Ok(summary)
    }

    /// Bring a usable working copy into existence.
    ///
    /// Clones when nothing is at the target path; otherwise reopens what is
    /// there, refusing copies of a different repository or branch rather
    /// than deleting them.
    pub async fn initialize(&self) -> Result<LocalCopy, EngineError> {
        let path = self.target.local_copy_path();

        if !self.vcs.is_present(&path) {
            info!(
                url = %self.target.source_url,
                branch = %self.target.branch,
                directory = %path.display(),
                "cloning repository",
            );
            return self
                .vcs
                .clone_branch(&self.target.source_url, &self.target.branch, &path)
                .await
                .map_err(|source| EngineError::InitialClone {
                    url: self.target.source_url.clone(),
                    branch: self.target.branch.clone(),
                    source,
                });
        }

        info!(
            directory = %path.display(),
            "repository already exists, opening working copy",
        );
        let open_err = |source| EngineError::Open {
            path: path.clone(),
            source,
        };
        let copy = self.vcs.open(&path).await.map_err(open_err)?;
        let origin = self.vcs.origin_url(&copy).await.map_err(open_err)?;

        if !paths::same_source(&origin, &self.target.source_url) {
            return Err(EngineError::ForeignCopy {
                path,
                expected: self.target.source_url.clone(),
                found: origin,
            });
        }
        if copy.branch != self.target.branch {
            return Err(EngineError::WrongBranch {
                path,
                expected: self.target.branch.clone(),
                found: copy.branch,
            });
        }
        Ok(copy)
    }

    /// One detect → sync → execute pass.
    pub async fn poll_cycle(&self, copy: &mut LocalCopy) -> Result<CycleReport, EngineError> {
        let branch = &self.target.branch;

        let remote = self
            .vcs
            .remote_head(copy, branch)
            .await
            .map_err(|source| EngineError::RemoteHead {
                branch: branch.clone(),
                source,
            })?;
        debug!(remote = %remote, "fetched remote commit");

        let local = self
            .vcs
            .local_head(copy)
            .await
            .map_err(|source| EngineError::LocalHead {
                path: copy.path.clone(),
                source,
            })?;
        debug!(local = %local, "fetched local commit");

        if remote == local {
            info!(
                url = %self.target.source_url,
                commit = %remote.short(),
                outcome = %ReconcileOutcome::NoChange,
                "no changes detected in remote repository",
            );
            return Ok(CycleReport {
                remote,
                local,
                sync: None,
                outcome: ReconcileOutcome::NoChange,
            });
        }

        info!(
            remote = %remote.short(),
            local = %local.short(),
            "detected remote changes, synchronizing",
        );
        let sync = self.synchronize(copy).await?;

        let outcome = if self.target.has_command() {
            self.execute(copy).await?
        } else {
            ReconcileOutcome::Synchronized
        };

        Ok(CycleReport {
            remote,
            local,
            sync: Some(sync),
            outcome,
        })
    }

    /// Pull, falling back to discard + fresh clone into the same path.
    async fn synchronize(&self, copy: &mut LocalCopy) -> Result<SyncPath, EngineError> {
        match self.vcs.pull(copy).await {
            Ok(()) => {
                info!(
                    directory = %copy.path.display(),
                    via = %SyncPath::Pulled,
                    outcome = %ReconcileOutcome::Synchronized,
                    "working copy synchronized",
                );
                Ok(SyncPath::Pulled)
            }
            Err(err) => {
                error!(
                    url = %self.target.source_url,
                    directory = %copy.path.display(),
                    error = %err,
                    outcome = %ReconcileOutcome::SynchronizeFailed,
                    "failed to pull, recloning repository",
                );
                let path = copy.path.clone();
                *copy = self.reclone(&path).await?;
                info!(
                    directory = %copy.path.display(),
                    via = %SyncPath::Recloned,
                    outcome = %ReconcileOutcome::Synchronized,
                    "working copy synchronized",
                );
                Ok(SyncPath::Recloned)
            }
        }
    }

    async fn reclone(&self, path: &Path) -> Result<LocalCopy, EngineError> {
        self.vcs
            .discard(path)
            .await
            .map_err(|source| EngineError::Discard {
                path: path.to_path_buf(),
                source,
            })?;
        self.vcs
            .clone_branch(&self.target.source_url, &self.target.branch, path)
            .await
            .map_err(|source| EngineError::Reclone {
                url: self.target.source_url.clone(),
                branch: self.target.branch.clone(),
                path: path.to_path_buf(),
                source,
            })
    }

    /// Run the configured command, applying the fail-fast policy.
    async fn execute(&self, copy: &LocalCopy) -> Result<ReconcileOutcome, EngineError> {
        let command = &self.target.command;
        if let Some((program, args)) = command.split_first() {
            info!(
                command = %program,
                args = ?args,
                directory = %copy.path.display(),
                "running command",
            );
        }

        match self
            .runner
            .run(&copy.path, command, &self.shutdown)
            .await
        {
            Ok(()) => {
                info!(outcome = %ReconcileOutcome::CommandSucceeded, "command succeeded");
                Ok(ReconcileOutcome::CommandSucceeded)
            }
            Err(err @ RunError::Cancelled { .. }) => {
                warn!(error = %err, outcome = %ReconcileOutcome::CommandFailed, "command interrupted");
                Ok(ReconcileOutcome::CommandFailed)
            }
            Err(source) if self.target.fail_fast => Err(EngineError::CommandFailed { source }),
            Err(err) => {
                error!(
                    error = %err,
                    outcome = %ReconcileOutcome::CommandFailed,
                    "failed to run command",
                );
                Ok(ReconcileOutcome::CommandFailed)
            }
        }
    }

    /// Execute without a change gate, then release the copy either way.
    async fn run_once(&self, copy: &LocalCopy, summary: &mut RunSummary) -> Result<(), EngineError> {
        info!(directory = %copy.path.display(), "run-once mode, skipping change detection");

        let executed = if self.target.has_command() {
            self.execute(copy).await.map(Some)
        } else {
            info!("no command configured, nothing to run");
            Ok(None)
        };

        let released = self
            .vcs
            .discard(&copy.path)
            .await
            .map_err(|source| EngineError::Discard {
                path: copy.path.clone(),
                source,
            });
        match &released {
            Ok(()) => debug!(directory = %copy.path.display(), "released working copy"),
            Err(err) => error!(
                directory = %copy.path.display(),
                error = %err,
                "failed to release working copy",
            ),
        }

        if let Some(outcome) = executed? {
            summary.record_outcome(outcome);
        }
        released
    }
}

fn log_summary(summary: &RunSummary) {
    info!(
        started_at = %summary.started_at.to_rfc3339(),
        elapsed_secs = summary.elapsed().num_seconds(),
        cycles = summary.cycles,
        changes = summary.changes,
        reclones = summary.reclones,
        commands_succeeded = summary.commands_succeeded,
        commands_failed = summary.commands_failed,
        commands_run = summary.commands_run(),
        last_remote = summary.last_remote.as_ref().map(|c| c.short()).unwrap_or("-"),
        cancelled = summary.cancelled,
        "watcher stopped",
    );
}
