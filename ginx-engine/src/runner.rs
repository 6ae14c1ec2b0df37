//! Command execution inside the working copy.
//!
//! [`ProcessRunner`] spawns the real child process with inherited stdout and
//! stderr. [`ScriptedRunner`] records invocations and replays canned results
//! for engine tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::RunError;
use crate::shutdown::Shutdown;

/// Runs `command[0]` with `command[1..]` as arguments inside `workdir`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        workdir: &Path,
        command: &[String],
        shutdown: &Shutdown,
    ) -> Result<(), RunError>;
}

// ---------------------------------------------------------------------------
// Real processes
// ---------------------------------------------------------------------------

/// Spawns the command as a child process.
///
/// The child is killed when the optional timeout elapses or the shutdown
/// signal fires.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

enum Finish {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        workdir: &Path,
        command: &[String],
        shutdown: &Shutdown,
    ) -> Result<(), RunError> {
        let (program, args) = command.split_first().ok_or(RunError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(after) => {
                    tokio::time::sleep(after).await;
                    after
                }
                None => std::future::pending().await,
            }
        };

        let finish = tokio::select! {
            status = child.wait() => Finish::Exited(status),
            after = deadline => Finish::TimedOut(after),
            _ = shutdown.triggered() => Finish::Cancelled,
        };

        match finish {
            Finish::Exited(Ok(status)) if status.success() => Ok(()),
            Finish::Exited(Ok(status)) => Err(RunError::Exit {
                program: program.clone(),
                code: status.code(),
            }),
            Finish::Exited(Err(source)) => Err(RunError::Spawn {
                program: program.clone(),
                source,
            }),
            Finish::TimedOut(after) => {
                if let Err(err) = child.kill().await {
                    tracing::warn!(command = %program, error = %err, "failed to kill timed-out command");
                }
                Err(RunError::TimedOut {
                    program: program.clone(),
                    after,
                })
            }
            Finish::Cancelled => {
                if let Err(err) = child.kill().await {
                    tracing::warn!(command = %program, error = %err, "failed to kill interrupted command");
                }
                Err(RunError::Cancelled {
                    program: program.clone(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted runner
// ---------------------------------------------------------------------------

/// Canned result for one [`ScriptedRunner`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    /// Exit with the given status code.
    Fail(i32),
    /// Block until shutdown, then report cancellation.
    Hang,
}

/// One recorded call to [`ScriptedRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub workdir: PathBuf,
    pub command: Vec<String>,
}

#[derive(Debug)]
struct ScriptState {
    queue: VecDeque<Script>,
    fallback: Script,
    invocations: Vec<Invocation>,
}

/// Records invocations and replays scripted results, in order, falling back
/// to a fixed result once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<ScriptState>>,
}

impl ScriptedRunner {
    fn with_fallback(fallback: Script) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptState {
                queue: VecDeque::new(),
                fallback,
                invocations: Vec::new(),
            })),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_fallback(Script::Succeed)
    }

    pub fn failing(code: i32) -> Self {
        Self::with_fallback(Script::Fail(code))
    }

    /// Queue `script` ahead of the fallback.
    pub fn then(self, script: Script) -> Self {
        self.state().queue.push_back(script);
        self
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state().invocations.clone()
    }

    pub fn count(&self) -> usize {
        self.state().invocations.len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        workdir: &Path,
        command: &[String],
        shutdown: &Shutdown,
    ) -> Result<(), RunError> {
        let program = command.first().cloned().ok_or(RunError::EmptyCommand)?;
        let script = {
            let mut state = self.state();
            state.invocations.push(Invocation {
                workdir: workdir.to_path_buf(),
                command: command.to_vec(),
            });
            let fallback = state.fallback;
            state.queue.pop_front().unwrap_or(fallback)
        };

        match script {
            Script::Succeed => Ok(()),
            Script::Fail(code) => Err(RunError::Exit {
                program,
                code: Some(code),
            }),
            Script::Hang => {
                shutdown.triggered().await;
                Err(RunError::Cancelled { program })
            }
        }
    }
}
