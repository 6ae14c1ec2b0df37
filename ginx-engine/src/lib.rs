//! ginx reconcile engine: poll loop, command runner, cancellation, logging.
//!
//! [`watch_blocking`] wires the production collaborators ([`GitCli`],
//! [`ProcessRunner`], ctrl-c driven [`Shutdown`]) and blocks until the run
//! ends. Tests build an [`Engine`] directly over in-memory collaborators.

mod engine;
mod error;
pub mod logging;
pub mod runner;
pub mod shutdown;

pub use engine::Engine;
pub use error::{EngineError, RunError};
pub use runner::{CommandRunner, Invocation, ProcessRunner, Script, ScriptedRunner};
pub use shutdown::Shutdown;

use ginx_core::{RunSummary, WatchTarget};
use ginx_vcs::GitCli;

/// Run the watcher for `target` on a fresh tokio runtime and block the
/// current thread until it finishes.
pub fn watch_blocking(target: WatchTarget) -> Result<RunSummary, EngineError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(EngineError::Runtime)?;

    runtime.block_on(async move {
        let shutdown = Shutdown::new();
        let ctrl_c = shutdown.listen_for_ctrl_c();
        let runner = ProcessRunner::new(target.command_timeout);
        let engine = Engine::new(target, GitCli::new(), runner, shutdown.clone());

        let result = engine.run().await;
        // Release the ctrl-c listener so the runtime can wind down.
        shutdown.trigger();
        let _ = ctrl_c.await;
        result
    })
}
