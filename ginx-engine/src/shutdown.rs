//! Process-wide cancellation signal.
//!
//! Cloned into every place that blocks: the poll-loop sleep, the remote
//! fetch gate, and the running child command. Once triggered it stays
//! triggered.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`Shutdown::trigger`] has been called on any clone.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        let seen = rx.wait_for(|stop| *stop).await.map(|_| ());
        if seen.is_err() {
            // Unreachable while `self` holds the sender; never resolve.
            std::future::pending::<()>().await;
        }
    }

    /// Trigger on ctrl-c. Must be called from inside a tokio runtime.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.triggered() => {}
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down");
                        shutdown.trigger();
                    }
                    Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_is_seen_by_all_clones() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!other.is_triggered());

        let waiter = tokio::spawn(async move { other.triggered().await });
        shutdown.trigger();
        waiter.await.expect("waiter");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn triggered_resolves_immediately_after_the_fact() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.clone().triggered().await;
    }
}
