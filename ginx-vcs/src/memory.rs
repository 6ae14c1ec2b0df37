//! In-memory [`Vcs`] for exercising the reconcile engine.
//!
//! Models one remote repository (branch → head commit) and any number of
//! working copies keyed by path. Every call is journaled, and individual
//! operations can be told to fail a number of times, which is how tests
//! drive the pull-failure and reclone paths.
//!
//! Handles are cheap clones sharing the same state, so a test can keep one
//! while the engine owns another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use ginx_core::{CommitRef, LocalCopy};

use crate::error::VcsError;
use crate::Vcs;

/// Journal entry for one adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsCall {
    Clone,
    Open,
    OriginUrl,
    Pull,
    RemoteHead,
    LocalHead,
    Discard,
}

impl VcsCall {
    fn label(self) -> &'static str {
        match self {
            VcsCall::Clone => "clone",
            VcsCall::Open => "open",
            VcsCall::OriginUrl => "origin-url",
            VcsCall::Pull => "pull",
            VcsCall::RemoteHead => "remote-head",
            VcsCall::LocalHead => "local-head",
            VcsCall::Discard => "discard",
        }
    }
}

#[derive(Debug, Clone)]
struct CopyState {
    branch: String,
    head: CommitRef,
    origin: String,
}

#[derive(Debug, Default)]
struct State {
    url: String,
    remote: HashMap<String, CommitRef>,
    copies: HashMap<PathBuf, CopyState>,
    faults: HashMap<VcsCall, u32>,
    calls: Vec<VcsCall>,
}

impl State {
    /// Journal `call` and consume one injected failure for it, if any.
    fn enter(&mut self, call: VcsCall) -> Result<(), VcsError> {
        self.calls.push(call);
        match self.faults.get_mut(&call) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                Err(VcsError::Simulated {
                    op: call.label(),
                    reason: "injected fault".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn copy(&self, path: &Path) -> Result<&CopyState, VcsError> {
        self.copies.get(path).ok_or_else(|| VcsError::NotACopy {
            path: path.to_path_buf(),
        })
    }

    fn branch_head(&self, branch: &str) -> Result<CommitRef, VcsError> {
        self.remote
            .get(branch)
            .cloned()
            .ok_or_else(|| VcsError::BranchNotFound {
                branch: branch.to_string(),
                url: self.url.clone(),
            })
    }
}

/// Simulated remote plus working copies.
#[derive(Debug, Clone, Default)]
pub struct MemoryVcs {
    inner: Arc<Mutex<State>>,
}

impl MemoryVcs {
    /// A remote at `url` with no branches yet.
    pub fn new(url: impl Into<String>) -> Self {
        let vcs = Self::default();
        vcs.state().url = url.into();
        vcs
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move `branch` on the remote to `commit`.
    pub fn push(&self, branch: &str, commit: impl Into<CommitRef>) {
        self.state().remote.insert(branch.to_string(), commit.into());
    }

    /// Delete `branch` from the remote.
    pub fn delete_branch(&self, branch: &str) {
        self.state().remote.remove(branch);
    }

    /// Place an existing working copy at `path`, as left by a previous run.
    pub fn seed_copy(&self, path: impl Into<PathBuf>, branch: &str, head: impl Into<CommitRef>) {
        let mut state = self.state();
        let origin = state.url.clone();
        state.copies.insert(
            path.into(),
            CopyState {
                branch: branch.to_string(),
                head: head.into(),
                origin,
            },
        );
    }

    /// Point the copy at `path` to a different origin URL.
    pub fn set_origin(&self, path: &Path, url: &str) {
        if let Some(copy) = self.state().copies.get_mut(path) {
            copy.origin = url.to_string();
        }
    }

    /// Make the next `times` calls of `call` fail.
    pub fn fail_next(&self, call: VcsCall, times: u32) {
        self.state().faults.insert(call, times);
    }

    /// Make every future `call` fail.
    pub fn fail_always(&self, call: VcsCall) {
        self.fail_next(call, u32::MAX);
    }

    /// Head commit of the copy at `path`, if one exists.
    pub fn head_of(&self, path: &Path) -> Option<CommitRef> {
        self.state().copies.get(path).map(|c| c.head.clone())
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: VcsCall) -> usize {
        self.state().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl Vcs for MemoryVcs {
    fn is_present(&self, path: &Path) -> bool {
        self.state().copies.contains_key(path)
    }

    async fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        path: &Path,
    ) -> Result<LocalCopy, VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::Clone)?;

        if url != state.url {
            return Err(VcsError::Simulated {
                op: "clone",
                reason: format!("repository {url} does not exist"),
            });
        }
        if state.copies.contains_key(path) {
            return Err(VcsError::Simulated {
                op: "clone",
                reason: format!("destination {} already exists", path.display()),
            });
        }
        let head = state.branch_head(branch)?;
        state.copies.insert(
            path.to_path_buf(),
            CopyState {
                branch: branch.to_string(),
                head,
                origin: url.to_string(),
            },
        );
        Ok(LocalCopy::new(path, branch))
    }

    async fn open(&self, path: &Path) -> Result<LocalCopy, VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::Open)?;
        let copy = state.copy(path)?;
        Ok(LocalCopy::new(path, copy.branch.clone()))
    }

    async fn origin_url(&self, copy: &LocalCopy) -> Result<String, VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::OriginUrl)?;
        Ok(state.copy(&copy.path)?.origin.clone())
    }

    async fn pull(&self, copy: &LocalCopy) -> Result<(), VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::Pull)?;
        let branch = state.copy(&copy.path)?.branch.clone();
        let head = state.branch_head(&branch)?;
        if let Some(local) = state.copies.get_mut(&copy.path) {
            local.head = head;
        }
        Ok(())
    }

    async fn remote_head(&self, _copy: &LocalCopy, branch: &str) -> Result<CommitRef, VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::RemoteHead)?;
        state.branch_head(branch)
    }

    async fn local_head(&self, copy: &LocalCopy) -> Result<CommitRef, VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::LocalHead)?;
        Ok(state.copy(&copy.path)?.head.clone())
    }

    async fn discard(&self, path: &Path) -> Result<(), VcsError> {
        let mut state = self.state();
        state.enter(VcsCall::Discard)?;
        state.copies.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/acme/site.git";

    fn copy_path() -> PathBuf {
        PathBuf::from("/tmp/ginx-site-test")
    }

    #[tokio::test]
    async fn clone_then_pull_tracks_remote_head() {
        let vcs = MemoryVcs::new(URL);
        vcs.push("main", "abc123");

        let copy = vcs
            .clone_branch(URL, "main", &copy_path())
            .await
            .expect("clone");
        assert_eq!(vcs.head_of(&copy.path), Some(CommitRef::from("abc123")));

        vcs.push("main", "def456");
        assert_eq!(
            vcs.local_head(&copy).await.expect("local"),
            CommitRef::from("abc123")
        );
        vcs.pull(&copy).await.expect("pull");
        assert_eq!(
            vcs.local_head(&copy).await.expect("local"),
            CommitRef::from("def456")
        );
    }

    #[tokio::test]
    async fn missing_branch_is_an_error_not_an_empty_ref() {
        let vcs = MemoryVcs::new(URL);
        vcs.seed_copy(copy_path(), "main", "abc123");
        let copy = LocalCopy::new(copy_path(), "main");

        let err = vcs.remote_head(&copy, "main").await.unwrap_err();
        assert!(matches!(err, VcsError::BranchNotFound { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn injected_faults_are_consumed() {
        let vcs = MemoryVcs::new(URL);
        vcs.push("main", "abc123");
        vcs.fail_next(VcsCall::Clone, 1);

        assert!(vcs.clone_branch(URL, "main", &copy_path()).await.is_err());
        assert!(!vcs.is_present(&copy_path()));
        assert!(vcs.clone_branch(URL, "main", &copy_path()).await.is_ok());
        assert_eq!(vcs.calls(), vec![VcsCall::Clone, VcsCall::Clone]);
    }

    #[tokio::test]
    async fn discard_removes_copy() {
        let vcs = MemoryVcs::new(URL);
        vcs.seed_copy(copy_path(), "main", "abc123");
        assert!(vcs.is_present(&copy_path()));

        vcs.discard(&copy_path()).await.expect("discard");
        assert!(!vcs.is_present(&copy_path()));
        // Discarding again is fine.
        vcs.discard(&copy_path()).await.expect("discard twice");
    }
}
