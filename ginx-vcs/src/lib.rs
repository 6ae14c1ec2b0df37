//! # ginx-vcs
//!
//! The version-control capability the reconcile engine consumes.
//!
//! [`Vcs`] is the seam: [`GitCli`] drives the system `git` binary, and
//! [`MemoryVcs`] keeps a simulated remote and working copies in memory so
//! the engine's state machine can be exercised without network or disk.

pub mod error;
pub mod git_cli;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use ginx_core::{CommitRef, LocalCopy};

pub use error::VcsError;
pub use git_cli::GitCli;
pub use memory::{MemoryVcs, VcsCall};

/// Operations on a single branch of a single remote repository.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Whether something already occupies `path`. No side effects.
    fn is_present(&self, path: &Path) -> bool;

    /// Clone `branch` of `url` into `path`.
    async fn clone_branch(&self, url: &str, branch: &str, path: &Path)
        -> Result<LocalCopy, VcsError>;

    /// Reopen an existing working copy. Fails if `path` is not one.
    async fn open(&self, path: &Path) -> Result<LocalCopy, VcsError>;

    /// URL of the copy's `origin` remote.
    async fn origin_url(&self, copy: &LocalCopy) -> Result<String, VcsError>;

    /// Fast-forward the copy to the remote branch head.
    async fn pull(&self, copy: &LocalCopy) -> Result<(), VcsError>;

    /// Current head of `branch` on the remote.
    ///
    /// A branch missing from the remote is [`VcsError::BranchNotFound`],
    /// never an empty ref.
    async fn remote_head(&self, copy: &LocalCopy, branch: &str) -> Result<CommitRef, VcsError>;

    /// Commit currently checked out in the copy.
    async fn local_head(&self, copy: &LocalCopy) -> Result<CommitRef, VcsError>;

    /// Delete the working copy. A missing path is not an error.
    async fn discard(&self, path: &Path) -> Result<(), VcsError>;
}
