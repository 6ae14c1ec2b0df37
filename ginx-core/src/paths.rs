//! Working-copy location derived from the watched repository.
//!
//! The default directory is stable across restarts so that a resumed process
//! finds and reopens its previous copy instead of cloning again. The branch
//! is part of the digest because copies are single-branch clones:
//!
//! ```text
//! <tmp>/ginx-<repo-name>-<first 12 hex chars of sha256(url "#" branch)>
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub const DIR_PREFIX: &str = "ginx";

const DIGEST_CHARS: usize = 12;

/// Default working-copy directory for `url`/`branch` under the system temp dir.
pub fn default_local_copy_dir(url: &str, branch: &str) -> PathBuf {
    std::env::temp_dir().join(local_copy_dir_name(url, branch))
}

/// `ginx-<name>-<digest>`. Pure, no I/O.
pub fn local_copy_dir_name(url: &str, branch: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    hasher.update(b"#");
    hasher.update(branch.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!(
        "{DIR_PREFIX}-{}-{}",
        repo_name(url),
        &digest[..DIGEST_CHARS]
    )
}

/// Whether two source locations name the same repository.
///
/// Git records a local clone source as an absolute path (`./up` becomes
/// `/abs/./up`), so sources that exist on disk are compared after
/// canonicalization. Anything else (network URLs, scp-style remotes) must
/// match exactly, ignoring a trailing `/`.
pub fn same_source(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.trim_end_matches('/') == b.trim_end_matches('/') {
        return true;
    }
    match (local_source(a), local_source(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn local_source(source: &str) -> Option<PathBuf> {
    if source.contains("://") {
        return None;
    }
    Path::new(source).canonicalize().ok()
}

/// Last path segment of a git URL without the `.git` suffix.
///
/// Handles `https://host/org/repo.git`, `git@host:org/repo.git` and plain
/// filesystem paths. Characters outside `[A-Za-z0-9._-]` become `_`.
pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':', '\\'])
        .next()
        .unwrap_or(trimmed);
    let last = last.strip_suffix(".git").unwrap_or(last);

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "repo".to_string()
    } else {
        cleaned
    }
}
