//! Layered watch settings.
//!
//! Settings come from three places, highest precedence first:
//!
//! 1. command-line flags
//! 2. an optional YAML file (`--config ginx.yaml`)
//! 3. built-in defaults
//!
//! Each layer is a [`WatchSettings`] with every field optional; layers are
//! combined with [`WatchSettings::overlay`] and resolved into an immutable
//! [`WatchTarget`] by [`WatchSettings::into_target`].
//!
//! ```yaml
//! source: https://github.com/acme/site.git
//! branch: production
//! interval: 60
//! fail_fast: true
//! command: ["make", "deploy"]
//! command_timeout: 600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::WatchTarget;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// One configuration layer. `None` means "not set at this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSettings {
    pub source: Option<String>,
    pub branch: Option<String>,
    /// Poll interval in seconds.
    pub interval: Option<u64>,
    pub once: Option<bool>,
    pub fail_fast: Option<bool>,
    pub command: Option<Vec<String>>,
    /// Command timeout in seconds.
    pub command_timeout: Option<u64>,
    pub workdir: Option<PathBuf>,
}

impl WatchSettings {
    /// Read a YAML settings file.
    ///
    /// Returns `ConfigError::NotFound` if absent and `ConfigError::Parse`
    /// (with path + line context) if malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // An empty file is a valid, empty layer.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `top` over `self`; fields set in `top` win.
    pub fn overlay(self, top: WatchSettings) -> WatchSettings {
        WatchSettings {
            source: top.source.or(self.source),
            branch: top.branch.or(self.branch),
            interval: top.interval.or(self.interval),
            once: top.once.or(self.once),
            fail_fast: top.fail_fast.or(self.fail_fast),
            command: top.command.or(self.command),
            command_timeout: top.command_timeout.or(self.command_timeout),
            workdir: top.workdir.or(self.workdir),
        }
    }

    /// Apply defaults and validate.
    pub fn into_target(self) -> Result<WatchTarget, ConfigError> {
        let source_url = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSource)?;

        let branch = self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let branch = branch.trim().to_string();
        if branch.is_empty() {
            return Err(ConfigError::EmptyBranch);
        }

        let poll_interval = match self.interval {
            Some(0) => return Err(ConfigError::ZeroInterval),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_POLL_INTERVAL,
        };

        let command_timeout = match self.command_timeout {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(WatchTarget {
            source_url,
            branch,
            poll_interval,
            run_once: self.once.unwrap_or(false),
            fail_fast: self.fail_fast.unwrap_or(false),
            command: self.command.unwrap_or_default(),
            command_timeout,
            workdir: self.workdir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_source() -> WatchSettings {
        WatchSettings {
            source: Some("https://example.com/acme/site.git".to_string()),
            ..WatchSettings::default()
        }
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let target = with_source().into_target().expect("target");
        assert_eq!(target.branch, DEFAULT_BRANCH);
        assert_eq!(target.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(!target.run_once);
        assert!(!target.fail_fast);
        assert!(target.command.is_empty());
        assert_eq!(target.command_timeout, None);
    }

    #[test]
    fn overlay_prefers_top_layer() {
        let file = WatchSettings {
            branch: Some("release".to_string()),
            interval: Some(120),
            fail_fast: Some(true),
            ..with_source()
        };
        let flags = WatchSettings {
            branch: Some("hotfix".to_string()),
            ..WatchSettings::default()
        };
        let target = file.overlay(flags).into_target().expect("target");
        assert_eq!(target.branch, "hotfix");
        assert_eq!(target.poll_interval, Duration::from_secs(120));
        assert!(target.fail_fast);
    }

    #[test]
    fn missing_or_blank_source_is_rejected() {
        let err = WatchSettings::default().into_target().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSource));

        let blank = WatchSettings {
            source: Some("   ".to_string()),
            ..WatchSettings::default()
        };
        assert!(matches!(
            blank.into_target().unwrap_err(),
            ConfigError::MissingSource
        ));
    }

    #[test]
    fn zero_durations_are_rejected() {
        let zero_interval = WatchSettings {
            interval: Some(0),
            ..with_source()
        };
        assert!(matches!(
            zero_interval.into_target().unwrap_err(),
            ConfigError::ZeroInterval
        ));

        let zero_timeout = WatchSettings {
            command_timeout: Some(0),
            ..with_source()
        };
        assert!(matches!(
            zero_timeout.into_target().unwrap_err(),
            ConfigError::ZeroTimeout
        ));
    }

    #[test]
    fn empty_branch_is_rejected() {
        let settings = WatchSettings {
            branch: Some(String::new()),
            ..with_source()
        };
        assert!(matches!(
            settings.into_target().unwrap_err(),
            ConfigError::EmptyBranch
        ));
    }
}
