//! Watch flags and their mapping onto a [`WatchSettings`] layer.

use std::path::PathBuf;

use clap::Args;

use ginx_core::{ConfigError, WatchSettings, WatchTarget};

#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Repository URL or local path to watch.
    #[arg(short, long, value_name = "URL")]
    pub source: Option<String>,

    /// Branch to track [default: main].
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Seconds between polls [default: 30].
    #[arg(short = 'n', long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Clone, run the command once, remove the copy and exit.
    #[arg(long)]
    pub once: bool,

    /// Stop with a non-zero exit code when the command fails.
    #[arg(long)]
    pub fail_fast: bool,

    /// Kill the command after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,

    /// Working-copy directory [default: derived under the temp dir].
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// YAML file with default settings; flags override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Command to run inside the working copy after each change.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl WatchArgs {
    /// The flags the user actually passed, as a settings layer.
    pub fn settings(&self) -> WatchSettings {
        WatchSettings {
            source: self.source.clone(),
            branch: self.branch.clone(),
            interval: self.interval,
            once: self.once.then_some(true),
            fail_fast: self.fail_fast.then_some(true),
            command: (!self.command.is_empty()).then(|| self.command.clone()),
            command_timeout: self.command_timeout,
            workdir: self.workdir.clone(),
        }
    }

    /// Merge the config file (if any) under the flags and validate.
    pub fn resolve(&self) -> Result<WatchTarget, ConfigError> {
        let file = match &self.config {
            Some(path) => WatchSettings::load(path)?,
            None => WatchSettings::default(),
        };
        file.overlay(self.settings()).into_target()
    }
}
