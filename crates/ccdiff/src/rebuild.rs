//! Keeping the candidate compiler binary up to date.
//!
//! When the candidate lives next to a `Makefile`, the harness asks make
//! whether the binary is stale and rebuilds it before any test runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the freshness check.
#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("failed to run {program} in {dir}: {source}")]
    Spawn {
        program: String,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("building {target} failed (make exited with status {status})")]
    Failed { target: String, status: i32 },
    #[error("candidate path {0} has no file name")]
    NoTarget(PathBuf),
}

pub type Result<T> = std::result::Result<T, RebuildError>;

/// Rebuilds the candidate compiler with make.
#[derive(Clone, Debug)]
pub struct Rebuilder {
    make: String,
    dir: PathBuf,
    target: String,
}

impl Rebuilder {
    /// Rebuilder for the candidate binary at `candidate`.
    ///
    /// # Errors
    /// Fails if `candidate` has no file name to use as the make target.
    pub fn new(candidate: &Path) -> Result<Self> {
        let target = candidate
            .file_name()
            .ok_or_else(|| RebuildError::NoTarget(candidate.to_path_buf()))?
            .to_string_lossy()
            .into_owned();
        let dir = candidate
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self {
            make: "make".to_string(),
            dir,
            target,
        })
    }

    /// Use a different make program.
    #[must_use]
    pub fn with_make(mut self, make: impl Into<String>) -> Self {
        self.make = make.into();
        self
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the candidate's directory has a makefile at all.
    #[must_use]
    pub fn has_makefile(&self) -> bool {
        ["GNUmakefile", "makefile", "Makefile"]
            .iter()
            .any(|name| self.dir.join(name).is_file())
    }

    /// Ask make whether the target is up to date, without building anything.
    ///
    /// # Errors
    /// Fails if make cannot be started.
    pub fn is_stale(&self) -> Result<bool> {
        let status = self
            .command()
            .arg("--question")
            .arg(&self.target)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;
        debug!(target = %self.target, ?status, "make --question");
        Ok(!status.success())
    }

    /// Build the target, with make's output going straight to the terminal.
    ///
    /// On failure the stale binary is removed so it cannot be tested by
    /// accident on the next run.
    ///
    /// # Errors
    /// Returns [`RebuildError::Failed`] with make's exit status if the build
    /// fails, or [`RebuildError::Spawn`] if make cannot be started.
    pub fn build(&self) -> Result<()> {
        info!(target = %self.target, dir = %self.dir.display(), "rebuilding candidate");
        let status = self
            .command()
            .arg(&self.target)
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if status.success() {
            return Ok(());
        }

        let stale = self.dir.join(&self.target);
        match fs::remove_file(&stale) {
            Ok(()) => debug!(path = %stale.display(), "removed stale candidate"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %stale.display(), error = %e, "cannot remove stale candidate"),
        }
        Err(RebuildError::Failed {
            target: self.target.clone(),
            status: exit_status(status),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.make);
        cmd.current_dir(&self.dir);
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> RebuildError {
        RebuildError::Spawn {
            program: self.make.clone(),
            dir: self.dir.clone(),
            source,
        }
    }
}

/// A status for the harness to exit with; never zero.
fn exit_status(status: ExitStatus) -> i32 {
    match status.code() {
        Some(0) | None => 1,
        Some(code) => code,
    }
}
