//! Harness configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ccdiff_corpus::{DEFAULT_OUTPUT_DIR, DEFAULT_SUFFIX, DiscoverOptions};
use ccdiff_pipeline::{CandidateCompiler, ReferenceCompiler};

use crate::report::Verbosity;

/// Candidate compiler location relative to the base directory.
pub const DEFAULT_CANDIDATE: &str = "compiler/ifcc";

/// Default timeout in seconds for the candidate compiler and test executables.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Everything one run needs to know, fixed before the first job starts.
///
/// Paths given to the builder methods are resolved against the base
/// directory, so every path the run uses is absolute.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Files and directories to search for test cases.
    pub inputs: Vec<PathBuf>,
    /// Project root; its prefix is hidden from workspace names.
    pub base_dir: PathBuf,
    /// Root of all workspaces. Wiped at the start of every run.
    pub output_dir: PathBuf,
    /// Source suffix without the dot.
    pub suffix: String,
    pub reference: ReferenceCompiler,
    pub candidate: CandidateCompiler,
    pub verbosity: Verbosity,
    /// Worker count (0 = one per CPU).
    pub jobs: usize,
    /// Kill the candidate compiler and test executables after this long.
    pub stage_timeout: Option<Duration>,
    /// Check the candidate binary is up to date before testing.
    pub rebuild: bool,
}

impl HarnessConfig {
    /// Defaults rooted at `base_dir`, which should be absolute.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            inputs: Vec::new(),
            output_dir: base_dir.join(DEFAULT_OUTPUT_DIR),
            suffix: DEFAULT_SUFFIX.to_string(),
            reference: ReferenceCompiler::default(),
            candidate: CandidateCompiler::new(base_dir.join(DEFAULT_CANDIDATE)),
            verbosity: Verbosity::default(),
            jobs: 0,
            stage_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            rebuild: true,
            base_dir,
        }
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        self.inputs = inputs;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = self.base_dir.join(dir);
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceCompiler) -> Self {
        self.reference = reference;
        self
    }

    #[must_use]
    pub fn with_candidate(mut self, path: impl AsRef<Path>) -> Self {
        self.candidate = CandidateCompiler::new(self.base_dir.join(path));
        self
    }

    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set the candidate-compile and execute timeout in seconds; 0 disables it.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.stage_timeout = if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        };
        self
    }

    #[must_use]
    pub const fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Number of worker threads to start.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    #[must_use]
    pub fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions::default()
            .with_suffix(self.suffix.clone())
            .with_output_dir(self.output_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_base_dir() {
        let config = HarnessConfig::new("/proj");
        assert_eq!(config.output_dir, PathBuf::from("/proj/ccdiff-output"));
        assert_eq!(
            config.candidate.path(),
            Path::new("/proj/compiler/ifcc")
        );
        assert_eq!(config.reference.command(), "gcc");
        assert_eq!(config.suffix, "c");
        assert_eq!(config.stage_timeout, Some(Duration::from_secs(10)));
        assert!(config.rebuild);
    }

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let config = HarnessConfig::new("/proj")
            .with_output_dir("out")
            .with_candidate("/opt/ifcc");
        assert_eq!(config.output_dir, PathBuf::from("/proj/out"));
        assert_eq!(config.candidate.path(), Path::new("/opt/ifcc"));
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = HarnessConfig::new("/proj").with_timeout(0);
        assert_eq!(config.stage_timeout, None);
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(HarnessConfig::new("/proj").with_jobs(3).worker_count(), 3);
        assert!(HarnessConfig::new("/proj").worker_count() >= 1);
    }

    #[test]
    fn test_discover_options() {
        let options = HarnessConfig::new("/proj").with_suffix("cpp").discover_options();
        assert_eq!(options.suffix, "cpp");
        assert_eq!(
            options.output_dir.as_deref(),
            Some(Path::new("/proj/ccdiff-output"))
        );
    }
}
