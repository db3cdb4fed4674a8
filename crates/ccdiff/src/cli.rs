//! CLI definitions.

use std::path::{Path, PathBuf};

use ccdiff::config::DEFAULT_TIMEOUT_SECS;
use ccdiff::{HarnessConfig, Verbosity};
use ccdiff_corpus::{DEFAULT_SUFFIX, normalize_lexically};
use ccdiff_pipeline::ReferenceCompiler;
use clap::{ArgAction, Parser};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "ccdiff")]
#[command(about = "Differential tester - checks a candidate compiler against a reference compiler")]
#[command(version)]
pub struct Cli {
    /// Test-case files or directories to search
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Show more detail for failing tests (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable harness debug logs (repeat for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,

    /// Reference compiler driver (gcc-compatible command line)
    #[arg(long, value_name = "CMD", default_value = "gcc")]
    pub cc: ReferenceCompiler,

    /// Candidate compiler [default: <BASE_DIR>/compiler/ifcc]
    #[arg(long, value_name = "PATH")]
    pub candidate: Option<PathBuf>,

    /// Project root, hidden from test-case names [default: current directory]
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Output directory, wiped at start [default: <BASE_DIR>/ccdiff-output]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Test-case filename suffix
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Number of parallel jobs (0 = auto)
    #[arg(short = 'j', long, default_value = "0")]
    pub jobs: usize,

    /// Timeout for the candidate compiler and each test executable in seconds (0 = none)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Do not rebuild the candidate compiler before testing
    #[arg(long)]
    pub no_rebuild: bool,

    /// Show metrics summary after execution
    #[arg(long)]
    pub metrics: bool,
}

impl Cli {
    /// Default tracing directive for the requested debug level.
    pub const fn log_directive(&self) -> &'static str {
        match self.debug {
            0 => "ccdiff=warn",
            1 => "ccdiff=debug",
            _ => "ccdiff=trace",
        }
    }

    /// Build the run configuration, resolving paths against `cwd`.
    pub fn to_config(&self, cwd: &Path) -> HarnessConfig {
        let resolve = |path: &Path| normalize_lexically(&cwd.join(path));
        let base_dir = self
            .base_dir
            .as_deref()
            .map_or_else(|| cwd.to_path_buf(), resolve);

        let mut config = HarnessConfig::new(base_dir)
            .with_inputs(self.paths.clone())
            .with_suffix(self.suffix.trim_start_matches('.'))
            .with_reference(self.cc.clone())
            .with_verbosity(Verbosity::new(self.verbose))
            .with_jobs(self.jobs)
            .with_timeout(self.timeout)
            .with_rebuild(!self.no_rebuild);
        if let Some(output) = &self.output {
            config = config.with_output_dir(resolve(output));
        }
        if let Some(candidate) = &self.candidate {
            config = config.with_candidate(resolve(candidate));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ccdiff").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["ccdiff"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["tests"]);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.cc.command(), "gcc");
        assert_eq!(cli.log_directive(), "ccdiff=warn");

        let config = cli.to_config(Path::new("/proj"));
        assert_eq!(config.inputs, [PathBuf::from("tests")]);
        assert_eq!(config.output_dir, PathBuf::from("/proj/ccdiff-output"));
        assert_eq!(config.candidate.path(), Path::new("/proj/compiler/ifcc"));
        assert!(config.rebuild);
    }

    #[test]
    fn test_repeated_flags_count() {
        let cli = parse(&["-vv", "-d", "-d", "a.c"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_directive(), "ccdiff=trace");
        assert!(cli.to_config(Path::new("/")).verbosity.shows_reference_run());
    }

    #[test]
    fn test_paths_resolve_against_cwd() {
        let cli = parse(&[
            "--base-dir",
            "..",
            "--output",
            "out",
            "--candidate",
            "/opt/ifcc",
            "--suffix",
            ".cc",
            "t",
        ]);
        let config = cli.to_config(Path::new("/home/me/proj"));
        assert_eq!(config.base_dir, PathBuf::from("/home/me"));
        assert_eq!(config.output_dir, PathBuf::from("/home/me/proj/out"));
        assert_eq!(config.candidate.path(), Path::new("/opt/ifcc"));
        assert_eq!(config.suffix, "cc");
    }

    #[test]
    fn test_reference_compiler_must_be_one_program() {
        assert!(Cli::try_parse_from(["ccdiff", "--cc", "gcc -m32", "t"]).is_err());
        assert_eq!(parse(&["--cc", "clang", "t"]).cc.command(), "clang");
    }

    #[test]
    fn test_no_rebuild_and_timeout() {
        let config = parse(&["--no-rebuild", "--timeout", "0", "-j", "4", "t"])
            .to_config(Path::new("/proj"));
        assert!(!config.rebuild);
        assert_eq!(config.stage_timeout, None);
        assert_eq!(config.worker_count(), 4);
    }
}
