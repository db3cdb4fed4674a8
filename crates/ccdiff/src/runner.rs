//! Job orchestration.
//!
//! Discovery and workspace preparation run once up front; the test cases
//! then run on a bounded rayon pool. The only state the jobs share is the
//! [`RunSummary`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use ccdiff_corpus::{TestCase, collect, prepare, reset_output_dir};
use ccdiff_pipeline::{DualCompilerRunner, JobRecord, ProcessBackend, SystemBackend, Verdict};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::config::HarnessConfig;
use crate::summary::RunSummary;
use crate::{Error, Result};

/// One finished test case.
#[derive(Debug)]
pub struct JobOutcome<'a> {
    pub case: &'a TestCase,
    pub record: JobRecord,
    pub verdict: Verdict,
    pub duration: Duration,
}

/// Find the source files named by the configured inputs.
///
/// # Errors
/// See [`ccdiff_corpus::collect`].
pub fn discover(config: &HarnessConfig) -> Result<Vec<PathBuf>> {
    let sources = collect(&config.inputs, &config.discover_options())?;
    debug!(count = sources.len(), "discovered sources");
    Ok(sources)
}

/// Wipe the output directory and create one workspace per distinct source.
///
/// # Errors
/// See [`ccdiff_corpus::prepare`].
pub fn plan(config: &HarnessConfig, sources: &[PathBuf]) -> Result<Vec<TestCase>> {
    reset_output_dir(&config.output_dir)?;
    let cases = prepare(
        &config.output_dir,
        sources,
        Some(&config.base_dir),
        &config.suffix,
    )?;
    crate::metrics::record_test_cases(cases.len());
    Ok(cases)
}

/// Pipeline runner for the configured toolchains, spawning real processes.
#[must_use]
pub fn system_runner(config: &HarnessConfig) -> DualCompilerRunner<SystemBackend> {
    DualCompilerRunner::new(
        config.reference.clone(),
        config.candidate.clone(),
        SystemBackend,
    )
    .with_stage_timeout(config.stage_timeout)
}

/// Run every test case on `workers` threads.
///
/// `on_done` is called once per finished test case, from the worker thread
/// that ran it. A test failure is a verdict, not an error; an error stops
/// the remaining jobs.
///
/// # Errors
/// Fails if the pool cannot be started or a job hits a [`PipelineError`].
///
/// [`PipelineError`]: ccdiff_pipeline::PipelineError
pub fn run_jobs<B, F>(
    cases: &[TestCase],
    runner: &DualCompilerRunner<B>,
    workers: usize,
    on_done: F,
) -> Result<RunSummary>
where
    B: ProcessBackend,
    F: Fn(&JobOutcome<'_>) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("ccdiff-job-{i}"))
        .build()?;
    let summary = Mutex::new(RunSummary::default());

    pool.install(|| {
        cases.par_iter().try_for_each(|case| -> Result<()> {
            let _span = info_span!("job", id = %case.id).entered();
            let start = Instant::now();
            let record = runner.run(&case.layout).map_err(Error::from)?;
            let duration = start.elapsed();
            crate::metrics::record_job(duration);

            let outcome = JobOutcome {
                case,
                verdict: record.verdict(),
                record,
                duration,
            };
            debug!(verdict = outcome.verdict.as_str(), ?duration, "job finished");
            on_done(&outcome);
            summary.lock().record(&case.id, outcome.verdict);
            Ok(())
        })
    })?;

    Ok(summary.into_inner().finish())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use ccdiff_pipeline::test_support::{FakeBackend, Scenario};
    use ccdiff_pipeline::{CandidateCompiler, ReferenceCompiler};

    use super::*;

    fn corpus(root: &Path, names: &[&str]) -> HarnessConfig {
        for name in names {
            let path = root.join("tests").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "int main() { return 0; }\n").unwrap();
        }
        HarnessConfig::new(root).with_inputs(vec![root.join("tests")])
    }

    fn fake_runner(scenario: &Scenario) -> DualCompilerRunner<FakeBackend> {
        DualCompilerRunner::new(
            ReferenceCompiler::gcc(),
            CandidateCompiler::new("/proj/compiler/ifcc"),
            scenario.backend(),
        )
    }

    #[test]
    fn test_plan_creates_one_workspace_per_source() {
        let tmp = tempfile::tempdir().unwrap();
        let config = corpus(tmp.path(), &["a.c", "sub/b.c"]);

        let sources = discover(&config).unwrap();
        let cases = plan(&config, &sources).unwrap();

        let ids: Vec<_> = cases.iter().map(TestCase::name).collect();
        assert_eq!(ids, ["tests-a", "tests-sub-b"]);
        for case in &cases {
            assert!(case.layout.source().is_file());
            assert!(case.layout.dir().starts_with(&config.output_dir));
        }
    }

    #[test]
    fn test_plan_wipes_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let config = corpus(tmp.path(), &["a.c"]);
        let stale = config.output_dir.join("old-case");
        fs::create_dir_all(&stale).unwrap();

        let sources = discover(&config).unwrap();
        plan(&config, &sources).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_second_run_over_project_root() {
        let tmp = tempfile::tempdir().unwrap();
        let config = corpus(tmp.path(), &["a.c"]).with_inputs(vec![tmp.path().to_path_buf()]);
        assert!(config.output_dir.starts_with(tmp.path()));

        let first = discover(&config).unwrap();
        plan(&config, &first).unwrap();
        assert!(config.output_dir.join("tests-a/input.c").is_file());

        let second = discover(&config).unwrap();
        assert_eq!(first, second);
        let cases = plan(&config, &second).unwrap();
        assert_eq!(cases.len(), 1);
    }

    #[test]
    fn test_run_jobs_tallies_every_case() {
        let tmp = tempfile::tempdir().unwrap();
        let config = corpus(tmp.path(), &["a.c", "b.c", "c.c"]);
        let cases = plan(&config, &discover(&config).unwrap()).unwrap();

        let seen = Mutex::new(Vec::new());
        let runner = fake_runner(&Scenario::agreeing("0\n").candidate_prints("1\n"));
        let summary = run_jobs(&cases, &runner, 2, |outcome| {
            seen.lock().push(outcome.case.name().to_string());
        })
        .unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.count(Verdict::DivergentExecution), 3);
        let names: Vec<_> = summary.failures.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, ["tests-a", "tests-b", "tests-c"]);

        let mut seen = seen.into_inner();
        seen.sort();
        assert_eq!(seen, ["tests-a", "tests-b", "tests-c"]);
    }

    #[test]
    fn test_environment_error_aborts_run() {
        let tmp = tempfile::tempdir().unwrap();
        let config = corpus(tmp.path(), &["a.c"]);
        let cases = plan(&config, &discover(&config).unwrap()).unwrap();

        let runner = fake_runner(&Scenario::agreeing("").unspawnable_candidate());
        let err = run_jobs(&cases, &runner, 1, |_| {}).unwrap_err();
        assert!(matches!(err, Error::Pipeline(_)), "{err}");
    }
}
