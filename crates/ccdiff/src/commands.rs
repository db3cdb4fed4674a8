//! Command implementation.

use std::env;

use ccdiff::{
    Error, HarnessConfig, RebuildError, Rebuilder, Reporter, RunSummary, discover, plan, run_jobs,
    system_runner,
};
use ccdiff_corpus::ensure_outside_output_dir;
use tracing::debug;

use crate::cli::{Cli, EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Progress, Spinner};

/// Run the harness and return the process exit status.
pub fn run_command(cli: &Cli) -> i32 {
    match run(cli) {
        Ok(summary) if summary.all_passed() => EXIT_SUCCESS,
        Ok(_) => EXIT_FAILURE,
        Err(e) => {
            terminal::error(&format!("error: {e}"));
            e.exit_code()
        }
    }
}

fn run(cli: &Cli) -> ccdiff::Result<RunSummary> {
    let cwd = env::current_dir().map_err(Error::CurrentDir)?;
    let config = cli.to_config(&cwd);
    debug!(?config, "configuration");

    ensure_outside_output_dir(&cwd, &config.output_dir)?;
    let sources = discover(&config)?;
    if config.rebuild {
        rebuild_candidate(&config)?;
    }
    let cases = plan(&config, &sources)?;

    let reporter = Reporter::new(config.verbosity);
    let runner = system_runner(&config);
    let progress = Progress::new(u64::try_from(cases.len()).unwrap_or(u64::MAX), "testing");
    let summary = run_jobs(&cases, &runner, config.worker_count(), |outcome| {
        progress.print(&reporter.render_job(outcome.case, &outcome.record));
        progress.inc(1);
    });
    progress.finish();

    let summary = summary?;
    print!("{}", reporter.render_summary(&summary));
    Ok(summary)
}

/// Bring the candidate binary up to date when it is built with make.
fn rebuild_candidate(config: &HarnessConfig) -> Result<(), RebuildError> {
    let rebuilder = Rebuilder::new(config.candidate.path())?;
    if !rebuilder.has_makefile() {
        debug!(candidate = %config.candidate.path().display(), "no makefile, skipping rebuild");
        return Ok(());
    }

    let spinner = Spinner::new(format!("checking {}", rebuilder.target()));
    if !rebuilder.is_stale()? {
        spinner.finish_and_clear();
        return Ok(());
    }
    spinner.finish_with_warning(&format!("{} is out of date", rebuilder.target()));

    terminal::info(&format!("rebuilding {}", rebuilder.target()));
    rebuilder.build()?;
    terminal::success(&format!("rebuilt {}", rebuilder.target()));
    Ok(())
}
