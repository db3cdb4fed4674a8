//! ccdiff - differential testing of a candidate compiler against a reference compiler.
//!
//! Every source program in a corpus is compiled by both compilers in its own
//! workspace. Accept/reject decisions are compared, and when both compilers
//! accept, so is the observable behaviour of the two executables.
//!
//! The pieces are split across three crates:
//! - [`ccdiff_corpus`]: test-case discovery and workspaces
//! - [`ccdiff_pipeline`]: the staged compile/link/execute pipelines and verdicts
//! - this crate: configuration, the candidate rebuild check, the job pool and
//!   reporting

pub mod config;
pub mod metrics;
pub mod rebuild;
pub mod report;
pub mod runner;
pub mod summary;

pub use ccdiff_corpus::{CorpusError, TestCase, WorkspaceId};
pub use ccdiff_pipeline::{JobRecord, PipelineError, Verdict};
pub use config::HarnessConfig;
pub use rebuild::{RebuildError, Rebuilder};
pub use report::{Reporter, Verbosity};
pub use runner::{JobOutcome, discover, plan, run_jobs, system_runner};
pub use summary::RunSummary;

use thiserror::Error;

/// Harness errors. Every variant aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Rebuild(#[from] RebuildError),
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

impl Error {
    /// Process exit status for this error.
    ///
    /// A failed rebuild exits with make's own status.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Rebuild(RebuildError::Failed { status, .. }) => *status,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
