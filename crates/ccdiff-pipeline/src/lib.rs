//! Reference and candidate compile/link/execute pipelines.
//!
//! For one workspace, [`DualCompilerRunner`] runs the reference toolchain and
//! the candidate compiler side by side and records every stage. The outcome
//! is reduced to an [`Acceptance`] which [`classify`] maps to a [`Verdict`].

mod pipeline;
mod process;
mod stage;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
mod toolchain;
mod verdict;

pub use ccdiff_corpus::{Role, WorkspaceLayout};
pub use pipeline::{DualCompilerRunner, JobRecord, PipelineResult};
pub use process::{
    Captured, Invocation, ProcessBackend, SIGNAL_EXIT_BASE, SystemBackend, TIMEOUT_EXIT_CODE,
};
pub use stage::{Execution, Stage, StageResult, render_log};
pub use toolchain::{CandidateCompiler, ReferenceCompiler};
pub use verdict::{Acceptance, CandidateBuild, Verdict, classify};

use std::path::PathBuf;

use thiserror::Error;

/// Environmental failures while running a pipeline.
///
/// These are not test failures: they mean the harness itself could not do
/// its job, and they abort the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
