//! The two-compiler staged pipeline.

use std::path::Path;
use std::time::Duration;

use ccdiff_corpus::{Role, WorkspaceLayout};
use tracing::{debug, trace};

use crate::stage::write_file;
use crate::verdict::{Acceptance, CandidateBuild, Verdict, classify};
use crate::{
    CandidateCompiler, Captured, Execution, Invocation, PipelineError, ProcessBackend,
    ReferenceCompiler, Result, Stage, StageResult, render_log,
};

/// Stages attempted for one compiler, in order.
///
/// Stops at the first compile or link stage that exits nonzero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineResult {
    pub role: Role,
    pub stages: Vec<StageResult>,
    pub execution: Option<Execution>,
}

impl PipelineResult {
    const fn new(role: Role) -> Self {
        Self {
            role,
            stages: Vec::new(),
            execution: None,
        }
    }

    /// Record a stage; returns whether the next stage may run.
    fn push(&mut self, result: StageResult) -> bool {
        let ok = result.succeeded();
        self.stages.push(result);
        ok
    }

    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Whether the compile stage exited zero.
    #[must_use]
    pub fn compiled(&self) -> bool {
        self.stage(Stage::Compile).is_some_and(StageResult::succeeded)
    }

    /// Whether the link stage ran and exited zero.
    #[must_use]
    pub fn linked(&self) -> bool {
        self.stage(Stage::Link).is_some_and(StageResult::succeeded)
    }
}

/// Everything recorded for one test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRecord {
    pub reference: PipelineResult,
    pub candidate: PipelineResult,
    pub acceptance: Acceptance,
}

impl JobRecord {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        classify(&self.acceptance)
    }
}

/// Runs the reference and candidate pipelines against one workspace.
#[derive(Clone, Debug)]
pub struct DualCompilerRunner<B> {
    reference: ReferenceCompiler,
    candidate: CandidateCompiler,
    stage_timeout: Option<Duration>,
    backend: B,
}

impl<B: ProcessBackend> DualCompilerRunner<B> {
    pub const fn new(
        reference: ReferenceCompiler,
        candidate: CandidateCompiler,
        backend: B,
    ) -> Self {
        Self {
            reference,
            candidate,
            stage_timeout: None,
            backend,
        }
    }

    /// Kill the candidate compiler and test executables that run longer
    /// than `timeout`. A killed candidate compile counts as a rejection.
    #[must_use]
    pub const fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Run both pipelines and decide which compilers accepted the program.
    ///
    /// The reference accepts when it produces an executable. The candidate's
    /// assembly is linked and run only when both accept.
    ///
    /// # Errors
    /// Returns an error if a program cannot be spawned or a log or artifact
    /// cannot be written.
    pub fn run(&self, layout: &WorkspaceLayout) -> Result<JobRecord> {
        let reference = self.run_reference(layout)?;
        let mut candidate = self.compile_candidate(layout)?;

        let acceptance = match (&reference.execution, candidate.compiled()) {
            (None, false) => Acceptance::BothRejected,
            (None, true) => Acceptance::CandidateOnly,
            (Some(_), false) => Acceptance::ReferenceOnly,
            (Some(reference_run), true) => {
                Acceptance::Both(self.finish_candidate(layout, &mut candidate, reference_run)?)
            }
        };
        debug!(workspace = %layout.dir().display(), ?acceptance, "pipelines finished");

        Ok(JobRecord {
            reference,
            candidate,
            acceptance,
        })
    }

    /// Compile, link and execute with the reference toolchain.
    ///
    /// # Errors
    /// See [`DualCompilerRunner::run`].
    pub fn run_reference(&self, layout: &WorkspaceLayout) -> Result<PipelineResult> {
        let role = Role::Reference;
        let mut result = PipelineResult::new(role);

        let compile = self.stage(layout, role, Stage::Compile, &self.reference.compile(layout))?;
        if !result.push(compile) {
            return Ok(result);
        }

        let link = self.stage(layout, role, Stage::Link, &self.reference.link(layout, role))?;
        if !result.push(link) {
            return Ok(result);
        }

        let (stage, execution) = self.execute(layout, role)?;
        result.push(stage);
        result.execution = Some(execution);
        Ok(result)
    }

    /// Run the candidate compiler; its standard output becomes the assembly file.
    ///
    /// # Errors
    /// See [`DualCompilerRunner::run`].
    pub fn compile_candidate(&self, layout: &WorkspaceLayout) -> Result<PipelineResult> {
        let role = Role::Candidate;
        let mut result = PipelineResult::new(role);

        let invocation = self.candidate.compile(layout).with_timeout(self.stage_timeout);
        let captured = self.invoke(&invocation)?;
        write_file(&layout.assembly(role), &captured.stdout)?;
        trace!(%role, exit_code = captured.exit_code, "candidate compile finished");

        let log_path = layout.log(role, Stage::Compile.as_str());
        write_file(
            &log_path,
            &render_log(&captured.stderr, captured.exit_code, captured.timed_out),
        )?;

        result.push(StageResult {
            stage: Stage::Compile,
            exit_code: captured.exit_code,
            timed_out: captured.timed_out,
            output: captured.stdout,
            log_path,
        });
        Ok(result)
    }

    fn finish_candidate(
        &self,
        layout: &WorkspaceLayout,
        candidate: &mut PipelineResult,
        reference_run: &Execution,
    ) -> Result<CandidateBuild> {
        let role = Role::Candidate;
        let link = self.stage(layout, role, Stage::Link, &self.reference.link(layout, role))?;
        if !candidate.push(link) {
            return Ok(CandidateBuild::LinkFailed);
        }

        let (stage, execution) = self.execute(layout, role)?;
        candidate.push(stage);
        candidate.execution = Some(execution.clone());
        Ok(CandidateBuild::Executed {
            reference: reference_run.clone(),
            candidate: execution,
        })
    }

    fn execute(&self, layout: &WorkspaceLayout, role: Role) -> Result<(StageResult, Execution)> {
        // Relative to the workspace, which is the child's working directory.
        let program = Path::new(".").join(WorkspaceLayout::executable_name(role));
        let invocation = Invocation::new(program, layout.dir()).with_timeout(self.stage_timeout);
        let captured = self.invoke(&invocation)?;
        let exit_code = captured.exit_code;
        let stage = record(layout, role, Stage::Execute, captured)?;
        let execution = Execution {
            stdout: stage.output.clone(),
            exit_code,
        };
        Ok((stage, execution))
    }

    fn stage(
        &self,
        layout: &WorkspaceLayout,
        role: Role,
        stage: Stage,
        invocation: &Invocation,
    ) -> Result<StageResult> {
        let captured = self.invoke(invocation)?;
        record(layout, role, stage, captured)
    }

    fn invoke(&self, invocation: &Invocation) -> Result<Captured> {
        debug!(command = %invocation, cwd = %invocation.cwd.display(), "running");
        self.backend
            .run(invocation)
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.to_string_lossy().into_owned(),
                source,
            })
    }
}

/// Write a stage log holding standard output, then standard error, then the status.
fn record(
    layout: &WorkspaceLayout,
    role: Role,
    stage: Stage,
    captured: Captured,
) -> Result<StageResult> {
    let mut combined = Vec::with_capacity(captured.stdout.len() + captured.stderr.len());
    combined.extend_from_slice(&captured.stdout);
    combined.extend_from_slice(&captured.stderr);

    let log_path = layout.log(role, stage.as_str());
    write_file(
        &log_path,
        &render_log(&combined, captured.exit_code, captured.timed_out),
    )?;
    trace!(%role, %stage, exit_code = captured.exit_code, "stage finished");

    Ok(StageResult {
        stage,
        exit_code: captured.exit_code,
        timed_out: captured.timed_out,
        output: captured.stdout,
        log_path,
    })
}
