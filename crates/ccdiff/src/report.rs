//! Per-test-case reports and the end-of-run summary.
//!
//! Each job's report is rendered into one string so concurrent jobs never
//! interleave their output.

use std::fmt::Write;
use std::fs;
use std::path::Path;

use ccdiff_corpus::TestCase;
use ccdiff_pipeline::{JobRecord, Role, Stage, Verdict};

use crate::summary::RunSummary;

/// Printed at the end of a failing run that was not verbose.
pub const VERBOSE_HINT: &str =
    "Some test-cases failed. Run with '--verbose' for more detailed feedback.";

/// How much detail to show per test case.
///
/// - 0: test case name and verdict
/// - 1: also the artifacts and logs explaining a failure
/// - 2: also the reference program's output for every test case
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }

    /// Dump artifacts explaining failures.
    #[must_use]
    pub const fn explains_failures(self) -> bool {
        self.0 >= 1
    }

    /// Dump the reference execution log of every test case.
    #[must_use]
    pub const fn shows_reference_run(self) -> bool {
        self.0 >= 2
    }
}

/// Renders reports at a fixed verbosity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reporter {
    verbosity: Verbosity,
}

impl Reporter {
    #[must_use]
    pub const fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Render the report block of one test case.
    #[must_use]
    pub fn render_job(&self, case: &TestCase, record: &JobRecord) -> String {
        let layout = &case.layout;
        let verdict = record.verdict();
        let mut out = String::new();
        let _ = writeln!(out, "TEST-CASE: {}", case.id);

        if self.verbosity.shows_reference_run()
            && record.reference.stage(Stage::Execute).is_some()
            && verdict != Verdict::DivergentExecution
        {
            dump(&mut out, None, &layout.log(Role::Reference, Stage::Execute.as_str()));
        }

        let _ = writeln!(out, "{verdict}");

        if !self.verbosity.explains_failures() {
            return out;
        }

        let candidate_asm = layout.assembly(Role::Candidate);
        let candidate_log = |stage: Stage| layout.log(Role::Candidate, stage.as_str());
        match verdict {
            Verdict::Pass => {}
            Verdict::FalseAccept => {
                // Why the reference refused the program.
                let stage = if record.reference.compiled() {
                    Stage::Link
                } else {
                    Stage::Compile
                };
                dump(&mut out, None, &layout.log(Role::Reference, stage.as_str()));
            }
            Verdict::FalseReject => {
                dump(&mut out, None, &candidate_asm);
                dump(&mut out, None, &candidate_log(Stage::Compile));
            }
            Verdict::BadAssembly => {
                dump(&mut out, None, &candidate_asm);
                dump(&mut out, None, &candidate_log(Stage::Link));
            }
            Verdict::DivergentExecution => {
                let reference = layout.log(Role::Reference, Stage::Execute.as_str());
                dump(&mut out, Some("reference"), &reference);
                dump(&mut out, Some("candidate"), &candidate_log(Stage::Execute));
            }
        }
        out
    }

    /// Render the end-of-run summary.
    #[must_use]
    pub fn render_summary(&self, summary: &RunSummary) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\n{} test-cases: {} passed, {} failed",
            summary.total(),
            summary.passed(),
            summary.failed()
        );
        for verdict in Verdict::ALL {
            let count = summary.count(verdict);
            let Some(reason) = verdict.reason() else {
                continue;
            };
            if count > 0 {
                let _ = writeln!(out, "  {count:>4}  {reason}");
            }
        }
        if !summary.failures.is_empty() {
            out.push_str("\nFailures:\n");
            for (id, verdict) in &summary.failures {
                let _ = writeln!(out, "  {id} ({})", verdict.as_str());
            }
        }
        if !summary.all_passed() && !self.verbosity.explains_failures() {
            let _ = writeln!(out, "\n{VERBOSE_HINT}");
        }
        out
    }
}

/// Append a file's contents, under `label` if given.
fn dump(out: &mut String, label: Option<&str>, path: &Path) {
    if let Some(label) = label {
        let _ = writeln!(out, "{label}:");
    }
    match fs::read(path) {
        Ok(bytes) => {
            out.push_str(&String::from_utf8_lossy(&bytes));
            if !bytes.is_empty() && !bytes.ends_with(b"\n") {
                out.push('\n');
            }
        }
        Err(e) => {
            let _ = writeln!(out, "(cannot read {}: {e})", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccdiff_corpus::workspace_id;
    use ccdiff_pipeline::test_support::Scenario;
    use ccdiff_pipeline::{CandidateCompiler, DualCompilerRunner, ReferenceCompiler};

    fn run(scenario: &Scenario) -> (tempfile::TempDir, TestCase, JobRecord) {
        let tmp = tempfile::tempdir().unwrap();
        let case = TestCase {
            source: "tests/ret42.c".into(),
            id: workspace_id(Path::new("tests/ret42.c"), None),
            layout: ccdiff_pipeline::WorkspaceLayout::new(tmp.path(), "c"),
        };
        fs::write(case.layout.source(), "int main() { return 42; }\n").unwrap();
        let runner = DualCompilerRunner::new(
            ReferenceCompiler::gcc(),
            CandidateCompiler::new("/proj/compiler/ifcc"),
            scenario.backend(),
        );
        let record = runner.run(&case.layout).unwrap();
        (tmp, case, record)
    }

    fn render(level: u8, scenario: &Scenario) -> String {
        let (_tmp, case, record) = run(scenario);
        Reporter::new(Verbosity::new(level)).render_job(&case, &record)
    }

    #[test]
    fn test_quiet_pass() {
        assert_eq!(
            render(0, &Scenario::agreeing("42\n")),
            "TEST-CASE: tests-ret42\nTEST OK\n"
        );
    }

    #[test]
    fn test_quiet_failure_has_no_dumps() {
        assert_eq!(
            render(0, &Scenario::agreeing("42\n").candidate_rejects()),
            "TEST-CASE: tests-ret42\nTEST FAIL (candidate rejects a valid program)\n"
        );
    }

    #[test]
    fn test_verbose_false_reject_dumps_compile_log() {
        let out = render(1, &Scenario::agreeing("42\n").candidate_rejects());
        assert!(out.ends_with("syntax error\n\nexit status: 1\n"), "{out}");
    }

    #[test]
    fn test_verbose_false_accept_dumps_reference_diagnostics() {
        let out = render(1, &Scenario::agreeing("").reference_rejects());
        assert_eq!(
            out,
            "TEST-CASE: tests-ret42\n\
             TEST FAIL (candidate accepts an invalid program)\n\
             input.c:1:12: error: expected ';' before '}' token\n\nexit status: 1\n"
        );

        let out = render(1, &Scenario::agreeing("").reference_link_fails());
        assert!(out.contains("undefined reference to `main'"), "{out}");
    }

    #[test]
    fn test_verbose_bad_assembly_dumps_assembly_and_link_log() {
        let out = render(1, &Scenario::agreeing("42\n").candidate_link_fails());
        assert!(out.contains(Scenario::ASSEMBLY), "{out}");
        assert!(out.contains("no such instruction"), "{out}");
    }

    #[test]
    fn test_verbose_divergence_labels_both_runs() {
        let out = render(1, &Scenario::agreeing("42\n").candidate_prints("41\n"));
        let expected = "TEST-CASE: tests-ret42\n\
                        TEST FAIL (different results at execution)\n\
                        reference:\n42\n\nexit status: 0\n\
                        candidate:\n41\n\nexit status: 0\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_very_verbose_shows_reference_run() {
        let out = render(2, &Scenario::agreeing("42\n"));
        assert_eq!(
            out,
            "TEST-CASE: tests-ret42\n42\n\nexit status: 0\nTEST OK\n"
        );
        // No reference run to show when the reference rejected.
        let out = render(2, &Scenario::agreeing("").reference_rejects().candidate_rejects());
        assert_eq!(out, "TEST-CASE: tests-ret42\nTEST OK\n");
    }

    #[test]
    fn test_summary_hint() {
        let mut summary = RunSummary::default();
        let (_tmp, case, _) = run(&Scenario::agreeing("42\n"));
        summary.record(&case.id, Verdict::FalseAccept);

        let quiet = Reporter::default().render_summary(&summary);
        assert!(quiet.contains("1 failed"));
        assert!(quiet.contains("candidate accepts an invalid program"));
        assert!(quiet.contains("tests-ret42 (false_accept)"));
        assert!(quiet.ends_with(&format!("{VERBOSE_HINT}\n")));

        let verbose = Reporter::new(Verbosity::new(1)).render_summary(&summary);
        assert!(!verbose.contains(VERBOSE_HINT));
    }

    #[test]
    fn test_all_passing_summary() {
        let mut summary = RunSummary::default();
        let (_tmp, case, _) = run(&Scenario::agreeing("42\n"));
        summary.record(&case.id, Verdict::Pass);

        let out = Reporter::default().render_summary(&summary);
        assert_eq!(out, "\n1 test-cases: 1 passed, 0 failed\n");
    }
}
