//! Per-run verdict tallies.

use ccdiff_corpus::WorkspaceId;
use ccdiff_pipeline::Verdict;

/// Verdict counts and the failing test cases of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    counts: [usize; Verdict::ALL.len()],
    /// Failing test cases with their verdicts, sorted by id once the run ends.
    pub failures: Vec<(WorkspaceId, Verdict)>,
}

impl RunSummary {
    /// Add one test case's verdict.
    pub fn record(&mut self, id: &WorkspaceId, verdict: Verdict) {
        crate::metrics::record_verdict(verdict);

        self.counts[verdict.index()] += 1;
        if !verdict.is_pass() {
            self.failures.push((id.clone(), verdict));
        }
    }

    /// Put failures in a stable order regardless of job completion order.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.failures.sort();
        self
    }

    #[must_use]
    pub const fn count(&self, verdict: Verdict) -> usize {
        self.counts[verdict.index()]
    }

    #[must_use]
    pub const fn passed(&self) -> usize {
        self.count(Verdict::Pass)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Total number of test cases.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn id(name: &str) -> WorkspaceId {
        ccdiff_corpus::workspace_id(Path::new(&format!("{name}.c")), None)
    }

    #[test]
    fn test_counts() {
        let mut summary = RunSummary::default();
        summary.record(&id("a"), Verdict::Pass);
        summary.record(&id("b"), Verdict::Pass);
        summary.record(&id("c"), Verdict::FalseReject);

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.count(Verdict::FalseReject), 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_empty_summary_passes() {
        assert!(RunSummary::default().all_passed());
    }

    #[test]
    fn test_failures_sorted_on_finish() {
        let mut summary = RunSummary::default();
        summary.record(&id("z"), Verdict::BadAssembly);
        summary.record(&id("a"), Verdict::DivergentExecution);
        let summary = summary.finish();

        let names: Vec<_> = summary.failures.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, ["a", "z"]);
    }
}
