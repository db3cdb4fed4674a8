//! Verdict classification.

use std::fmt;

use crate::Execution;

/// Final judgement for one test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    /// Both compilers agree.
    Pass,
    /// The candidate accepts a program the reference rejects.
    FalseAccept,
    /// The candidate rejects a program the reference accepts.
    FalseReject,
    /// The candidate's assembly does not assemble or link.
    BadAssembly,
    /// Both executables ran but behaved differently.
    DivergentExecution,
}

impl Verdict {
    pub const ALL: [Self; 5] = [
        Self::Pass,
        Self::FalseAccept,
        Self::FalseReject,
        Self::BadAssembly,
        Self::DivergentExecution,
    ];

    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Position in [`Verdict::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable snake-case name, used for metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::FalseAccept => "false_accept",
            Self::FalseReject => "false_reject",
            Self::BadAssembly => "bad_assembly",
            Self::DivergentExecution => "divergent_execution",
        }
    }

    /// Why the test failed, in words; `None` for a pass.
    #[must_use]
    pub const fn reason(self) -> Option<&'static str> {
        match self {
            Self::Pass => None,
            Self::FalseAccept => Some("candidate accepts an invalid program"),
            Self::FalseReject => Some("candidate rejects a valid program"),
            Self::BadAssembly => Some("candidate produces incorrect assembly"),
            Self::DivergentExecution => Some("different results at execution"),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            None => f.write_str("TEST OK"),
            Some(reason) => write!(f, "TEST FAIL ({reason})"),
        }
    }
}

/// What happened once both compilers accepted the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateBuild {
    /// The candidate's assembly was rejected by the assembler or linker.
    LinkFailed,
    /// Both executables ran.
    Executed {
        reference: Execution,
        candidate: Execution,
    },
}

/// Which compilers accepted the program.
///
/// The later stages only exist in the `Both` case, so every reachable
/// combination of pipeline outcomes has exactly one representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acceptance {
    BothRejected,
    CandidateOnly,
    ReferenceOnly,
    Both(CandidateBuild),
}

/// Map an acceptance outcome to its verdict.
#[must_use]
pub fn classify(acceptance: &Acceptance) -> Verdict {
    match acceptance {
        Acceptance::BothRejected => Verdict::Pass,
        Acceptance::CandidateOnly => Verdict::FalseAccept,
        Acceptance::ReferenceOnly => Verdict::FalseReject,
        Acceptance::Both(CandidateBuild::LinkFailed) => Verdict::BadAssembly,
        Acceptance::Both(CandidateBuild::Executed {
            reference,
            candidate,
        }) => {
            if reference == candidate {
                Verdict::Pass
            } else {
                Verdict::DivergentExecution
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(stdout: &str, exit_code: i32) -> Execution {
        Execution {
            stdout: stdout.as_bytes().to_vec(),
            exit_code,
        }
    }

    fn executed(reference: Execution, candidate: Execution) -> Acceptance {
        Acceptance::Both(CandidateBuild::Executed {
            reference,
            candidate,
        })
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify(&Acceptance::BothRejected), Verdict::Pass);
        assert_eq!(classify(&Acceptance::CandidateOnly), Verdict::FalseAccept);
        assert_eq!(classify(&Acceptance::ReferenceOnly), Verdict::FalseReject);
        assert_eq!(
            classify(&Acceptance::Both(CandidateBuild::LinkFailed)),
            Verdict::BadAssembly
        );
        assert_eq!(
            classify(&executed(exec("42\n", 0), exec("42\n", 0))),
            Verdict::Pass
        );
        assert_eq!(
            classify(&executed(exec("42\n", 0), exec("41\n", 0))),
            Verdict::DivergentExecution
        );
    }

    #[test]
    fn test_single_trailing_byte_diverges() {
        assert_eq!(
            classify(&executed(exec("42\n", 0), exec("42\n ", 0))),
            Verdict::DivergentExecution
        );
        assert_eq!(
            classify(&executed(exec("42", 0), exec("42\n", 0))),
            Verdict::DivergentExecution
        );
    }

    #[test]
    fn test_exit_status_is_observable() {
        assert_eq!(
            classify(&executed(exec("", 42), exec("", 41))),
            Verdict::DivergentExecution
        );
        assert_eq!(classify(&executed(exec("", 42), exec("", 42))), Verdict::Pass);
    }

    #[test]
    fn test_verdict_text() {
        assert_eq!(Verdict::Pass.to_string(), "TEST OK");
        assert_eq!(
            Verdict::FalseReject.to_string(),
            "TEST FAIL (candidate rejects a valid program)"
        );
        for (i, verdict) in Verdict::ALL.iter().enumerate() {
            assert_eq!(verdict.index(), i);
            assert_eq!(verdict.is_pass(), verdict.reason().is_none());
        }
    }
}
