//! Scripted process backend for exercising pipelines without real toolchains.

use std::fmt;
use std::io;

use parking_lot::Mutex;

use crate::{Captured, Invocation, ProcessBackend, TIMEOUT_EXIT_CODE};

type Responder = dyn Fn(&Invocation) -> io::Result<Captured> + Send + Sync;

/// Backend answering each invocation from a closure and recording it.
pub struct FakeBackend {
    respond: Box<Responder>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeBackend {
    pub fn new(
        respond: impl Fn(&Invocation) -> io::Result<Captured> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Invocations seen so far, in call order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }
}

impl fmt::Debug for FakeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeBackend")
            .field("invocations", &self.invocations.lock().len())
            .finish_non_exhaustive()
    }
}

impl ProcessBackend for FakeBackend {
    fn run(&self, invocation: &Invocation) -> io::Result<Captured> {
        self.invocations.lock().push(invocation.clone());
        (self.respond)(invocation)
    }
}

/// Behaviour of a gcc-like reference driver and a candidate compiler.
///
/// Starts from two compilers that agree on a valid program; the builder
/// methods introduce one disagreement each.
#[derive(Clone, Debug)]
pub struct Scenario {
    reference_compiles: bool,
    reference_links: bool,
    candidate_spawns: bool,
    candidate_hangs: bool,
    candidate_compiles: bool,
    candidate_links: bool,
    reference_stdout: String,
    candidate_stdout: String,
    exit_code: i32,
}

impl Scenario {
    /// Assembly text the candidate prints when it accepts.
    pub const ASSEMBLY: &'static str = "\t.globl main\nmain:\n\tmovl $42, %eax\n\tret\n";

    /// Both compilers accept and both executables print `stdout`.
    #[must_use]
    pub fn agreeing(stdout: &str) -> Self {
        Self {
            reference_compiles: true,
            reference_links: true,
            candidate_spawns: true,
            candidate_hangs: false,
            candidate_compiles: true,
            candidate_links: true,
            reference_stdout: stdout.to_string(),
            candidate_stdout: stdout.to_string(),
            exit_code: 0,
        }
    }

    #[must_use]
    pub const fn reference_rejects(mut self) -> Self {
        self.reference_compiles = false;
        self
    }

    #[must_use]
    pub const fn reference_link_fails(mut self) -> Self {
        self.reference_links = false;
        self
    }

    #[must_use]
    pub const fn candidate_rejects(mut self) -> Self {
        self.candidate_compiles = false;
        self
    }

    #[must_use]
    pub const fn candidate_link_fails(mut self) -> Self {
        self.candidate_links = false;
        self
    }

    /// The candidate binary cannot be started at all.
    #[must_use]
    pub const fn unspawnable_candidate(mut self) -> Self {
        self.candidate_spawns = false;
        self
    }

    /// The candidate compiler never finishes; it is reported as killed when
    /// its invocation carries a timeout.
    #[must_use]
    pub const fn candidate_hangs(mut self) -> Self {
        self.candidate_hangs = true;
        self
    }

    #[must_use]
    pub fn candidate_prints(mut self, stdout: &str) -> Self {
        self.candidate_stdout = stdout.to_string();
        self
    }

    /// Exit status of both executables.
    #[must_use]
    pub const fn exiting_with(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    #[must_use]
    pub fn backend(&self) -> FakeBackend {
        let scenario = self.clone();
        FakeBackend::new(move |invocation| scenario.respond(invocation))
    }

    fn respond(&self, invocation: &Invocation) -> io::Result<Captured> {
        let has_arg = |wanted: &str| invocation.args.iter().any(|a| a == wanted);

        let captured = match invocation.program_name().as_str() {
            "exe-reference" => Captured::output(self.reference_stdout.clone(), self.exit_code),
            "exe-candidate" => Captured::output(self.candidate_stdout.clone(), self.exit_code),
            _ if has_arg("-S") => outcome(
                self.reference_compiles,
                "input.c:1:12: error: expected ';' before '}' token\n",
            ),
            _ if has_arg("asm-reference.s") => {
                outcome(self.reference_links, "undefined reference to `main'\n")
            }
            _ if has_arg("asm-candidate.s") => outcome(
                self.candidate_links,
                "asm-candidate.s:3: Error: no such instruction: `bogus'\n",
            ),
            _ if !self.candidate_spawns => {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
            }
            _ if self.candidate_hangs && invocation.timeout.is_none() => {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "never exits"));
            }
            _ if self.candidate_hangs => Captured {
                exit_code: TIMEOUT_EXIT_CODE,
                timed_out: true,
                ..Captured::default()
            },
            _ if self.candidate_compiles => Captured::output(Self::ASSEMBLY, 0),
            _ => Captured::failure(1, "syntax error\n"),
        };
        Ok(captured)
    }
}

fn outcome(ok: bool, diagnostic: &str) -> Captured {
    if ok {
        Captured::success()
    } else {
        Captured::failure(1, diagnostic)
    }
}
