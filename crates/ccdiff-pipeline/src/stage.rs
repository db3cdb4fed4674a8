use std::fmt;
use std::path::{Path, PathBuf};

use crate::{PipelineError, Result};

/// Pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Source to assembly.
    Compile,
    /// Assembly to executable.
    Link,
    /// Run the executable.
    Execute,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Link => "link",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one attempted stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub exit_code: i32,
    pub timed_out: bool,
    /// Captured standard output.
    pub output: Vec<u8>,
    pub log_path: PathBuf,
}

impl StageResult {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Observable behaviour of a test executable: what it printed and how it exited.
///
/// Two executions match only if both fields are identical, byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    pub stdout: Vec<u8>,
    pub exit_code: i32,
}

/// Log file contents: the captured output followed by the exit status.
#[must_use]
pub fn render_log(output: &[u8], exit_code: i32, timed_out: bool) -> Vec<u8> {
    let mut log = Vec::with_capacity(output.len() + 32);
    log.extend_from_slice(output);
    if timed_out {
        log.extend_from_slice(b"\ntimed out\n");
    }
    log.extend_from_slice(format!("\nexit status: {exit_code}\n").as_bytes());
    log
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    })
}
