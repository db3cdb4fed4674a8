//! Command lines for the reference toolchain and the candidate compiler.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ccdiff_corpus::{Role, WorkspaceLayout};

use crate::Invocation;

/// Reference compiler driver with a gcc-compatible command line.
///
/// Compiles with `-S -o <asm> <src>` and assembles and links with
/// `-o <exe> <asm>`. The same driver links the candidate's assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceCompiler {
    command: String,
}

impl ReferenceCompiler {
    /// Create a reference compiler with the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Default gcc driver.
    #[must_use]
    pub fn gcc() -> Self {
        Self::new("gcc")
    }

    /// Command to invoke.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Compile the workspace source to the reference assembly file.
    #[must_use]
    pub fn compile(&self, layout: &WorkspaceLayout) -> Invocation {
        Invocation::new(&self.command, layout.dir())
            .args(["-S", "-o"])
            .arg(WorkspaceLayout::assembly_name(Role::Reference))
            .arg(layout.source_name())
    }

    /// Assemble and link `role`'s assembly into its executable.
    #[must_use]
    pub fn link(&self, layout: &WorkspaceLayout, role: Role) -> Invocation {
        Invocation::new(&self.command, layout.dir())
            .arg("-o")
            .arg(WorkspaceLayout::executable_name(role))
            .arg(WorkspaceLayout::assembly_name(role))
    }
}

impl Default for ReferenceCompiler {
    fn default() -> Self {
        Self::gcc()
    }
}

impl FromStr for ReferenceCompiler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("reference compiler command is empty".to_string());
        }
        if s.chars().any(char::is_whitespace) {
            return Err(format!(
                "'{s}' contains whitespace; pass a single program, not a shell command"
            ));
        }
        Ok(Self::new(s))
    }
}

/// Compiler under test.
///
/// Takes the source path as its only argument, prints assembly on standard
/// output and exits zero, or exits nonzero to reject the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateCompiler {
    path: PathBuf,
}

impl CandidateCompiler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compile the workspace source; assembly arrives on standard output.
    #[must_use]
    pub fn compile(&self, layout: &WorkspaceLayout) -> Invocation {
        Invocation::new(&self.path, layout.dir()).arg(layout.source_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_command_lines() {
        let layout = WorkspaceLayout::new("/out/case", "c");
        let cc = ReferenceCompiler::default();

        let compile = cc.compile(&layout);
        assert_eq!(compile.to_string(), "gcc -S -o asm-reference.s input.c");
        assert_eq!(compile.cwd, PathBuf::from("/out/case"));

        let link = cc.link(&layout, Role::Candidate);
        assert_eq!(link.to_string(), "gcc -o exe-candidate asm-candidate.s");
    }

    #[test]
    fn test_candidate_command_line() {
        let layout = WorkspaceLayout::new("/out/case", "c");
        let candidate = CandidateCompiler::new("/proj/compiler/ifcc");
        assert_eq!(
            candidate.compile(&layout).to_string(),
            "/proj/compiler/ifcc input.c"
        );
    }

    #[test]
    fn test_parse_reference_compiler() {
        let cc: ReferenceCompiler = "clang-18".parse().unwrap();
        assert_eq!(cc.command(), "clang-18");
        assert!("".parse::<ReferenceCompiler>().is_err());
        assert!("gcc -m32".parse::<ReferenceCompiler>().is_err());
    }
}
