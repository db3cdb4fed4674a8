//! Test-case discovery and workspace preparation.
//!
//! Turns command-line paths into a sorted list of source files, then gives
//! each distinct source file its own directory under the output root.

mod discover;
mod identity;
mod workspace;

pub use discover::{DiscoverOptions, collect, normalize_lexically};
pub use identity::FileIdentity;
pub use workspace::{
    Role, TestCase, WorkspaceId, WorkspaceLayout, ensure_outside_output_dir, prepare,
    reset_output_dir, workspace_id,
};

use std::path::PathBuf;

use thiserror::Error;

/// Default source suffix.
pub const DEFAULT_SUFFIX: &str = "c";

/// Default output directory name, relative to the base directory.
pub const DEFAULT_OUTPUT_DIR: &str = "ccdiff-output";

/// Discovery and workspace errors.
///
/// All of these abort the run before any test case is processed.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("incorrect filename suffix (should be '.{expected}'): {path}")]
    BadSuffix { path: PathBuf, expected: String },
    #[error("cannot read input path '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("found no test-case in: {0}")]
    NoTestCases(String),
    #[error("input filename is within output directory: {0}")]
    InsideOutputDir(PathBuf),
    #[error("cannot run from within the output directory {0}")]
    RunFromOutputDir(PathBuf),
    #[error("workspace error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CorpusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;
