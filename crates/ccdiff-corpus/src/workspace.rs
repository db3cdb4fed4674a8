//! Per-test-case workspace directories.
//!
//! Each distinct source file gets one directory under the output root, named
//! by flattening its path into a single component (see [`workspace_id`]).

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::discover::normalize_lexically;
use crate::{CorpusError, FileIdentity, Result};

/// Marker standing in for a `..` component in a workspace id.
const PARENT_MARKER: &str = "-";

/// Separator replacing path separators in a workspace id.
const SEPARATOR: &str = "-";

/// Name of a test case's workspace directory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numbered(&self, n: usize) -> Self {
        Self(format!("{}~{n}", self.0))
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the workspace id of a source path.
///
/// The suffix is stripped, `base_dir` is removed when it prefixes the path,
/// `..` components become `-` and the remaining components are joined with
/// `-`. An absolute path keeps a leading `-` for its root, so
/// `../t.c` (`--t`), `/t.c` (`-t`) and `t.c` (`t`) stay distinct.
///
/// Distinct paths can still flatten to the same id (`a-b.c` and `a/b.c`);
/// [`prepare`] disambiguates those.
#[must_use]
pub fn workspace_id(source: &Path, base_dir: Option<&Path>) -> WorkspaceId {
    let stem = normalize_lexically(&source.with_extension(""));
    let relative = base_dir
        .map(normalize_lexically)
        .and_then(|base| stem.strip_prefix(base).ok().map(Path::to_path_buf))
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(stem);

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Prefix(prefix) => Some(
                prefix
                    .as_os_str()
                    .to_string_lossy()
                    .replace([':', '\\', '?'], ""),
            ),
            Component::RootDir => Some(String::new()),
            Component::CurDir => None,
            Component::ParentDir => Some(PARENT_MARKER.to_string()),
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        })
        .collect();

    let id = parts.join(SEPARATOR);
    if id.is_empty() {
        WorkspaceId("_".to_string())
    } else {
        WorkspaceId(id)
    }
}

/// Which compiler an artifact belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Reference,
    Candidate,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File names inside one workspace directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspaceLayout {
    dir: PathBuf,
    suffix: String,
}

impl WorkspaceLayout {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical name of the copied source, relative to the workspace.
    #[must_use]
    pub fn source_name(&self) -> String {
        format!("input.{}", self.suffix)
    }

    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.dir.join(self.source_name())
    }

    #[must_use]
    pub fn assembly_name(role: Role) -> String {
        format!("asm-{role}.s")
    }

    #[must_use]
    pub fn assembly(&self, role: Role) -> PathBuf {
        self.dir.join(Self::assembly_name(role))
    }

    #[must_use]
    pub fn executable_name(role: Role) -> String {
        format!("exe-{role}")
    }

    #[must_use]
    pub fn executable(&self, role: Role) -> PathBuf {
        self.dir.join(Self::executable_name(role))
    }

    /// Log file for one stage (`compile`, `link` or `execute`).
    #[must_use]
    pub fn log(&self, role: Role, stage: &str) -> PathBuf {
        self.dir.join(format!("{role}-{stage}.txt"))
    }
}

/// One source file to test, with its own workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    /// Path the source was discovered under.
    pub source: PathBuf,
    /// Workspace directory name.
    pub id: WorkspaceId,
    /// Workspace file names.
    pub layout: WorkspaceLayout,
}

impl TestCase {
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.as_str()
    }
}

/// Create one workspace per distinct source file and copy the source into it.
///
/// Sources naming the same underlying file as an earlier source are dropped
/// before anything is written. Sources that flatten to an id already in use
/// get a `~N` suffix. The returned cases are sorted by id.
///
/// # Errors
/// Fails if a source cannot be stat'ed or a directory or copy cannot be
/// created.
pub fn prepare(
    output_root: &Path,
    sources: &[PathBuf],
    base_dir: Option<&Path>,
    suffix: &str,
) -> Result<Vec<TestCase>> {
    fs::create_dir_all(output_root).map_err(|e| CorpusError::io(output_root, e))?;

    let mut seen: FxHashMap<FileIdentity, &Path> = FxHashMap::default();
    let mut taken: FxHashSet<WorkspaceId> = FxHashSet::default();
    let mut cases = Vec::with_capacity(sources.len());

    for source in sources {
        let identity =
            FileIdentity::of(source).map_err(|e| CorpusError::unreadable(source, e))?;
        if let Some(first) = seen.get(&identity) {
            debug!(
                source = %source.display(),
                same_as = %first.display(),
                "skipping duplicate source"
            );
            continue;
        }
        seen.insert(identity, source);

        let base = workspace_id(source, base_dir);
        let mut id = base.clone();
        let mut n = 2;
        while !taken.insert(id.clone()) {
            id = base.numbered(n);
            n += 1;
        }

        let dir = output_root.join(id.as_str());
        fs::create_dir(&dir).map_err(|e| CorpusError::io(&dir, e))?;
        let layout = WorkspaceLayout::new(dir, suffix);
        let target = layout.source();
        fs::copy(source, &target).map_err(|e| CorpusError::io(&target, e))?;
        trace!(source = %source.display(), id = %id, "prepared workspace");

        cases.push(TestCase {
            source: source.clone(),
            id,
            layout,
        });
    }

    cases.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(count = cases.len(), "prepared test cases");
    Ok(cases)
}

/// Remove a stale output directory left by a previous run.
///
/// # Errors
/// Fails if the directory exists and cannot be removed.
pub fn reset_output_dir(root: &Path) -> Result<()> {
    if root.exists() {
        debug!(path = %root.display(), "removing stale output directory");
        fs::remove_dir_all(root).map_err(|e| CorpusError::io(root, e))?;
    }
    Ok(())
}

/// Refuse to run from inside the output directory, which is about to be wiped.
///
/// # Errors
/// Returns [`CorpusError::RunFromOutputDir`] when `cwd` lies under `root`.
pub fn ensure_outside_output_dir(cwd: &Path, root: &Path) -> Result<()> {
    let (Ok(cwd), Ok(root)) = (cwd.canonicalize(), root.canonicalize()) else {
        return Ok(());
    };
    if cwd.starts_with(&root) {
        return Err(CorpusError::RunFromOutputDir(root));
    }
    Ok(())
}
