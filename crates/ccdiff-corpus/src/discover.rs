//! Expands command-line paths into a sorted list of source files.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::{CorpusError, DEFAULT_SUFFIX, Result};

/// Options controlling source discovery.
#[derive(Clone, Debug)]
pub struct DiscoverOptions {
    /// Source suffix without the dot (e.g. "c").
    pub suffix: String,
    /// Harness output directory; sources inside it are rejected.
    pub output_dir: Option<PathBuf>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            output_dir: None,
        }
    }
}

impl DiscoverOptions {
    /// Set the source suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the output directory to guard against.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Collapse `.` components and `name/..` pairs without touching the filesystem.
///
/// `..` at the start of a relative path is kept; `..` directly under the root
/// is dropped, as the root is its own parent.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.extension().is_some_and(|ext| ext == suffix)
}

/// Collect source files from files and directory trees.
///
/// The result is sorted bytewise and free of duplicate paths. Every returned
/// path has been opened for reading once. A directory that resolves to the
/// output directory is not descended into.
///
/// # Errors
/// Fails on the first file with the wrong suffix, the first unreadable path,
/// a source inside the output directory, or an empty result.
pub fn collect(inputs: &[PathBuf], options: &DiscoverOptions) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    // The output tree of an earlier run is skipped rather than rejected.
    let skip = options
        .output_dir
        .as_ref()
        .and_then(|dir| dir.canonicalize().ok());

    for input in inputs {
        let path = normalize_lexically(input);
        let metadata = fs::metadata(&path).map_err(|e| CorpusError::unreadable(&path, e))?;

        if metadata.is_file() {
            if !has_suffix(&path, &options.suffix) {
                return Err(CorpusError::BadSuffix {
                    path,
                    expected: options.suffix.clone(),
                });
            }
            found.push(path);
        } else if metadata.is_dir() {
            walk(&path, &options.suffix, skip.as_deref(), &mut found)?;
        } else {
            return Err(CorpusError::unreadable(
                &path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a file or directory"),
            ));
        }
    }

    found.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    found.dedup();
    debug!(count = found.len(), "collected source files");

    if found.is_empty() {
        let joined = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        return Err(CorpusError::NoTestCases(joined));
    }

    for path in &found {
        fs::File::open(path).map_err(|e| CorpusError::unreadable(path, e))?;
    }

    if let Some(output_dir) = &options.output_dir {
        reject_inside(&found, output_dir)?;
    }

    Ok(found)
}

fn walk(dir: &Path, suffix: &str, skip: Option<&Path>, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| CorpusError::unreadable(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| CorpusError::unreadable(dir, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| CorpusError::unreadable(&path, e))?;

        if file_type.is_dir() {
            if skip.is_some_and(|skip| path.canonicalize().is_ok_and(|real| real == skip)) {
                debug!(dir = %path.display(), "skipping output directory");
                continue;
            }
            walk(&path, suffix, skip, found)?;
            continue;
        }

        // Symlinks count when they point at a file; linked directories are not followed.
        let is_file = file_type.is_file() || (file_type.is_symlink() && path.is_file());
        if is_file && has_suffix(&path, suffix) {
            trace!(path = %path.display(), "found source");
            found.push(path);
        }
    }
    Ok(())
}

fn reject_inside(found: &[PathBuf], output_dir: &Path) -> Result<()> {
    let Ok(output_dir) = output_dir.canonicalize() else {
        // Nothing can live inside a directory that does not exist yet.
        return Ok(());
    };
    for path in found {
        let real = path
            .canonicalize()
            .map_err(|e| CorpusError::unreadable(path, e))?;
        if real.starts_with(&output_dir) {
            return Err(CorpusError::InsideOutputDir(path.clone()));
        }
    }
    Ok(())
}
