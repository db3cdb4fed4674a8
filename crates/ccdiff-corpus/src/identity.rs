use std::path::{Path, PathBuf};

/// Filesystem identity of a file, independent of the path used to reach it.
///
/// Two paths with equal identities name the same underlying file, whether
/// they differ by symlinks, `..` segments or relative/absolute spelling.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Device and inode numbers.
    Inode { dev: u64, ino: u64 },
    /// Fully resolved path, for platforms without inode numbers.
    Canonical(PathBuf),
}

impl FileIdentity {
    /// Identify the file at `path`, following symlinks.
    ///
    /// # Errors
    /// Returns an error if the file cannot be stat'ed.
    #[cfg(unix)]
    pub fn of(path: &Path) -> std::io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(path)?;
        Ok(Self::Inode {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Identify the file at `path`, following symlinks.
    ///
    /// # Errors
    /// Returns an error if the path cannot be resolved.
    #[cfg(not(unix))]
    pub fn of(path: &Path) -> std::io::Result<Self> {
        path.canonicalize().map(Self::Canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_file_through_different_spellings() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("d")).unwrap();
        let file = tmp.path().join("d/f.c");
        std::fs::write(&file, "x").unwrap();

        let a = FileIdentity::of(&file).unwrap();
        let b = FileIdentity::of(&tmp.path().join("d/../d/f.c")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_files_differ() {
        let tmp = tempfile::tempdir().unwrap();
        let one = tmp.path().join("one.c");
        let two = tmp.path().join("two.c");
        std::fs::write(&one, "x").unwrap();
        std::fs::write(&two, "x").unwrap();

        assert_ne!(
            FileIdentity::of(&one).unwrap(),
            FileIdentity::of(&two).unwrap()
        );
    }
}
