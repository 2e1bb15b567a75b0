//! Real filesystem adapter for the source walker.
//!
//! Paths handed to the walker stay exactly as the user wrote them; a
//! [`LocalFs`] optionally resolves relative ones against a base directory
//! for I/O only, so results never gain an absolute prefix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fanout_glob::{WalkerDirEntry, WalkerError, WalkerFs};
use tokio::fs;

/// A directory entry read from disk.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

impl WalkerDirEntry for LocalEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn is_symlink(&self) -> bool {
        self.is_symlink
    }
}

/// [`WalkerFs`] over the local filesystem via `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    base: Option<PathBuf>,
}

impl LocalFs {
    /// Relative paths resolve against the process working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative paths resolve against `base`.
    pub fn rooted(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl WalkerFs for LocalFs {
    type DirEntry = LocalEntry;

    async fn list_dir(&self, path: &Path) -> Result<Vec<LocalEntry>, WalkerError> {
        let real = self.resolve(path);
        let mut dir = fs::read_dir(&real)
            .await
            .map_err(|e| WalkerError::from_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| WalkerError::from_io(path, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| WalkerError::from_io(&entry.path(), e))?;
            let is_symlink = file_type.is_symlink();
            let is_dir = if is_symlink {
                fs::metadata(entry.path())
                    .await
                    .is_ok_and(|meta| meta.is_dir())
            } else {
                file_type.is_dir()
            };
            entries.push(LocalEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
                is_symlink,
            });
        }
        Ok(entries)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(self.resolve(path))
            .await
            .is_ok_and(|meta| meta.is_dir())
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(self.resolve(path)).await.is_ok()
    }

    async fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(self.resolve(path))
            .await
            .is_ok_and(|meta| meta.file_type().is_symlink())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_glob::{FileWalker, GlobPath, WalkOptions};

    #[tokio::test]
    async fn lists_relative_to_base() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("skps")).unwrap();
        std::fs::write(tmp.path().join("skps/desk.skp"), b"").unwrap();
        std::fs::write(tmp.path().join("top.skp"), b"").unwrap();

        let fs = LocalFs::rooted(tmp.path());
        assert!(fs.is_dir(Path::new("skps")).await);
        assert!(fs.exists(Path::new("top.skp")).await);
        assert!(!fs.exists(Path::new("missing.skp")).await);

        let mut names: Vec<String> = fs
            .list_dir(Path::new("."))
            .await
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["skps", "top.skp"]);
    }

    #[tokio::test]
    async fn walker_paths_stay_relative() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("skps/nested")).unwrap();
        std::fs::write(tmp.path().join("skps/nested/a.skp"), b"").unwrap();

        let fs = LocalFs::rooted(tmp.path());
        let found = FileWalker::new(&fs, "skps")
            .with_pattern(GlobPath::new("**/*.skp").unwrap())
            .with_options(WalkOptions::default())
            .collect()
            .await
            .unwrap();
        assert_eq!(found, vec![PathBuf::from("skps/nested/a.skp")]);
    }

    #[tokio::test]
    async fn missing_directory_maps_to_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFs::rooted(tmp.path());
        let err = fs.list_dir(Path::new("nope")).await.unwrap_err();
        assert!(matches!(err, WalkerError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directory_is_flagged() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();

        let fs = LocalFs::rooted(tmp.path());
        let entries = fs.list_dir(Path::new(".")).await.unwrap();
        let link = entries.iter().find(|e| e.name() == "link").unwrap();
        assert!(link.is_symlink());
        assert!(link.is_dir());

        assert!(fs.is_symlink(Path::new("link")).await);
        assert!(fs.is_dir(Path::new("link")).await);
        assert!(!fs.is_symlink(Path::new("real")).await);
    }
}
