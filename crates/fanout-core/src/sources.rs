//! Filesystem source expansion.
//!
//! A token that is not a catalog name is treated as a path pattern. Each
//! match that is a directory expands to every file beneath it. A symlink is
//! never followed, whether the token names it directly or a walk finds it:
//! it is passed on as a source itself. Symlinks in the static prefix of a
//! pattern (`linked/*.skp`) still resolve as ordinary path components.
//! Hidden entries are included. The result is deduplicated in first-seen
//! order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fanout_glob::{
    EntryTypes, ErrorCallback, FileWalker, GlobPath, PatternError, WalkOptions, WalkerError,
    WalkerFs,
};
use thiserror::Error;

/// Errors while expanding a path pattern.
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("{path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: WalkerError,
    },
}

/// Expand `pattern` into source file paths.
///
/// An empty result means nothing on disk matched.
pub async fn expand_sources<F: WalkerFs>(fs: &F, pattern: &str) -> Result<Vec<String>, ExpandError> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for path in match_paths(fs, pattern).await? {
        let files = if fs.is_dir(&path).await && !fs.is_symlink(&path).await {
            walk(fs, &path, None, EntryTypes::files_only()).await?
        } else {
            vec![path]
        };
        for file in files {
            let file = file.to_string_lossy().into_owned();
            if seen.insert(file.clone()) {
                sources.push(file);
            }
        }
    }

    Ok(sources)
}

/// Paths (files or directories) matched by `pattern`, in sorted walk order.
async fn match_paths<F: WalkerFs>(fs: &F, pattern: &str) -> Result<Vec<PathBuf>, ExpandError> {
    let glob = GlobPath::new(pattern)?;
    let (prefix, rest) = glob.split_static_prefix();

    let Some(rest) = rest else {
        let path = PathBuf::from(pattern);
        return Ok(if fs.exists(&path).await {
            vec![path]
        } else {
            Vec::new()
        });
    };

    let implicit_root = prefix.as_os_str().is_empty();
    let root = if implicit_root {
        PathBuf::from(".")
    } else {
        prefix
    };
    if !fs.is_dir(&root).await {
        return Ok(Vec::new());
    }

    let matched = walk(fs, &root, Some(rest), EntryTypes::all()).await?;
    if !implicit_root {
        return Ok(matched);
    }
    Ok(matched
        .into_iter()
        .map(|path| match path.strip_prefix(".") {
            Ok(stripped) => stripped.to_path_buf(),
            Err(_) => path,
        })
        .collect())
}

/// Walk `root`, failing on the first unreadable directory.
async fn walk<F: WalkerFs>(
    fs: &F,
    root: &Path,
    pattern: Option<GlobPath>,
    entry_types: EntryTypes,
) -> Result<Vec<PathBuf>, ExpandError> {
    let failures: Arc<Mutex<Vec<(PathBuf, WalkerError)>>> = Arc::default();
    let sink = Arc::clone(&failures);
    let on_error: ErrorCallback = Arc::new(move |path: &Path, err: &WalkerError| {
        if let Ok(mut failures) = sink.lock() {
            failures.push((path.to_path_buf(), err.clone()));
        }
    });

    let options = WalkOptions {
        entry_types,
        include_hidden: true,
        on_error: Some(on_error),
        ..WalkOptions::default()
    };

    let mut walker = FileWalker::new(fs, root).with_options(options);
    if let Some(pattern) = pattern {
        walker = walker.with_pattern(pattern);
    }
    let found = walker.collect().await.map_err(|source| ExpandError::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    let first_failure = failures
        .lock()
        .ok()
        .and_then(|mut f| (!f.is_empty()).then(|| f.remove(0)));
    if let Some((path, source)) = first_failure {
        return Err(ExpandError::Walk { path, source });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_fs::LocalFs;

    fn tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("skps/top25")).unwrap();
        std::fs::create_dir_all(root.join("images")).unwrap();
        for file in [
            "skps/desk.skp",
            "skps/top25/amazon.skp",
            "skps/.hidden.skp",
            "images/mandrill.png",
            "images/notes.txt",
            "a.skp",
        ] {
            std::fs::write(root.join(file), b"").unwrap();
        }
        tmp
    }

    #[tokio::test]
    async fn literal_file() {
        let tmp = tree();
        let fs = LocalFs::rooted(tmp.path());
        assert_eq!(expand_sources(&fs, "a.skp").await.unwrap(), ["a.skp"]);
        assert!(expand_sources(&fs, "b.skp").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn directory_expands_recursively_with_hidden_files() {
        let tmp = tree();
        let fs = LocalFs::rooted(tmp.path());
        let found = expand_sources(&fs, "skps").await.unwrap();
        assert_eq!(found, ["skps/.hidden.skp", "skps/desk.skp", "skps/top25/amazon.skp"]);
    }

    #[tokio::test]
    async fn wildcard_at_current_directory() {
        let tmp = tree();
        let fs = LocalFs::rooted(tmp.path());
        assert_eq!(expand_sources(&fs, "*.skp").await.unwrap(), ["a.skp"]);
    }

    #[tokio::test]
    async fn wildcard_under_prefix() {
        let tmp = tree();
        let fs = LocalFs::rooted(tmp.path());
        let found = expand_sources(&fs, "images/*.png").await.unwrap();
        assert_eq!(found, ["images/mandrill.png"]);
        assert!(expand_sources(&fs, "nowhere/*.png").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn matched_directories_expand_and_dedupe() {
        let tmp = tree();
        let fs = LocalFs::rooted(tmp.path());
        // `skps/*` matches the nested directory and the files beside it.
        let found = expand_sources(&fs, "skps/*").await.unwrap();
        assert_eq!(found, ["skps/.hidden.skp", "skps/desk.skp", "skps/top25/amazon.skp"]);

        let found = expand_sources(&fs, "**/*.skp").await.unwrap();
        assert_eq!(
            found,
            ["a.skp", "skps/.hidden.skp", "skps/desk.skp", "skps/top25/amazon.skp"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directories_are_not_followed() {
        let tmp = tree();
        std::os::unix::fs::symlink(tmp.path().join("images"), tmp.path().join("skps/pics"))
            .unwrap();
        let fs = LocalFs::rooted(tmp.path());
        let found = expand_sources(&fs, "skps").await.unwrap();
        assert!(found.contains(&"skps/pics".to_string()));
        assert!(!found.iter().any(|f| f.ends_with("mandrill.png")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directory_named_directly_is_not_followed() {
        let tmp = tree();
        std::os::unix::fs::symlink(tmp.path().join("images"), tmp.path().join("skps/pics"))
            .unwrap();
        let fs = LocalFs::rooted(tmp.path());

        assert_eq!(expand_sources(&fs, "skps/pics").await.unwrap(), ["skps/pics"]);

        let found = expand_sources(&fs, "skps/*").await.unwrap();
        assert!(found.contains(&"skps/pics".to_string()));
        assert!(!found.iter().any(|f| f.ends_with("mandrill.png")));
    }
}
