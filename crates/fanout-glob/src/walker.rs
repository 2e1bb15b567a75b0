//! Core async file walker, generic over `WalkerFs`.
//!
//! Depth-first traversal with sorted, deterministic output order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::glob_path::GlobPath;
use crate::{WalkerDirEntry, WalkerError, WalkerFs};

/// Types of entries to include in walk results.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryTypes {
    /// Include regular files and symlinks.
    pub files: bool,
    /// Include directories.
    pub dirs: bool,
}

impl EntryTypes {
    /// Include only files.
    pub fn files_only() -> Self {
        Self {
            files: true,
            dirs: false,
        }
    }

    /// Include both files and directories.
    pub fn all() -> Self {
        Self {
            files: true,
            dirs: true,
        }
    }
}

/// Callback invoked when a non-fatal error occurs during walking.
pub type ErrorCallback = Arc<dyn Fn(&Path, &WalkerError) + Send + Sync>;

/// Options for file walking.
#[derive(Clone)]
pub struct WalkOptions {
    /// Types of entries to include.
    pub entry_types: EntryTypes,
    /// Include hidden entries (starting with `.`).
    pub include_hidden: bool,
    /// Optional callback for unreadable directories. `None` skips them
    /// silently.
    pub on_error: Option<ErrorCallback>,
}

impl fmt::Debug for WalkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkOptions")
            .field("entry_types", &self.entry_types)
            .field("include_hidden", &self.include_hidden)
            .field("on_error", &self.on_error.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            entry_types: EntryTypes::files_only(),
            include_hidden: false,
            on_error: None,
        }
    }
}

/// Async file walker, generic over any `WalkerFs` implementation.
///
/// Symlinks are never followed: a symlinked directory is yielded like a
/// file and its contents are not visited.
///
/// # Examples
/// ```ignore
/// use fanout_glob::{FileWalker, GlobPath, WalkOptions};
///
/// let walker = FileWalker::new(&fs, "skps")
///     .with_pattern(GlobPath::new("**/*.skp").unwrap())
///     .with_options(WalkOptions::default());
///
/// let files = walker.collect().await?;
/// ```
pub struct FileWalker<'a, F: WalkerFs> {
    fs: &'a F,
    root: PathBuf,
    pattern: Option<GlobPath>,
    options: WalkOptions,
}

impl<'a, F: WalkerFs> FileWalker<'a, F> {
    /// Create a new file walker starting at the given root.
    pub fn new(fs: &'a F, root: impl AsRef<Path>) -> Self {
        Self {
            fs,
            root: root.as_ref().to_path_buf(),
            pattern: None,
            options: WalkOptions::default(),
        }
    }

    /// Only yield entries whose path relative to the root matches.
    pub fn with_pattern(mut self, pattern: GlobPath) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Set walk options.
    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// Collect all matching paths.
    ///
    /// Unreadable directories are reported through `on_error` and skipped,
    /// so the walk itself does not fail on them.
    pub async fn collect(self) -> Result<Vec<PathBuf>, WalkerError> {
        let mut results = Vec::new();
        let mut stack = vec![(self.root.clone(), 0usize)];

        while let Some((dir, depth)) = stack.pop() {
            let entries = match self.fs.list_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    self.report(&dir, &err);
                    continue;
                }
            };

            let mut entries: Vec<(String, bool, bool)> = entries
                .into_iter()
                .map(|e| (e.name().to_string(), e.is_dir(), e.is_symlink()))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut dirs_to_push = Vec::new();

            for (name, is_dir, is_symlink) in entries {
                if !self.options.include_hidden && name.starts_with('.') {
                    continue;
                }
                let full_path = dir.join(&name);

                if !is_dir || is_symlink {
                    if self.options.entry_types.files && self.matches_pattern(&full_path) {
                        results.push(full_path);
                    }
                    continue;
                }

                if self.should_recurse(depth) {
                    dirs_to_push.push((full_path.clone(), depth + 1));
                }
                if self.options.entry_types.dirs && self.matches_pattern(&full_path) {
                    results.push(full_path);
                }
            }

            // LIFO stack: reverse so the alphabetically-first dir pops first
            dirs_to_push.reverse();
            stack.extend(dirs_to_push);
        }

        Ok(results)
    }

    fn report(&self, path: &Path, err: &WalkerError) {
        if let Some(ref cb) = self.options.on_error {
            cb(path, err);
        }
    }

    fn should_recurse(&self, depth: usize) -> bool {
        match self.pattern.as_ref().and_then(GlobPath::fixed_depth) {
            Some(fixed) => depth + 1 < fixed,
            None => true,
        }
    }

    fn relative_path(&self, full_path: &Path) -> PathBuf {
        full_path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| full_path.to_path_buf())
    }

    fn matches_pattern(&self, path: &Path) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.matches(&self.relative_path(path)),
            None => true,
        }
    }
}
