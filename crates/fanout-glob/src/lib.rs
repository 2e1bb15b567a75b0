//! fanout-glob: Glob matching and async file walking.
//!
//! Provides:
//! - **GlobPath**: Path-aware wildcard matching with braces and `**` (globstar)
//! - **FileWalker**: Async recursive directory walker, generic over `WalkerFs`
//!
//! The walker is generic over `WalkerFs`, a minimal read-only filesystem
//! trait, so source expansion can run against the real filesystem or an
//! in-memory one in tests.

mod glob;
mod glob_path;
mod walker;

pub use glob_path::{GlobPath, PatternError};
pub use walker::{EntryTypes, ErrorCallback, FileWalker, WalkOptions};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from filesystem operations within the walker.
#[derive(Debug, Clone, Error)]
pub enum WalkerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("io error: {0}")]
    Io(String),
}

impl WalkerError {
    /// Map an I/O error for `path` onto the walker taxonomy.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let subject = path.display().to_string();
        match err.kind() {
            ErrorKind::NotFound => WalkerError::NotFound(subject),
            ErrorKind::PermissionDenied => WalkerError::PermissionDenied(subject),
            _ => WalkerError::Io(format!("{subject}: {err}")),
        }
    }
}

/// Minimal read-only filesystem abstraction for the walker.
#[async_trait]
pub trait WalkerFs: Send + Sync {
    /// The directory entry type returned by `list_dir`.
    type DirEntry: WalkerDirEntry;

    /// List the entries in a directory.
    async fn list_dir(&self, path: &Path) -> Result<Vec<Self::DirEntry>, WalkerError>;

    /// Check if a path is a directory (following symlinks).
    async fn is_dir(&self, path: &Path) -> bool;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Check if the path itself is a symbolic link (not following it).
    async fn is_symlink(&self, path: &Path) -> bool;
}

/// A single entry returned by `WalkerFs::list_dir`.
pub trait WalkerDirEntry: Send {
    /// The entry name (not the full path).
    fn name(&self) -> &str;

    /// True if this entry is a directory.
    fn is_dir(&self) -> bool;

    /// True if this entry is a symbolic link.
    fn is_symlink(&self) -> bool;
}
