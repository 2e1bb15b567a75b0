//! The worker binary's catalog of built-in source names.
//!
//! Running the worker binary with no arguments prints one name per line.
//! Job tokens are looked up here before they are tried as filesystem paths.

use std::io;
use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

/// Tokens that select the whole catalog.
pub const CATALOG_SHORTCUTS: &[&str] = &["gm", "gms"];

/// Errors when querying the worker binary for its catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("{binary} exited with {status} while listing its catalog: {stderr}")]
    Listing {
        binary: String,
        status: String,
        stderr: String,
    },
}

/// Ordered list of catalog names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    names: Vec<String>,
}

impl Catalog {
    /// Build from the worker's listing: one name per line, blank lines skipped.
    pub fn parse(listing: &str) -> Self {
        listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Ask `binary` for its catalog.
    #[tracing::instrument(level = "debug", skip_all, fields(binary = %binary.display()))]
    pub async fn resolve(binary: &Path) -> Result<Self, CatalogError> {
        let output = Command::new(binary)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| CatalogError::Launch {
                binary: binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CatalogError::Listing {
                binary: binary.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let catalog = Self::parse(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(names = catalog.len(), "catalog resolved");
        Ok(catalog)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names selected by `token`, in catalog order.
    ///
    /// With `exact`, only a name equal to the token matches. Otherwise any
    /// name containing the token does.
    pub fn lookup<'a>(&'a self, token: &'a str, exact: bool) -> impl Iterator<Item = &'a String> {
        self.names.iter().filter(move |name| {
            if exact {
                name.as_str() == token
            } else {
                name.contains(token)
            }
        })
    }
}

impl FromIterator<String> for Catalog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::parse("aaclip\n  aarectmodes \n\nbigmatrix\nblurrect\n")
    }

    #[test]
    fn parse_trims_and_skips_blank_lines() {
        assert_eq!(catalog().names(), ["aaclip", "aarectmodes", "bigmatrix", "blurrect"]);
        assert!(Catalog::parse("\n \n").is_empty());
    }

    #[test]
    fn substring_lookup() {
        let catalog = catalog();
        let hits: Vec<_> = catalog.lookup("rect", false).collect();
        assert_eq!(hits, ["aarectmodes", "blurrect"]);
        assert_eq!(catalog.lookup("zzz", false).count(), 0);
    }

    #[test]
    fn exact_lookup() {
        let catalog = catalog();
        assert_eq!(catalog.lookup("rect", true).count(), 0);
        let hits: Vec<_> = catalog.lookup("blurrect", true).collect();
        assert_eq!(hits, ["blurrect"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_reads_stdout() {
        let catalog = Catalog::resolve(Path::new("/bin/echo")).await.unwrap();
        // `echo` with no arguments prints a single blank line.
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn resolve_missing_binary() {
        let err = Catalog::resolve(Path::new("/definitely/not/a/worker"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_failing_binary() {
        let err = Catalog::resolve(Path::new("/bin/false")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Listing { .. }));
    }
}
