//! Job parsing: turning a job's tokens into a [`WorkDescriptor`].
//!
//! Each token is classified in order:
//!
//! ```text
//!   -x / --xyz      rejected (dispatcher option, or a worker option in the wrong form)
//!   #...            comment: this token and the rest are ignored
//!   key=value       worker flag
//!   gm / gms        every catalog name
//!   <catalog hit>   catalog names equal to (or containing) the token
//!   <path/glob>     matching files, directories expanded recursively
//! ```
//!
//! A token matching none of these fails the whole job.

use std::fmt;

use fanout_glob::WalkerFs;
use thiserror::Error;

use crate::catalog::{CATALOG_SHORTCUTS, Catalog};
use crate::config::DISPATCHER_OPTIONS;
use crate::sources::{ExpandError, expand_sources};

/// A worker-binary flag from a `key=value` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flag {
    pub name: String,
    pub value: String,
}

impl Flag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse `key=value`. The token must hold exactly one `=` and a
    /// non-empty key; the value may be empty.
    pub fn parse(token: &str) -> Option<Self> {
        let (name, value) = token.split_once('=')?;
        if name.is_empty() || value.contains('=') {
            return None;
        }
        Some(Self::new(name, value))
    }

    /// Command-line switch: `-k` for one-character names, `--key` otherwise.
    pub fn switch(&self) -> String {
        if self.name.chars().count() == 1 {
            format!("-{}", self.name)
        } else {
            format!("--{}", self.name)
        }
    }

    /// The switch followed by the value, as two arguments.
    pub fn to_args(&self) -> [String; 2] {
        [self.switch(), self.value.clone()]
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.switch(), self.value)
    }
}

/// The resolved form of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkDescriptor {
    /// Source names and file paths, in token order.
    pub sources: Vec<String>,
    /// Worker flags, in token order.
    pub flags: Vec<Flag>,
}

impl WorkDescriptor {
    /// True when the job names no sources, which dispatches nothing.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Knobs for token classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Catalog names must match tokens exactly instead of by substring.
    pub exact: bool,
}

/// Why a job was rejected.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("`{token}` is a dispatcher option; pass it before the worker binary, not inside a job")]
    DispatcherOption { token: String },

    #[error("`{token}` is not accepted here; pass worker options as `{suggestion}`")]
    WorkerOption { token: String, suggestion: String },

    #[error("don't understand `{token}`")]
    Unrecognized { token: String },

    #[error("cannot expand `{token}`: {source}")]
    Expand {
        token: String,
        #[source]
        source: ExpandError,
    },
}

/// Resolves job tokens against a catalog and a filesystem.
pub struct JobParser<'a, F: WalkerFs> {
    catalog: &'a Catalog,
    fs: &'a F,
    options: ParseOptions,
}

impl<'a, F: WalkerFs> JobParser<'a, F> {
    pub fn new(catalog: &'a Catalog, fs: &'a F) -> Self {
        Self {
            catalog,
            fs,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse one job. Empty tokens are skipped.
    #[tracing::instrument(level = "trace", skip_all, fields(tokens = tokens.len()))]
    pub async fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<WorkDescriptor, ParseError> {
        let mut work = WorkDescriptor::default();

        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() {
                continue;
            }
            if token.starts_with('-') {
                return Err(reject_option(token));
            }
            if token.starts_with('#') {
                break;
            }
            if let Some(flag) = Flag::parse(token) {
                work.flags.push(flag);
                continue;
            }
            if CATALOG_SHORTCUTS.contains(&token) {
                work.sources.extend(self.catalog.names().iter().cloned());
                continue;
            }

            let before = work.sources.len();
            work.sources
                .extend(self.catalog.lookup(token, self.options.exact).cloned());
            if work.sources.len() > before {
                continue;
            }

            let files = expand_sources(self.fs, token)
                .await
                .map_err(|source| ParseError::Expand {
                    token: token.to_string(),
                    source,
                })?;
            if files.is_empty() {
                return Err(ParseError::Unrecognized {
                    token: token.to_string(),
                });
            }
            work.sources.extend(files);
        }

        tracing::trace!(
            sources = work.sources.len(),
            flags = work.flags.len(),
            "job parsed"
        );
        Ok(work)
    }
}

/// Build the error for a dash-prefixed token.
fn reject_option(token: &str) -> ParseError {
    let body = token.trim_start_matches('-');
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    };

    if DISPATCHER_OPTIONS.contains(&name) {
        return ParseError::DispatcherOption {
            token: token.to_string(),
        };
    }

    let suggestion = match (name.is_empty(), value) {
        (true, _) => "key=value".to_string(),
        (false, Some(value)) if !value.is_empty() => format!("{name}={value}"),
        (false, _) => format!("{name}=<value>"),
    };
    ParseError::WorkerOption {
        token: token.to_string(),
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parse() {
        assert_eq!(Flag::parse("backend=cpu"), Some(Flag::new("backend", "cpu")));
        assert_eq!(Flag::parse("w="), Some(Flag::new("w", "")));
        assert_eq!(Flag::parse("=cpu"), None);
        assert_eq!(Flag::parse("a=b=c"), None);
        assert_eq!(Flag::parse("plain"), None);
    }

    #[test]
    fn flag_switch_width() {
        assert_eq!(Flag::new("b", "cpu").switch(), "-b");
        assert_eq!(Flag::new("backend", "cpu").switch(), "--backend");
        assert_eq!(Flag::new("w", "/tmp/out").to_args(), ["-w", "/tmp/out"]);
        assert_eq!(Flag::new("config", "8888").to_string(), "--config 8888");
    }

    #[test]
    fn dispatcher_options_are_recognized() {
        for token in ["-q", "--quiet", "-r", "--random=false", "--cpuLimit=4", "-g"] {
            assert!(
                matches!(reject_option(token), ParseError::DispatcherOption { .. }),
                "{token}"
            );
        }
    }

    #[test]
    fn worker_options_get_a_suggestion() {
        let ParseError::WorkerOption { suggestion, .. } = reject_option("--backend") else {
            panic!("expected worker option error");
        };
        assert_eq!(suggestion, "backend=<value>");

        let ParseError::WorkerOption { suggestion, .. } = reject_option("--backend=gl") else {
            panic!("expected worker option error");
        };
        assert_eq!(suggestion, "backend=gl");

        let ParseError::WorkerOption { suggestion, .. } = reject_option("--") else {
            panic!("expected worker option error");
        };
        assert_eq!(suggestion, "key=value");
    }

    #[test]
    fn unrecognized_message() {
        let err = ParseError::Unrecognized {
            token: "nope".into(),
        };
        assert_eq!(err.to_string(), "don't understand `nope`");
    }
}
