//! URI search path table for `model://` style references
//!
//! Maps a URI prefix to an ordered list of filesystem roots. A URI such as
//! `model://pr2/model.sdf` is resolved by stripping the prefix and joining the
//! remainder onto each root in turn; the first candidate that exists wins.
//!
//! The table is built once (see [`crate::FilterBuilder`]) and is immutable
//! afterwards, so a filter holding it can be shared between threads.

use crate::error::FilterError;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// URI prefix for models in the local model cache
pub const MODEL_URI_PREFIX: &str = "model://";

/// Path below `$HOME` holding the local model cache
pub const HOME_MODEL_CACHE: &str = ".gazebo/models";

/// Environment variable with additional model roots (`:` separated on Unix)
pub const MODEL_PATH_ENV: &str = "GAZEBO_MODEL_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriPathTable {
    entries: Vec<(String, Vec<PathBuf>)>,
}

impl UriPathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the default table from the process environment.
    ///
    /// Registers `$HOME/.gazebo/models` for `model://`, then every entry of
    /// `GAZEBO_MODEL_PATH`. A missing `HOME` is a configuration error.
    pub fn from_env() -> Result<Self, FilterError> {
        Self::from_env_with(|key| std::env::var_os(key))
    }

    /// Same as [`UriPathTable::from_env`] with an injectable variable lookup
    pub fn from_env_with<F>(lookup: F) -> Result<Self, FilterError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let home = lookup("HOME")
            .filter(|h| !h.is_empty())
            .ok_or(FilterError::MissingHome)?;

        let mut table = Self::new();
        table.add(MODEL_URI_PREFIX, Path::new(&home).join(HOME_MODEL_CACHE));

        // split_paths handles ':' on Unix and ';' on Windows
        if let Some(extra) = lookup(MODEL_PATH_ENV) {
            for root in std::env::split_paths(&extra) {
                if !root.as_os_str().is_empty() {
                    table.add(MODEL_URI_PREFIX, root);
                }
            }
        }

        Ok(table)
    }

    /// Register `root` as a search root for `prefix`.
    ///
    /// Registering the same pair twice leaves the table unchanged.
    pub fn add(
        &mut self,
        prefix: &str,
        root: impl Into<PathBuf>,
    ) {
        let root = root.into();
        match self.entries.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, roots)) => {
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
            None => self.entries.push((prefix.to_string(), vec![root])),
        }
    }

    /// Search roots registered for `prefix`, in registration order
    pub fn roots(
        &self,
        prefix: &str,
    ) -> &[PathBuf] {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, roots)| roots.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `uri` starts with one of the registered prefixes
    pub fn matches(
        &self,
        uri: &str,
    ) -> bool {
        self.entries.iter().any(|(p, _)| uri.starts_with(p.as_str()))
    }

    /// Resolve `uri` to an existing path.
    ///
    /// Returns `None` when no registered prefix matches or no candidate exists.
    pub fn resolve(
        &self,
        uri: &str,
    ) -> Option<PathBuf> {
        for (prefix, roots) in &self.entries {
            let Some(rest) = uri.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let rest = rest.trim_start_matches('/');
            for root in roots {
                let candidate = if rest.is_empty() {
                    root.clone()
                } else {
                    root.join(rest)
                };
                if candidate.exists() {
                    log::debug!("Resolved '{}' to '{}'", uri, candidate.display());
                    return Some(candidate);
                }
                log::trace!("'{}' not found at '{}'", uri, candidate.display());
            }
        }
        None
    }
}
