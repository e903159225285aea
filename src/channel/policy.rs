// src/channel/policy.rs

//! Destination policy for directory-mode delivery.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::errors::{ExecError, Result};
use crate::fs::FileSystem;

/// A destination that passed the policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub path: PathBuf,
    pub allowed_parent: PathBuf,
}

/// Allow-list of parent directories result files may be written under.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    allowed_parents: Vec<PathBuf>,
    base_dir: Option<PathBuf>,
}

impl PathPolicy {
    pub fn new(allowed_parents: Vec<PathBuf>, base_dir: Option<PathBuf>) -> Self {
        Self {
            allowed_parents,
            base_dir,
        }
    }

    pub fn allowed_parents(&self) -> &[PathBuf] {
        &self.allowed_parents
    }

    /// Canonicalize `requested` and match it against the allow-list.
    ///
    /// A destination outside every allowed parent is a policy error; it is
    /// never redirected somewhere else.
    pub fn resolve(&self, fs: &dyn FileSystem, requested: &Path) -> Result<ResolvedDestination> {
        let absolute = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            match &self.base_dir {
                Some(base) => base.join(requested),
                None => {
                    return Err(ExecError::InvalidInput(format!(
                        "relative result directory {requested:?} with no base directory configured"
                    )));
                }
            }
        };

        let canonical = canonicalize_lenient(fs, &normalize_lexically(&absolute));

        for parent in self.allowed_parents.iter() {
            let lexical_parent = normalize_lexically(parent);
            let canonical_parent = canonicalize_lenient(fs, &lexical_parent);
            if canonical.starts_with(&canonical_parent) || canonical.starts_with(&lexical_parent) {
                debug!(path = ?canonical, allowed_parent = ?canonical_parent, "result directory allowed");
                return Ok(ResolvedDestination {
                    path: canonical,
                    allowed_parent: canonical_parent,
                });
            }
        }

        Err(ExecError::PathPolicyViolation {
            path: canonical,
            allowed: self.allowed_parents.clone(),
        })
    }
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest,
/// so destinations that do not exist yet still get symlinks resolved.
fn canonicalize_lenient(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut missing: Vec<std::ffi::OsString> = Vec::new();

    loop {
        if fs.exists(&existing) {
            if let Ok(mut canonical) = fs.canonicalize(&existing) {
                for part in missing.iter().rev() {
                    canonical.push(part);
                }
                return canonical;
            }
            break;
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name);
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }

    path.to_path_buf()
}
