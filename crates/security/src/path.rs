//! Path sandboxing: model-supplied paths may only reach files under one
//! workspace root.
//!
//! Paths are taken relative to the root. Absolute paths, `..` components
//! and symlinks escaping the root are rejected, as is anything under a
//! forbidden prefix (e.g. `.git`, `~/.ssh`).

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path must not be empty")]
    Empty,

    #[error("Path '{path}' must be relative to the workspace root")]
    Absolute { path: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' resolves outside the workspace root")]
    OutsideRoot { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// A workspace root plus the prefixes under it that stay off limits.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    forbidden_paths: Vec<String>,
}

impl Sandbox {
    /// Canonicalizes `root`; it must exist.
    pub fn new(
        root: impl AsRef<Path>,
        forbidden_paths: Vec<String>,
    ) -> Result<Self, PathValidationError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            root,
            forbidden_paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path to an absolute one inside the root.
    ///
    /// The target need not exist; if it does, symlinks are resolved before
    /// the containment check.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PathValidationError::Empty);
        }

        let normalized = trimmed.replace('\\', "/");
        let relative = Path::new(&normalized);

        let mut clean = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(PathValidationError::PathTraversal { path: path.into() });
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathValidationError::Absolute { path: path.into() });
                }
            }
        }

        let joined = self.root.join(&clean);
        let resolved = if joined.exists() {
            joined
                .canonicalize()
                .map_err(|e| PathValidationError::CanonicalizeFailed {
                    path: path.into(),
                    reason: e.to_string(),
                })?
        } else {
            joined
        };

        if !resolved.starts_with(&self.root) {
            return Err(PathValidationError::OutsideRoot { path: path.into() });
        }

        self.check_forbidden(path, &resolved)?;
        Ok(resolved)
    }

    fn check_forbidden(&self, path: &str, resolved: &Path) -> Result<(), PathValidationError> {
        let relative = resolved.strip_prefix(&self.root).unwrap_or(resolved);
        let resolved_lower = normalize(resolved);
        let relative_lower = normalize(relative);

        for pattern in &self.forbidden_paths {
            let expanded = expand_tilde(pattern);
            let pattern_lower = normalize(Path::new(&expanded));
            let hit = if Path::new(&expanded).is_absolute() {
                is_prefix(&pattern_lower, &resolved_lower)
            } else {
                is_prefix(&pattern_lower, &relative_lower)
            };
            if hit {
                return Err(PathValidationError::ForbiddenPath {
                    path: path.into(),
                    pattern: pattern.clone(),
                });
            }
        }
        Ok(())
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_lowercase()
}

/// Component-aware prefix test: `.git` matches `.git/config` but not `.github`.
fn is_prefix(prefix: &str, path: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = home_dir()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

fn home_dir() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok()
    }
}
