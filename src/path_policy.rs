//! Path-policy sandboxing.
//!
//! Every filesystem-touching tool resolves its path through here first.
//! Resolution fails closed: a path that cannot be proven to live under the
//! workspace root or an allowed directory is rejected before any I/O.

use std::path::{Path, PathBuf};

use crate::loop_state::WorkspaceConfig;

/// A reserved directory no tool may read or write, even inside the workspace.
const RESERVED_DIRS: &[&str] = &[".git", ".ssh"];

/// The outcome of resolving a requested path against a workspace's policy.
#[derive(Debug, Clone)]
pub enum PolicyDecision {
    Allowed(PathBuf),
    Blocked(String),
}

impl PolicyDecision {
    #[must_use]
    pub fn into_result(self) -> Result<PathBuf, String> {
        match self {
            Self::Allowed(p) => Ok(p),
            Self::Blocked(reason) => Err(reason),
        }
    }
}

/// Resolves `requested` against `workspace`'s root and allowed directories.
///
/// Relative paths resolve against `workspace.root`. The result is canonicalized
/// where possible (symlinks followed) so escapes via symlink cannot bypass the
/// allowlist; a path that does not yet exist is instead validated component by
/// component against its nearest existing ancestor.
#[must_use]
pub fn resolve(workspace: &WorkspaceConfig, requested: &str) -> PolicyDecision {
    let requested_path = Path::new(requested);
    let absolute = if requested_path.is_absolute() {
        requested_path.to_path_buf()
    } else {
        workspace.root.join(requested_path)
    };

    if contains_reserved_component(&absolute) {
        return PolicyDecision::Blocked(format!("path touches a reserved directory: {requested}"));
    }

    let canonical = match canonicalize_best_effort(&absolute) {
        Ok(path) => path,
        Err(reason) => return PolicyDecision::Blocked(reason),
    };

    let roots = std::iter::once(workspace.root.as_path()).chain(workspace.allowed_dirs.iter().map(PathBuf::as_path));

    for root in roots {
        let canonical_root = match canonicalize_best_effort(root) {
            Ok(r) => r,
            Err(_) => continue,
        };
        if canonical.starts_with(&canonical_root) {
            return PolicyDecision::Allowed(canonical);
        }
    }

    PolicyDecision::Blocked(format!(
        "path '{requested}' resolves outside the workspace and is not in an allowed directory"
    ))
}

fn contains_reserved_component(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        RESERVED_DIRS.iter().any(|reserved| s == *reserved)
    })
}

/// Canonicalizes `path` if it exists; otherwise walks up to the nearest
/// existing ancestor, canonicalizes that, and re-appends the missing suffix.
/// This lets `file_write` validate a not-yet-created file's containing
/// directory without requiring the file to pre-exist.
fn canonicalize_best_effort(path: &Path) -> Result<PathBuf, String> {
    if let Ok(canon) = std::fs::canonicalize(path) {
        return Ok(canon);
    }

    let mut ancestor = path.to_path_buf();
    let mut suffix = Vec::new();
    loop {
        if !ancestor.pop() {
            return Err(format!("no existing ancestor directory for '{}'", path.display()));
        }
        suffix.push(
            path.strip_prefix(&ancestor)
                .ok()
                .and_then(|rest| rest.iter().next())
                .map(std::ffi::OsStr::to_owned)
                .unwrap_or_default(),
        );
        if let Ok(canon) = std::fs::canonicalize(&ancestor) {
            let mut result = canon;
            // The suffix only ever has meaningful entries up to the first
            // missing path component; re-derive the remainder directly.
            if let Ok(rest) = path.strip_prefix(&ancestor) {
                result.push(rest);
            }
            return Ok(result);
        }
    }
}
