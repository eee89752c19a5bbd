//! # vehicle_model: vehicle signal model lifecycle
//!
//! - `download_vspec` resolves the app's VSS specification (and unit files) to
//!   local paths and publishes them through the CLI cache.
//! - `generate_model` runs the model generator on the cached specification.
//! - `install_deps` installs the generator's Python requirements.

pub mod download_vspec;
pub mod generate_model;
pub mod install_deps;

use std::path::{Component, Path, PathBuf};

/// Lexically normalises `path`: drops `.` components and folds `..` into
/// the preceding component. Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `path` if absolute, otherwise `path` relative to `workspace_dir`.
pub fn resolve_in_workspace(workspace_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&workspace_dir.join(path))
    }
}
