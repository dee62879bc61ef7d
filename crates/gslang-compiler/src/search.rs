//! Search-root handling and package directory discovery.
//!
//! The driver reads a list of filesystem roots from the `GSLANG_PATH`
//! environment variable (separated with the platform's path-list
//! separator). Each root carries a `src` sub-path: the package `a.b.c` is
//! sought at `<root>/src/a/b/c`. Source files use the `.gs` extension and
//! are enumerated non-recursively, sorted by name for determinism.

use std::path::{Path, PathBuf};

/// Environment variable naming the search roots.
pub const SEARCH_ROOTS_ENV: &str = "GSLANG_PATH";

/// Extension of gslang source files, without the dot.
pub const SOURCE_EXTENSION: &str = "gs";

/// Read the search roots from [`SEARCH_ROOTS_ENV`].
pub fn roots_from_env() -> Vec<PathBuf> {
    match std::env::var_os(SEARCH_ROOTS_ENV) {
        Some(value) => std::env::split_paths(&value).collect(),
        None => Vec::new(),
    }
}

/// Relative location of a dotted package under a search root.
pub fn package_rel_path(package: &str) -> PathBuf {
    let mut path = PathBuf::from("src");
    for segment in package.split('.') {
        path.push(segment);
    }
    path
}

/// Locate a package's directory among the roots.
///
/// `Ok(None)` when no root holds the package; `Err` carries every
/// candidate when more than one does.
pub fn package_dir(roots: &[PathBuf], package: &str) -> Result<Option<PathBuf>, Vec<PathBuf>> {
    let rel = package_rel_path(package);
    let candidates: Vec<PathBuf> = roots
        .iter()
        .map(|root| root.join(&rel))
        .filter(|dir| dir.is_dir())
        .collect();
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(candidates.into_iter().next().unwrap())),
        _ => Err(candidates),
    }
}

/// Enumerate a package directory's source files, sorted by file name.
/// Subdirectories are not descended into.
pub fn list_source_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
