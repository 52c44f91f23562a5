//! Filesystem helpers that attach the offending path to every error.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{MergeError, Result};

/// Read a UTF-8 file.
pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(MergeError::io("read", path))
}

/// Write a file, creating parent directories as needed.
pub fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(MergeError::io("create directory", parent))?;
    }
    fs::write(path, contents).map_err(MergeError::io("write", path))
}

/// Delete one file.
pub fn remove(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(MergeError::io("remove", path))
}

/// Remove a directory tree if it exists.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(MergeError::io("remove directory", path))?;
    }
    Ok(())
}

/// Recursively remove and recreate a directory.
pub fn reset_dir(path: &Path) -> Result<()> {
    remove_dir_all(path)?;
    fs::create_dir_all(path).map_err(MergeError::io("create directory", path))
}

/// All `.ts` files under `root`, sorted by path.
pub fn ts_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "ts"))
        .collect();
    files.sort();
    files
}

/// `.ts` files directly inside `dir`, sorted by name.
pub fn ts_files_in(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "ts"))
        .collect();
    files.sort();
    files
}

/// Delete directories under `root` (not `root` itself) left empty by moves.
pub fn prune_empty_dirs(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }
    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect();
    for dir in dirs {
        let empty = fs::read_dir(&dir)
            .map_err(MergeError::io("read directory", &dir))?
            .next()
            .is_none();
        if empty {
            fs::remove_dir(&dir).map_err(MergeError::io("remove directory", &dir))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parents_and_lists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("b/models/Z.ts"), "z").unwrap();
        write(&dir.path().join("a/models/A.ts"), "a").unwrap();
        write(&dir.path().join("a/notes.md"), "-").unwrap();

        let files = ts_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a/models/A.ts"));
        assert_eq!(read(&files[1]).unwrap(), "z");
        assert_eq!(ts_files_in(&dir.path().join("a/models")).len(), 1);
    }

    #[test]
    fn test_prune_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("svc/core/OpenAPI.ts");
        write(&file, "x").unwrap();
        remove(&file).unwrap();
        prune_empty_dirs(dir.path()).unwrap();
        assert!(!dir.path().join("svc").exists());
        assert!(dir.path().exists());

        write(&dir.path().join("out/stale.ts"), "x").unwrap();
        reset_dir(&dir.path().join("out")).unwrap();
        assert!(ts_files(&dir.path().join("out")).is_empty());
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = read(Path::new("/nonexistent/apiweave.ts")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/apiweave.ts"));
    }
}
