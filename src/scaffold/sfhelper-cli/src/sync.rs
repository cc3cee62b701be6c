//! Filesystem helpers for writing template files into a project.

use anyhow::{Context, Result};
use sfhelper_manifest::{STALE_PATHS, SYNC_PATHS};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Copy every [`SYNC_PATHS`] entry from `template_dir` over the matching
/// path in `project_dir`. Entries the template does not have are skipped;
/// the first copy failure aborts the sync. Returns the synced entries.
pub fn sync_files(template_dir: &Path, project_dir: &Path) -> Result<Vec<&'static str>> {
    let mut synced = Vec::new();
    for &rel in SYNC_PATHS {
        let from = template_dir.join(rel);
        if !from.exists() {
            warn!(path = rel, "template does not provide this file, skipping");
            continue;
        }
        copy_path(&from, &project_dir.join(rel))
            .with_context(|| format!("Failed to sync {rel} from the template"))?;
        debug!(path = rel, "synced from template");
        synced.push(rel);
    }
    Ok(synced)
}

/// Remove the lock file and installed dependencies from `project_dir`.
pub fn remove_stale(project_dir: &Path) -> Result<()> {
    for rel in STALE_PATHS {
        let path = project_dir.join(rel);
        remove_path(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Remove everything inside `dir`, keeping `dir` itself.
pub fn empty_dir(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        remove_path(&entry?.path())?;
    }
    Ok(())
}

/// Remove a file or directory tree. A missing path is not an error.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copy a file, or a directory recursively, overwriting what is at `to`.
/// Directories are merged into an existing destination directory.
pub fn copy_path(from: &Path, to: &Path) -> io::Result<()> {
    if from.is_dir() {
        copy_tree(from, to)
    } else {
        copy_file(from, to)
    }
}

/// Recursively copy the contents of `from` into `to`, skipping `.git`.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let walker = WalkDir::new(from)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn copy_tree_merges_into_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("from");
        let to = tmp.path().join("to");
        write(&from.join("settings.json"), "{\"new\": true}");
        write(&from.join("nested/extensions.json"), "[]");
        write(&from.join(".git/HEAD"), "ref: refs/heads/master");
        write(&to.join("settings.json"), "{\"old\": true}");
        write(&to.join("launch.json"), "{}");

        copy_tree(&from, &to).unwrap();

        assert_eq!(
            fs::read_to_string(to.join("settings.json")).unwrap(),
            "{\"new\": true}"
        );
        assert!(to.join("nested/extensions.json").is_file());
        assert!(to.join("launch.json").is_file(), "unrelated files survive");
        assert!(!to.join(".git").exists());
    }

    #[test]
    fn remove_path_ignores_missing() {
        let tmp = tempfile::tempdir().unwrap();
        remove_path(&tmp.path().join("nope")).unwrap();
    }

    #[test]
    fn empty_dir_keeps_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write(&tmp.path().join("a/b.txt"), "b");
        write(&tmp.path().join("c.txt"), "c");
        empty_dir(tmp.path()).unwrap();
        assert!(tmp.path().is_dir());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
