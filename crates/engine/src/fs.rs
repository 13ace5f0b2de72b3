// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem abstraction used by file-touching actions and checks.
//!
//! Production code uses [`OsFs`]; tests inject [`MemFs`] so playbooks can be
//! exercised without touching the host disk.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The filesystem surface the engine depends on.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Create-or-truncate write.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;
    /// Remove a single file.
    fn remove(&self, path: &Path) -> io::Result<()>;
    /// Remove a file or directory tree.
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Copy a file, or a directory tree when `from` is a directory.
    fn copy_all(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Operating-system backed filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy_all(&self, from: &Path, to: &Path) -> io::Result<()> {
        if from.is_dir() {
            std::fs::create_dir_all(to)?;
            for entry in std::fs::read_dir(from)? {
                let entry = entry?;
                self.copy_all(&entry.path(), &to.join(entry.file_name()))?;
            }
            Ok(())
        } else {
            std::fs::copy(from, to).map(|_| ())
        }
    }
}

/// In-memory filesystem for hermetic tests.
///
/// Files are a path-to-bytes map; directories exist implicitly as prefixes
/// of stored files plus anything created via `mkdir_all`.
#[derive(Debug, Default)]
pub struct MemFs {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<Vec<PathBuf>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display()))
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dirs(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.dirs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn has_child(&self, path: &Path) -> bool {
        self.files().keys().any(|p| p.starts_with(path) && p != path)
    }
}

impl FileSystem for MemFs {
    fn exists(&self, path: &Path) -> bool {
        if self.files().contains_key(path) {
            return true;
        }
        if self.dirs().iter().any(|d| d == path) {
            return true;
        }
        self.has_child(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        if self.dirs().iter().any(|d| d == path) {
            return true;
        }
        self.has_child(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files()
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.files().insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        self.dirs().push(path.to_path_buf());
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.files()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(path))
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let mut files = self.files();
        let doomed: Vec<PathBuf> = files
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        if doomed.is_empty() && !self.dirs().iter().any(|d| d.starts_with(path)) {
            return Err(Self::not_found(path));
        }
        for p in doomed {
            files.remove(&p);
        }
        self.dirs().retain(|d| !d.starts_with(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut files = self.files();
        let contents = files.remove(from).ok_or_else(|| Self::not_found(from))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn copy_all(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut files = self.files();
        if let Some(contents) = files.get(from).cloned() {
            files.insert(to.to_path_buf(), contents);
            return Ok(());
        }
        let entries: Vec<(PathBuf, Vec<u8>)> = files
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        if entries.is_empty() {
            return Err(Self::not_found(from));
        }
        for (p, c) in entries {
            if let Ok(rel) = p.strip_prefix(from) {
                files.insert(to.join(rel), c);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
