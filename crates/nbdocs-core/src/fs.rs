//! Filesystem abstraction.
//!
//! Every file effect of the converter and the batch walker goes through
//! [`FileSystem`], so the bookkeeping rules can be tested against
//! [`MemoryFileSystem`] without touching disk. The execution engine and the
//! markup exporter are external processes and use the real filesystem
//! directly.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use walkdir::WalkDir;

/// File operations used by nbdocs.
pub trait FileSystem {
    /// Read a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate a file. The parent directory must exist.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Copy a file over `to`, replacing it if present.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all of its parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Recursively list every file under `root`, sorted by path.
    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory filesystem for tests and dry runs.
///
/// Mirrors the failure modes of a real disk that matter here: writing into a
/// missing directory and removing a missing file are both `NotFound`.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryState {
    fn add_dir_all(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

impl MemoryFileSystem {
    /// Create an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories.
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        self.insert_file(path, contents);
        self
    }

    /// Add a file in place, creating its parent directories.
    pub fn insert_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            state.add_dir_all(parent);
        }
        state
            .files
            .insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    /// All file paths currently stored, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding the lock only happens inside a failing test.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self.lock();
        let bytes = state.files.get(path).ok_or_else(|| not_found(path))?;
        String::from_utf8(bytes.clone())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let parent_exists = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => state.dirs.contains(parent),
            _ => true,
        };
        if !parent_exists {
            return Err(not_found(path));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let contents = {
            let state = self.lock();
            state.files.get(from).cloned().ok_or_else(|| not_found(from))?
        };
        self.write(to, &contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path.display()),
            ));
        }
        state.add_dir_all(path);
        Ok(())
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        if !state.dirs.contains(root) && !state.files.contains_key(root) {
            return Err(not_found(root));
        }
        Ok(state
            .files
            .keys()
            .filter(|path| path.starts_with(root))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_write_requires_parent() {
        let fs = MemoryFileSystem::new();
        let err = fs.write(Path::new("/docs/a.ipynb"), b"{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.create_dir_all(Path::new("/docs")).unwrap();
        fs.write(Path::new("/docs/a.ipynb"), b"{}").unwrap();
        assert_eq!(fs.read_to_string(Path::new("/docs/a.ipynb")).unwrap(), "{}");
    }

    #[test]
    fn test_memory_walk_is_sorted_and_scoped() {
        let fs = MemoryFileSystem::new()
            .with_file("/docs/b.ipynb", "")
            .with_file("/docs/sub/a.ipynb", "")
            .with_file("/docs/a.rst", "")
            .with_file("/other/c.ipynb", "");

        let files = fs.walk_files(Path::new("/docs")).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/docs/a.rst"),
                PathBuf::from("/docs/b.ipynb"),
                PathBuf::from("/docs/sub/a.ipynb"),
            ]
        );
    }

    #[test]
    fn test_memory_remove_missing_file() {
        let fs = MemoryFileSystem::new();
        assert!(fs.remove_file(Path::new("/nope")).is_err());
    }

    #[test]
    fn test_os_walk_lists_nested_files() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let nested = temp.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("top.ipynb"), "{}").unwrap();
        fs::write(nested.join("inner.py"), "").unwrap();

        let files = OsFileSystem.walk_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("nested/inner.py")));
        assert!(files.iter().all(|p| !p.is_dir()));
    }
}
