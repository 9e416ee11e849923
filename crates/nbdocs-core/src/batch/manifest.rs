//! Record of notebooks materialized from scripts.
//!
//! Stored as `.nbdocs-manifest.json` in the directory holding the scripts,
//! so a run started anywhere above that directory sees the same record.
//! Cleanup only removes a notebook next to a script when the manifest says
//! nbdocs generated it, so a hand-written notebook sharing a script's stem
//! is never deleted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::converter::remove;
use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// Manifest file name.
pub const MANIFEST_FILE: &str = ".nbdocs-manifest.json";

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    /// Script path -> notebook path, both relative to the directory.
    derived: BTreeMap<String, String>,
}

/// Script to notebook derivations for one directory.
#[derive(Debug)]
pub struct DerivationManifest {
    root: PathBuf,
    derived: BTreeMap<String, String>,
    dirty: bool,
}

impl DerivationManifest {
    /// Load the manifest describing `script`.
    pub fn for_script(fs: &dyn FileSystem, script: &Path) -> Result<Self> {
        Self::load(fs, script.parent().unwrap_or(Path::new("/")))
    }

    /// Load the manifest in `root`, or start an empty one.
    pub fn load(fs: &dyn FileSystem, root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        let derived = if fs.exists(&path) {
            let content = fs.read_to_string(&path).map_err(|e| Error::Read {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let file: ManifestFile = serde_json::from_str(&content)?;
            file.derived
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            root: root.to_path_buf(),
            derived,
            dirty: false,
        })
    }

    /// Path of the manifest file.
    pub fn path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn key(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Remember that `notebook` was generated from `script`.
    pub fn record(&mut self, script: &Path, notebook: &Path) {
        let (script, notebook) = (self.key(script), self.key(notebook));
        if self.derived.get(&script) != Some(&notebook) {
            self.derived.insert(script, notebook);
            self.dirty = true;
        }
    }

    /// Whether `notebook` was generated from `script`.
    pub fn is_derived(&self, script: &Path, notebook: &Path) -> bool {
        self.derived.get(&self.key(script)) == Some(&self.key(notebook))
    }

    /// Forget a script's derivation.
    pub fn forget(&mut self, script: &Path) {
        if self.derived.remove(&self.key(script)).is_some() {
            self.dirty = true;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }

    /// Persist changes. An emptied manifest removes its file.
    pub fn save(&mut self, fs: &dyn FileSystem) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let path = self.path();
        if self.derived.is_empty() {
            if fs.exists(&path) {
                remove(fs, &path)?;
            }
        } else {
            let file = ManifestFile {
                version: MANIFEST_VERSION,
                derived: self.derived.clone(),
            };
            let json = serde_json::to_string_pretty(&file)?;
            fs.write(&path, json.as_bytes()).map_err(|e| Error::Write {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }

        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_record_save_and_reload() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/docs/gallery")).unwrap();

        let script = Path::new("/docs/gallery/plot_a.py");
        let mut manifest = DerivationManifest::for_script(&fs, script).unwrap();
        assert!(manifest.is_empty());
        manifest.record(script, Path::new("/docs/gallery/plot_a.ipynb"));
        manifest.save(&fs).unwrap();
        assert_eq!(
            manifest.path(),
            PathBuf::from("/docs/gallery/.nbdocs-manifest.json")
        );
        assert!(fs.exists(&manifest.path()));

        let reloaded = DerivationManifest::load(&fs, Path::new("/docs/gallery")).unwrap();
        assert!(reloaded.is_derived(
            Path::new("/docs/gallery/plot_a.py"),
            Path::new("/docs/gallery/plot_a.ipynb")
        ));
        assert!(!reloaded.is_derived(
            Path::new("/docs/gallery/plot_b.py"),
            Path::new("/docs/gallery/plot_b.ipynb")
        ));
    }

    #[test]
    fn test_emptied_manifest_removes_file() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/docs")).unwrap();

        let mut manifest = DerivationManifest::load(&fs, Path::new("/docs")).unwrap();
        manifest.record(Path::new("/docs/a.py"), Path::new("/docs/a.ipynb"));
        manifest.save(&fs).unwrap();

        manifest.forget(Path::new("/docs/a.py"));
        manifest.save(&fs).unwrap();
        assert!(!fs.exists(Path::new("/docs/.nbdocs-manifest.json")));
    }

    #[test]
    fn test_unchanged_manifest_is_not_written() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/docs")).unwrap();

        let mut manifest = DerivationManifest::load(&fs, Path::new("/docs")).unwrap();
        manifest.save(&fs).unwrap();
        assert!(fs.paths().is_empty());
    }
}
