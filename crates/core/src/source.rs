//! Source provider abstraction for filesystem-independent package loading.
//!
//! The [`SourceProvider`] trait abstracts file I/O so packages can be loaded
//! from disk or from synthetic in-memory module trees in tests.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Trait that abstracts file I/O for the package loader.
pub trait SourceProvider {
    /// Read the source text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;

    /// List the regular files directly inside `dir`, sorted by path.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error>;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Default filesystem-backed source provider.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// In-memory source provider for testing.
///
/// Maps paths to source text strings. Directories exist implicitly as the
/// parents of stored files.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        let files = files
            .into_iter()
            .map(|(path, text)| (Self::normalize_path(&path), text))
            .collect();
        Self { files }
    }

    /// Add (or replace) one file.
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.files
            .insert(Self::normalize_path(path.as_ref()), text.into());
        self
    }

    /// Normalize a path by resolving `.` and `..` components without
    /// touching the filesystem.
    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    components.pop();
                }
                other => components.push(other),
            }
        }
        components.iter().collect()
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found in memory: {}", normalized.display()),
            )
        })
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        let normalized = Self::normalize_path(dir);
        if !self.is_dir(&normalized) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("directory not found in memory: {}", normalized.display()),
            ));
        }
        let mut files: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| p.parent() == Some(normalized.as_path()))
            .cloned()
            .collect();
        files.sort();
        Ok(files)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let normalized = Self::normalize_path(path);
        self.files
            .keys()
            .any(|k| k != &normalized && k.starts_with(&normalized))
    }
}
