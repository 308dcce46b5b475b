//! Test harness for consistent setup/teardown.
//!
//! The `TestHarness` provides a temporary directory for test files and
//! prints the tree it left behind when a test panics.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Test harness providing temp directories and cleanup.
pub struct TestHarness {
    /// Test name for identification in failure output.
    name: String,
    temp_dir: TempDir,
}

impl TestHarness {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self { name, temp_dir }
    }

    /// Get the path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get a path within the temporary directory.
    pub fn temp_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.temp_dir.path().join(path)
    }

    /// Create a file in the temp directory with the given content.
    ///
    /// Returns the full path to the created file.
    pub fn create_file(&self, name: impl AsRef<Path>, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.temp_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to create test file");
        path
    }

    /// Create a directory in the temp directory.
    pub fn create_dir(&self, name: impl AsRef<Path>) -> PathBuf {
        let path = self.temp_path(name);
        std::fs::create_dir_all(&path).expect("Failed to create test directory");
        path
    }

    /// Read a file from the temp directory.
    pub fn read_file(&self, name: impl AsRef<Path>) -> String {
        std::fs::read_to_string(self.temp_path(name)).expect("Failed to read test file")
    }

    pub fn file_exists(&self, name: impl AsRef<Path>) -> bool {
        self.temp_path(name).exists()
    }

    /// Files under `dir` (relative to the temp directory) with extension `ext`, sorted.
    pub fn files_with_extension(&self, dir: impl AsRef<Path>, ext: &str) -> Vec<PathBuf> {
        let root = self.temp_path(dir);
        if !root.exists() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|x| x == ext))
            .map(walkdir::DirEntry::into_path)
            .collect();
        files.sort();
        files
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn dump_tree(&self) {
        eprintln!("--- {} temp tree ---", self.name);
        for entry in WalkDir::new(self.temp_dir())
            .sort_by_file_name()
            .into_iter()
            .flatten()
        {
            eprintln!("  {}", entry.path().display());
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.dump_tree();
        }
    }
}
