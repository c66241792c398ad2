//! A temporary working tree with the default loader layout.

use std::fs;
use std::path::{Path, PathBuf};

/// Directories created by [`TestTree::new`], relative to the root.
pub const LAYOUT: [&str; 6] = [
    "data",
    "data/hold",
    "data/processed",
    "specs",
    "specs/hold",
    "logs",
];

/// Temporary directory laid out like a loader installation.
///
/// Removed when dropped.
pub struct TestTree {
    dir: tempfile::TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("dataloader_test_")
            .tempdir()
            .expect("Failed to create temporary test directory");
        for sub in LAYOUT {
            fs::create_dir_all(dir.path().join(sub)).expect("Failed to create layout directory");
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `specs/<key>.csv`.
    pub fn write_spec(&self, key: &str, content: &str) -> PathBuf {
        self.write(&format!("specs/{}.csv", key), content)
    }

    /// Write `data/<name>`.
    pub fn write_data(&self, name: &str, content: &str) -> PathBuf {
        self.write(&format!("data/{}", name), content)
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).is_file()
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("Failed to read test file")
    }

    /// Sorted file names directly inside a directory of the tree.
    pub fn list(&self, relative: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path(relative))
            .expect("Failed to list test directory")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_created() {
        let tree = TestTree::new();
        for sub in LAYOUT {
            assert!(tree.path(sub).is_dir(), "missing {}", sub);
        }
    }

    #[test]
    fn test_write_and_list() {
        let tree = TestTree::new();
        tree.write_data("b_1.txt", "x");
        tree.write_data("a_1.txt", "y");
        tree.write_spec("a", "spec");

        assert_eq!(tree.list("data"), vec!["a_1.txt", "b_1.txt"]);
        assert_eq!(tree.read("specs/a.csv"), "spec");
        assert!(tree.exists("data/a_1.txt"));
    }
}
