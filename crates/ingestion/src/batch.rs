//! Discovery of incoming data files and grouping by format key.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use loader_common::FormatKey;

use crate::error::{GroupingError, IngestionError, Result};

/// Data filenames per format key.
///
/// Keys iterate in lexicographic order and every file list is sorted, which
/// fixes decode and insert order for a run.
pub type Batches = BTreeMap<FormatKey, Vec<String>>;

/// Result of partitioning a set of filenames.
#[derive(Debug, Default)]
pub struct Grouping {
    pub batches: Batches,
    /// Names that could not be assigned to a format and were skipped
    pub rejected: Vec<GroupingError>,
}

impl Grouping {
    pub fn file_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }
}

/// Partition data filenames by format key.
pub fn group_files<I, S>(filenames: I) -> Grouping
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut grouping = Grouping::default();

    for filename in filenames {
        let filename = filename.into();
        match FormatKey::from_data_filename(&filename) {
            Some(key) => grouping.batches.entry(key).or_default().push(filename),
            None => {
                warn!(file = %filename, "Skipping malformed data filename");
                grouping.rejected.push(GroupingError::MalformedName(filename));
            }
        }
    }

    for files in grouping.batches.values_mut() {
        files.sort();
    }
    grouping.rejected.sort_by(|a, b| a.to_string().cmp(&b.to_string()));

    grouping
}

/// List regular files in `dir` whose names end with `extension`, sorted.
///
/// Symlinks are followed; directories and non-UTF-8 names are skipped.
pub async fn discover(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let read_dir_err = |source: std::io::Error| IngestionError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(name = ?raw, "Skipping file with non-UTF-8 name");
                continue;
            }
        };

        if !name.ends_with(extension) {
            continue;
        }

        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_file() => names.push(name),
            Ok(_) => debug!(name = %name, "Skipping non-file entry"),
            Err(e) => warn!(name = %name, error = %e, "Skipping unreadable entry"),
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_files_partitions_by_key() {
        let grouping = group_files([
            "testformat2_2018-08-03.txt",
            "testformat1_2018-08-04.txt",
            "testformat1_2018-08-03.txt",
            "daily_sales_2018-08-03.txt",
        ]);

        let keys: Vec<&str> = grouping.batches.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["daily_sales", "testformat1", "testformat2"]);

        assert_eq!(
            grouping.batches[&FormatKey::new("testformat1")],
            vec!["testformat1_2018-08-03.txt", "testformat1_2018-08-04.txt"]
        );
        assert_eq!(grouping.file_count(), 4);
        assert!(grouping.rejected.is_empty());
    }

    #[test]
    fn test_group_files_every_name_lands_once() {
        let names = vec![
            "a_1.txt", "b_1.txt", "a_2.txt", "bad.txt", "a_b_3.txt", "_x.txt",
        ];
        let grouping = group_files(names.clone());

        let mut seen: Vec<String> = grouping.batches.values().flatten().cloned().collect();
        seen.extend(grouping.rejected.iter().map(|GroupingError::MalformedName(n)| n.clone()));
        seen.sort();

        let mut expected: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);

        // `a_b_3.txt` belongs to format `a_b`, not `a`
        assert_eq!(grouping.batches[&FormatKey::new("a")], vec!["a_1.txt", "a_2.txt"]);
        assert_eq!(grouping.batches[&FormatKey::new("a_b")], vec!["a_b_3.txt"]);
    }

    #[test]
    fn test_malformed_names_are_rejected() {
        let grouping = group_files(["nounderscore.txt", "_2018.txt"]);

        assert!(grouping.batches.is_empty());
        assert_eq!(
            grouping.rejected,
            vec![
                GroupingError::MalformedName("_2018.txt".to_string()),
                GroupingError::MalformedName("nounderscore.txt".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("b_1.txt"), "x").unwrap();
        std::fs::write(dir.join("a_1.txt"), "x").unwrap();
        std::fs::write(dir.join("a_1.csv"), "x").unwrap();
        std::fs::create_dir(dir.join("processed")).unwrap();
        std::fs::create_dir(dir.join("dir_1.txt")).unwrap();

        let names = discover(dir, ".txt").await.unwrap();
        assert_eq!(names, vec!["a_1.txt", "b_1.txt"]);
    }

    #[tokio::test]
    async fn test_discover_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let result = discover(&tmp.path().join("absent"), ".txt").await;
        assert!(matches!(result, Err(IngestionError::ReadDir { .. })));
    }
}
