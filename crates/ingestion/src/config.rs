//! Loader configuration: directory layout, file extensions and load behavior.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use loader_common::FormatKey;

use crate::decoder::MismatchPolicy;
use crate::error::{IngestionError, Result};

/// Directory layout and behavior for one loader installation.
///
/// Defaults follow the classic layout: data files named like
/// `data/testformat1_2018-08-03.txt`, spec files like `specs/testformat1.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Incoming data files
    pub data_dir: PathBuf,
    /// Data files of groups without a usable spec
    pub data_hold_dir: PathBuf,
    /// Successfully loaded data files
    pub data_processed_dir: PathBuf,
    /// Extension of data files, including the dot
    pub data_extension: String,
    /// Spec files, one per format
    pub spec_dir: PathBuf,
    /// Spec files with a broken layout
    pub spec_hold_dir: PathBuf,
    /// Extension of spec files, including the dot
    pub spec_extension: String,
    /// Create the destination table on first load of a format
    pub create_table: bool,
    /// Number of format groups processed at the same time
    pub parallel_groups: usize,
    /// What to do with lines whose length differs from the schema
    pub on_length_mismatch: MismatchPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            data_hold_dir: PathBuf::from("data/hold"),
            data_processed_dir: PathBuf::from("data/processed"),
            data_extension: ".txt".to_string(),
            spec_dir: PathBuf::from("specs"),
            spec_hold_dir: PathBuf::from("specs/hold"),
            spec_extension: ".csv".to_string(),
            create_table: true,
            parallel_groups: 1,
            on_length_mismatch: MismatchPolicy::Keep,
        }
    }
}

impl LoaderConfig {
    /// Default layout rooted at `root` instead of the working directory.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self::default().rooted_at(root)
    }

    /// Prefix every relative directory with `root`.
    pub fn rooted_at(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        for dir in [
            &mut self.data_dir,
            &mut self.data_hold_dir,
            &mut self.data_processed_dir,
            &mut self.spec_dir,
            &mut self.spec_hold_dir,
        ] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        self
    }

    /// Check values that would otherwise fail in confusing ways mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.parallel_groups == 0 {
            return Err(IngestionError::InvalidConfig(
                "parallel_groups must be at least 1".to_string(),
            ));
        }

        for (name, ext) in [
            ("data_extension", &self.data_extension),
            ("spec_extension", &self.spec_extension),
        ] {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(IngestionError::InvalidConfig(format!(
                    "{} must start with '.', got {:?}",
                    name, ext
                )));
            }
        }

        if self.data_dir == self.data_processed_dir || self.data_dir == self.data_hold_dir {
            return Err(IngestionError::InvalidConfig(
                "processed and hold areas must differ from the data directory".to_string(),
            ));
        }

        Ok(())
    }

    /// Create every directory of the layout.
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.data_dir,
            &self.data_hold_dir,
            &self.data_processed_dir,
            &self.spec_dir,
            &self.spec_hold_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| IngestionError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Filename of the spec for a format, e.g. `testformat1.csv`.
    pub fn spec_filename(&self, key: &FormatKey) -> String {
        format!("{}{}", key, self.spec_extension)
    }

    /// Full path of a data file in the incoming area.
    pub fn data_path(&self, filename: &str) -> PathBuf {
        self.data_dir.join(filename)
    }
}
