//! Error types for the ingestion crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use loader_common::LoaderError;

use crate::lifecycle::{Area, FileState};

/// Errors that stop discovery, configuration or a data file read.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to list directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read data file {}: {source}", path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

/// A data filename that does not follow `<format>_<suffix>.<ext>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupingError {
    #[error("Malformed data filename (expected <format>_<suffix>): {0}")]
    MalformedName(String),
}

/// Why a spec file could not be turned into a schema.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("No spec file found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Spec file error: incorrect format header in {}: {found:?}", path.display())]
    InvalidHeader { path: PathBuf, found: String },

    #[error("Spec file error: {} line {line}: {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Spec file error: {} defines no columns", path.display())]
    NoColumns { path: PathBuf },

    #[error("Failed to read spec file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolutionError {
    /// Whether the group's data files go to the hold area.
    ///
    /// Read failures leave everything in place for the next run.
    pub fn holds_data(&self) -> bool {
        !matches!(self, ResolutionError::Io { .. })
    }

    /// Whether the spec file itself is broken and goes to the spec hold area.
    pub fn holds_spec(&self) -> bool {
        matches!(
            self,
            ResolutionError::InvalidHeader { .. }
                | ResolutionError::MalformedRow { .. }
                | ResolutionError::NoColumns { .. }
        )
    }
}

/// A file could not be moved to its destination area.
#[derive(Error, Debug)]
pub enum RelocationError {
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot move {file} to {area}: file is {state}")]
    InvalidTransition {
        file: String,
        state: FileState,
        area: Area,
    },
}

/// Why a group was neither loaded nor held.
///
/// Files of a failed group stay where they are and are retried next run.
#[derive(Error, Debug)]
pub enum GroupFailure {
    #[error(transparent)]
    Resolution(ResolutionError),

    #[error(transparent)]
    Read(IngestionError),

    #[error(transparent)]
    Storage(#[from] LoaderError),
}
