//! Disposition of data and spec files.
//!
//! Files start pending in their source directory. A data file is `Loaded`
//! once its rows are committed and `Processed` once moved out of the incoming
//! area; a file that cannot be loaded is `Held` for review. Relocated files
//! never move back.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::error::RelocationError;

/// Destination areas a file can be moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    DataProcessed,
    DataHold,
    SpecHold,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Area::DataProcessed => "data processed area",
            Area::DataHold => "data hold area",
            Area::SpecHold => "spec hold area",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    Pending,
    Loaded,
    Processed,
    Held,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileState::Pending => "pending",
            FileState::Loaded => "loaded",
            FileState::Processed => "processed",
            FileState::Held => "held",
        };
        f.write_str(name)
    }
}

/// Something that happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    /// Its rows were committed to storage
    Persisted,
    /// It was moved to an area
    Relocated(Area),
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEvent::Persisted => f.write_str("persisted"),
            FileEvent::Relocated(area) => write!(f, "moved to {}", area),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a {state} file cannot be {event}")]
pub struct LifecycleError {
    pub state: FileState,
    pub event: FileEvent,
}

impl FileState {
    /// The state after `event`, or an error if the event is not allowed.
    pub fn apply(self, event: FileEvent) -> Result<FileState, LifecycleError> {
        use FileEvent::*;
        use FileState::*;

        match (self, event) {
            (Pending, Persisted) => Ok(Loaded),
            (Loaded, Relocated(Area::DataProcessed)) => Ok(Processed),
            (Pending, Relocated(Area::DataHold | Area::SpecHold)) => Ok(Held),
            (state, event) => Err(LifecycleError { state, event }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Processed | FileState::Held)
    }
}

/// A file name together with its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub name: String,
    pub state: FileState,
}

impl TrackedFile {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: FileState::Pending,
        }
    }

    /// Record that the file's rows were committed.
    pub fn mark_persisted(&mut self) -> Result<(), LifecycleError> {
        self.state = self.state.apply(FileEvent::Persisted)?;
        Ok(())
    }
}

/// A completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub file: String,
    pub area: Area,
    pub destination: PathBuf,
    /// A file with the same name already existed and was overwritten
    pub replaced: bool,
}

/// Moves files between the incoming directories and their destination areas.
#[derive(Debug, Clone)]
pub struct FileLifecycle {
    data_dir: PathBuf,
    spec_dir: PathBuf,
    data_processed_dir: PathBuf,
    data_hold_dir: PathBuf,
    spec_hold_dir: PathBuf,
}

impl FileLifecycle {
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            spec_dir: config.spec_dir.clone(),
            data_processed_dir: config.data_processed_dir.clone(),
            data_hold_dir: config.data_hold_dir.clone(),
            spec_hold_dir: config.spec_hold_dir.clone(),
        }
    }

    fn source_dir(&self, area: Area) -> &PathBuf {
        match area {
            Area::SpecHold => &self.spec_dir,
            Area::DataProcessed | Area::DataHold => &self.data_dir,
        }
    }

    pub fn area_dir(&self, area: Area) -> &PathBuf {
        match area {
            Area::DataProcessed => &self.data_processed_dir,
            Area::DataHold => &self.data_hold_dir,
            Area::SpecHold => &self.spec_hold_dir,
        }
    }

    /// Move a file into `area` and advance its state.
    ///
    /// The rename is atomic within one filesystem. An existing file of the
    /// same name in the destination is overwritten and reported through
    /// [`Relocation::replaced`]. On error the file and its state are left
    /// unchanged.
    pub async fn relocate(
        &self,
        file: &mut TrackedFile,
        area: Area,
    ) -> Result<Relocation, RelocationError> {
        let next = file
            .state
            .apply(FileEvent::Relocated(area))
            .map_err(|e| RelocationError::InvalidTransition {
                file: file.name.clone(),
                state: e.state,
                area,
            })?;

        let from = self.source_dir(area).join(&file.name);
        let to = self.area_dir(area).join(&file.name);

        let replaced = match tokio::fs::try_exists(&to).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(destination = %to.display(), error = %e, "Could not check destination");
                false
            }
        };

        tokio::fs::rename(&from, &to)
            .await
            .map_err(|source| RelocationError::Move {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;

        if replaced {
            warn!(file = %file.name, destination = %to.display(), "Replaced existing file");
        } else {
            debug!(file = %file.name, destination = %to.display(), "Moved file");
        }

        file.state = next;
        Ok(Relocation {
            file: file.name.clone(),
            area,
            destination: to,
            replaced,
        })
    }
}
