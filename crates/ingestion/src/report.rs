//! Per-run results and the status lines written to the run log.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use uuid::Uuid;

use loader_common::FormatKey;

use crate::decoder::LineWarning;
use crate::error::{GroupFailure, GroupingError, RelocationError, ResolutionError};
use crate::lifecycle::{Area, Relocation, TrackedFile};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How a format group ended.
#[derive(Debug)]
pub enum GroupStatus {
    /// Not yet decided
    Pending,
    /// Rows were committed
    Loaded {
        rows: u64,
        table_created: bool,
        /// Lines left out because of their length
        skipped_lines: usize,
    },
    /// The spec was missing or broken; files were moved for review
    Held { reason: ResolutionError },
    /// Nothing was committed and files stay in place for the next run
    Failed { reason: GroupFailure },
}

impl GroupStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, GroupStatus::Pending)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, GroupStatus::Loaded { .. })
    }

    pub fn is_held(&self) -> bool {
        matches!(self, GroupStatus::Held { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GroupStatus::Failed { .. })
    }
}

/// Everything that happened to one format group.
#[derive(Debug)]
pub struct GroupOutcome {
    pub key: FormatKey,
    pub spec_path: PathBuf,
    pub spec_file: TrackedFile,
    pub files: Vec<TrackedFile>,
    pub status: GroupStatus,
    pub warnings: Vec<LineWarning>,
    pub relocations: Vec<Relocation>,
    pub relocation_failures: Vec<RelocationError>,
}

impl GroupOutcome {
    pub fn new(
        key: FormatKey,
        spec_path: PathBuf,
        spec_file: TrackedFile,
        files: Vec<TrackedFile>,
    ) -> Self {
        Self {
            key,
            spec_path,
            spec_file,
            files,
            status: GroupStatus::Pending,
            warnings: Vec::new(),
            relocations: Vec::new(),
            relocation_failures: Vec::new(),
        }
    }

    /// Rows committed for this group.
    pub fn rows(&self) -> u64 {
        match self.status {
            GroupStatus::Loaded { rows, .. } => rows,
            _ => 0,
        }
    }

    fn push_log_lines(&self, lines: &mut Vec<String>) {
        lines.push(String::new());
        lines.push(format!("Processing spec file: {}", self.spec_path.display()));

        if let GroupStatus::Held { reason } = &self.status {
            lines.push(reason.to_string());
        }

        lines.extend(self.warnings.iter().map(ToString::to_string));

        match &self.status {
            GroupStatus::Loaded {
                rows,
                table_created,
                skipped_lines,
            } => {
                if *table_created {
                    lines.push(format!("Table created: {}", self.key));
                }
                if *skipped_lines > 0 {
                    lines.push(format!(
                        "Skipped {} lines with invalid length",
                        skipped_lines
                    ));
                }
                lines.push(format!("Data entered into {} ({} rows)", self.key, rows));
            }
            GroupStatus::Failed {
                reason: GroupFailure::Storage(e),
            } => {
                lines.push(format!(
                    "Database exception: Could not insert data into table: {} ({})",
                    self.key, e
                ));
            }
            GroupStatus::Failed { reason } => lines.push(reason.to_string()),
            GroupStatus::Pending => lines.push(format!("Not processed: {}", self.key)),
            GroupStatus::Held { .. } => {}
        }

        let mut current_area = None;
        for relocation in &self.relocations {
            if current_area != Some(relocation.area) {
                lines.push(move_header(relocation.area).to_string());
                current_area = Some(relocation.area);
            }
            let suffix = if relocation.replaced {
                " (replaced existing file)"
            } else {
                ""
            };
            lines.push(format!(" - {}{}", relocation.destination.display(), suffix));
        }

        lines.extend(self.relocation_failures.iter().map(ToString::to_string));
    }
}

fn move_header(area: Area) -> &'static str {
    match area {
        Area::DataProcessed => "Moving successfully processed data files:",
        Area::DataHold => "Moving unprocessed data files for review:",
        Area::SpecHold => "Moving incorrectly formatted spec file for review:",
    }
}

/// Result of one pipeline pass.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// Data files found in the incoming area, including rejected names
    pub files_seen: usize,
    pub rejected: Vec<GroupingError>,
    /// One entry per format group, in key order
    pub outcomes: Vec<GroupOutcome>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at,
            files_seen: 0,
            rejected: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_loaded()).count()
    }

    pub fn held_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_held()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failed()).count()
    }

    pub fn rows_loaded(&self) -> u64 {
        self.outcomes.iter().map(GroupOutcome::rows).sum()
    }

    pub fn outcome(&self, key: &str) -> Option<&GroupOutcome> {
        self.outcomes.iter().find(|o| o.key.as_str() == key)
    }

    /// Ordered, human-readable status lines for the run log.
    pub fn log_lines(&self) -> Vec<String> {
        let started = self.started_at.format(TIMESTAMP_FORMAT);

        if self.files_seen == 0 {
            return vec![format!("{} No data files to process", started)];
        }

        let mut lines = vec![format!("{} Begin processing data files", started)];

        for rejected in &self.rejected {
            lines.push(format!("Skipping {}", rejected));
        }

        for outcome in &self.outcomes {
            outcome.push_log_lines(&mut lines);
        }

        lines.push(String::new());
        lines.push(format!(
            "{} Exiting",
            self.finished_at.format(TIMESTAMP_FORMAT)
        ));
        lines
    }
}
