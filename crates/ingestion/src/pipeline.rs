//! The load pipeline: resolve, decode, store, relocate.

use std::sync::Arc;

use chrono::Local;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use loader_common::{FormatKey, LoaderError, LoaderResult, Record};
use storage::TableStore;

use crate::batch::{discover, group_files, Batches};
use crate::config::LoaderConfig;
use crate::decoder::{DecodedFile, RecordDecoder};
use crate::error::{GroupFailure, IngestionError, ResolutionError, Result};
use crate::lifecycle::{Area, FileLifecycle, TrackedFile};
use crate::report::{GroupOutcome, GroupStatus, RunSummary};
use crate::schema::{Schema, SchemaResolver};

/// Loads every pending data file of an installation in one pass.
pub struct IngestionPipeline {
    config: LoaderConfig,
    store: Arc<dyn TableStore>,
    resolver: SchemaResolver,
    lifecycle: FileLifecycle,
}

impl IngestionPipeline {
    pub fn new(config: LoaderConfig, store: Arc<dyn TableStore>) -> Self {
        let resolver = SchemaResolver::from_config(&config);
        let lifecycle = FileLifecycle::from_config(&config);
        Self {
            config,
            store,
            resolver,
            lifecycle,
        }
    }

    /// Scan the data directory and process everything found.
    ///
    /// Only a failure to list the data directory aborts the run; every other
    /// problem is recorded on the group it belongs to.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Local::now());

        let names = discover(&self.config.data_dir, &self.config.data_extension).await?;
        let grouping = group_files(names);

        summary.files_seen = grouping.file_count() + grouping.rejected.len();
        summary.rejected = grouping.rejected;

        if summary.files_seen == 0 {
            info!(run_id = %summary.run_id, "No data files to process");
            return Ok(summary);
        }

        info!(
            run_id = %summary.run_id,
            files = summary.files_seen,
            groups = grouping.batches.len(),
            "Begin processing data files"
        );

        summary.outcomes = self.process_all(grouping.batches).await;
        summary.finished_at = Local::now();
        log_totals(&summary);
        Ok(summary)
    }

    /// Process already grouped files.
    pub async fn run_batches(&self, batches: Batches) -> RunSummary {
        let mut summary = RunSummary::new(Local::now());
        summary.files_seen = batches.values().map(Vec::len).sum();
        summary.outcomes = self.process_all(batches).await;
        summary.finished_at = Local::now();
        log_totals(&summary);
        summary
    }

    /// Outcomes come back in key order whatever the concurrency.
    async fn process_all(&self, batches: Batches) -> Vec<GroupOutcome> {
        stream::iter(batches)
            .map(|(key, files)| self.process_group(key, files))
            .buffered(self.config.parallel_groups.max(1))
            .collect()
            .await
    }

    #[instrument(skip(self, key, files), fields(key = %key, files = files.len()))]
    async fn process_group(&self, key: FormatKey, files: Vec<String>) -> GroupOutcome {
        let mut outcome = GroupOutcome::new(
            key.clone(),
            self.resolver.spec_path(&key),
            TrackedFile::pending(self.config.spec_filename(&key)),
            files.into_iter().map(TrackedFile::pending).collect(),
        );

        let schema = match self.resolver.resolve(&key).await {
            Ok(schema) => schema,
            Err(reason) => {
                self.hold(&mut outcome, reason).await;
                return outcome;
            }
        };

        let decoded = match self.decode_files(&schema, &outcome.files).await {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(error = %e, "Failed to read data file, leaving group in place");
                outcome.status = GroupStatus::Failed {
                    reason: GroupFailure::Read(e),
                };
                return outcome;
            }
        };

        for warning in &decoded.warnings {
            warn!(file = %warning.file, line = warning.line, "{}", warning.warning);
        }
        outcome.warnings = decoded.warnings;

        let (rows, table_created) = match self.store_records(&schema, &decoded.records).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "Storage failed, leaving group in place");
                outcome.status = GroupStatus::Failed {
                    reason: GroupFailure::Storage(e),
                };
                return outcome;
            }
        };

        info!(rows, table_created, skipped = decoded.skipped, "Data entered");
        outcome.status = GroupStatus::Loaded {
            rows,
            table_created,
            skipped_lines: decoded.skipped,
        };

        for file in &mut outcome.files {
            if let Err(e) = file.mark_persisted() {
                warn!(file = %file.name, error = %e, "Unexpected file state");
            }
        }
        self.relocate_files(&mut outcome, Area::DataProcessed).await;

        outcome
    }

    /// Route a group whose spec could not be resolved.
    async fn hold(&self, outcome: &mut GroupOutcome, reason: ResolutionError) {
        if !reason.holds_data() {
            error!(error = %reason, "Spec file unreadable, leaving group in place");
            outcome.status = GroupStatus::Failed {
                reason: GroupFailure::Resolution(reason),
            };
            return;
        }

        warn!(error = %reason, "Holding files for review");

        if reason.holds_spec() {
            match self
                .lifecycle
                .relocate(&mut outcome.spec_file, Area::SpecHold)
                .await
            {
                Ok(relocation) => outcome.relocations.push(relocation),
                Err(e) => {
                    warn!(error = %e, "Failed to hold spec file");
                    outcome.relocation_failures.push(e);
                }
            }
        }

        self.relocate_files(outcome, Area::DataHold).await;
        outcome.status = GroupStatus::Held { reason };
    }

    async fn relocate_files(&self, outcome: &mut GroupOutcome, area: Area) {
        for file in &mut outcome.files {
            match self.lifecycle.relocate(file, area).await {
                Ok(relocation) => outcome.relocations.push(relocation),
                Err(e) => {
                    warn!(file = %file.name, error = %e, "Failed to move data file");
                    outcome.relocation_failures.push(e);
                }
            }
        }
    }

    /// Decode all files of a group, in file order, into one record sequence.
    async fn decode_files(&self, schema: &Schema, files: &[TrackedFile]) -> Result<DecodedFile> {
        let decoder = RecordDecoder::new(schema).with_policy(self.config.on_length_mismatch);
        let mut decoded = DecodedFile::default();

        for file in files {
            let path = self.config.data_path(&file.name);
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| IngestionError::DataFile {
                    path: path.clone(),
                    source,
                })?;

            let file_decoded = decoder.decode_file(&file.name, &content);
            debug!(
                file = %file.name,
                records = file_decoded.records.len(),
                warnings = file_decoded.warnings.len(),
                "Decoded data file"
            );
            decoded.records.extend(file_decoded.records);
            decoded.warnings.extend(file_decoded.warnings);
            decoded.skipped += file_decoded.skipped;
        }

        Ok(decoded)
    }

    /// Returns the inserted row count and whether the table was created.
    async fn store_records(&self, schema: &Schema, records: &[Record]) -> LoaderResult<(u64, bool)> {
        let table = schema.key.as_str();
        let mut table_created = false;

        if !self.store.table_exists(table).await? {
            if !self.config.create_table {
                return Err(LoaderError::TableMissing(table.to_string()));
            }
            self.store.create_table(table, &schema.columns).await?;
            info!(table, "Table created");
            table_created = true;
        }

        let rows = self
            .store
            .bulk_insert(table, &schema.column_names(), records)
            .await?;
        Ok((rows, table_created))
    }
}

fn log_totals(summary: &RunSummary) {
    info!(
        run_id = %summary.run_id,
        loaded = summary.loaded_count(),
        held = summary.held_count(),
        failed = summary.failed_count(),
        rows = summary.rows_loaded(),
        "Run complete"
    );
}
