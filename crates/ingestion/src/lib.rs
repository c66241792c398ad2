//! Fixed-width data file ingestion.
//!
//! Loads text files whose column layout is described by a per-format spec
//! file into database tables.
//!
//! # Architecture
//!
//! One pass of [`IngestionPipeline`] works through the data directory:
//!
//! - files are grouped by format key (`testformat1_2018-08-03.txt` belongs
//!   to `testformat1`)
//! - each group's spec file (`specs/testformat1.csv`) is resolved into a
//!   [`Schema`]
//! - every line is decoded into a typed [`Record`](loader_common::Record)
//! - the records go to a [`TableStore`](storage::TableStore) in one
//!   transaction
//! - files are moved to the processed area, or to a hold area when their
//!   spec is missing or broken
//!
//! The pass returns a [`RunSummary`] that renders the run log.

pub mod batch;
pub mod config;
pub mod decoder;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod report;
pub mod schema;

// Re-exports
pub use batch::{discover, group_files, Batches, Grouping};
pub use config::LoaderConfig;
pub use decoder::{
    DecodeWarning, Decoded, DecodedFile, LineWarning, MismatchPolicy, RecordDecoder,
};
pub use error::{
    GroupFailure, GroupingError, IngestionError, RelocationError, ResolutionError, Result,
};
pub use lifecycle::{
    Area, FileEvent, FileLifecycle, FileState, LifecycleError, Relocation, TrackedFile,
};
pub use pipeline::IngestionPipeline;
pub use report::{GroupOutcome, GroupStatus, RunSummary};
pub use schema::{parse_spec, Schema, SchemaResolver, SPEC_FILE_HEADER};
