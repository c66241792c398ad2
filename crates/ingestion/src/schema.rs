//! Spec file resolution.
//!
//! A spec file is a small CSV document describing the fixed-width layout of
//! one format:
//!
//! ```text
//! "column name",width,datatype
//! name,10,TEXT
//! valid,1,BOOLEAN
//! count,3,INTEGER
//! ```
//!
//! Resolution only checks the structure of the file. Width and datatype
//! values are taken as written; bad values surface when lines are decoded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use loader_common::{ColumnSpec, FormatKey};

use crate::config::LoaderConfig;
use crate::error::ResolutionError;

/// Required first line of every spec file.
pub const SPEC_FILE_HEADER: &str = "\"column name\",width,datatype";

/// Ordered column layout of one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub key: FormatKey,
    pub columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(key: FormatKey, columns: Vec<ColumnSpec>) -> Self {
        Self { key, columns }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Sum of all valid column widths.
    pub fn line_length(&self) -> usize {
        self.columns
            .iter()
            .filter_map(ColumnSpec::width)
            .fold(0, usize::saturating_add)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Locates and parses spec files.
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    spec_dir: PathBuf,
    spec_extension: String,
}

impl SchemaResolver {
    pub fn new(spec_dir: impl Into<PathBuf>, spec_extension: impl Into<String>) -> Self {
        Self {
            spec_dir: spec_dir.into(),
            spec_extension: spec_extension.into(),
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(&config.spec_dir, &config.spec_extension)
    }

    /// Path of the spec file for a format.
    pub fn spec_path(&self, key: &FormatKey) -> PathBuf {
        self.spec_dir
            .join(format!("{}{}", key, self.spec_extension))
    }

    /// Load and validate the schema for a format.
    pub async fn resolve(&self, key: &FormatKey) -> Result<Schema, ResolutionError> {
        let path = self.spec_path(key);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(ResolutionError::NotFound { path }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResolutionError::NotFound { path })
            }
            Err(source) => return Err(ResolutionError::Io { path, source }),
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(source) => return Err(ResolutionError::Io { path, source }),
        };

        let schema = parse_spec(key, &path, &content)?;
        debug!(
            key = %key,
            columns = schema.len(),
            line_length = schema.line_length(),
            "Resolved schema"
        );
        Ok(schema)
    }
}

/// Parse spec file content into a schema.
///
/// `path` is only used for error reporting.
pub fn parse_spec(key: &FormatKey, path: &Path, content: &str) -> Result<Schema, ResolutionError> {
    let (header, body) = content.split_once('\n').unwrap_or((content, ""));
    let header = header.strip_suffix('\r').unwrap_or(header);

    if header != SPEC_FILE_HEADER {
        return Err(ResolutionError::InvalidHeader {
            path: path.to_path_buf(),
            found: header.to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut columns = Vec::new();
    let mut seen = HashSet::new();

    for result in reader.records() {
        let malformed = |line: u64, reason: String| ResolutionError::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let row = result.map_err(|e| {
            // Lines are 1-based and the header was stripped off
            let line = e.position().map(|p| p.line() + 1).unwrap_or(0);
            malformed(line, e.to_string())
        })?;
        let line = row.position().map(|p| p.line() + 1).unwrap_or(0);

        // A whitespace-only line trims down to a single empty field
        if row.len() == 1 && row[0].is_empty() {
            continue;
        }

        if row.len() != 3 {
            return Err(malformed(
                line,
                format!("expected 3 fields (name, width, datatype), found {}", row.len()),
            ));
        }

        let name = &row[0];
        if name.is_empty() {
            return Err(malformed(line, "empty column name".to_string()));
        }
        if !seen.insert(name.to_string()) {
            return Err(malformed(line, format!("duplicate column name {:?}", name)));
        }

        columns.push(ColumnSpec::from_tokens(name, &row[1], &row[2]));
    }

    if columns.is_empty() {
        return Err(ResolutionError::NoColumns {
            path: path.to_path_buf(),
        });
    }

    Ok(Schema::new(key.clone(), columns))
}
