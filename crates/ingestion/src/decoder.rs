//! Fixed-width line decoding.
//!
//! Decoding never fails: every line yields exactly one record with one value
//! per schema column. Problems are reported as [`DecodeWarning`]s and the
//! affected field falls back to a default so the row keeps its shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use loader_common::{ColumnSpec, DataType, Record, Value};

use crate::schema::Schema;

/// A non-fatal problem found while decoding a line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    #[error("Invalid line length ({observed}), expected {expected}")]
    LengthMismatch { observed: usize, expected: usize },

    #[error("Column '{column}': cannot read {raw:?} as {datatype}")]
    TypeError {
        column: String,
        datatype: DataType,
        raw: String,
    },

    #[error("Column '{column}': unsupported datatype {datatype:?}")]
    UnsupportedType { column: String, datatype: String },

    #[error("Column '{column}': invalid width {width:?}")]
    InvalidWidth { column: String, width: String },
}

/// What happens to a line whose length differs from the schema's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Load whatever was decoded
    #[default]
    Keep,
    /// Leave the line out of the insert
    Skip,
}

/// One decoded line.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: Record,
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    pub fn has_length_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DecodeWarning::LengthMismatch { .. }))
    }
}

/// A warning tied to the file and 1-based line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LineWarning {
    pub file: String,
    pub line: usize,
    pub warning: DecodeWarning,
}

impl std::fmt::Display for LineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in data file: {} (line {})", self.warning, self.file, self.line)
    }
}

/// All records of one data file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFile {
    pub records: Vec<Record>,
    pub warnings: Vec<LineWarning>,
    /// Lines left out under [`MismatchPolicy::Skip`]
    pub skipped: usize,
}

/// Decodes lines under one schema.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder<'a> {
    schema: &'a Schema,
    policy: MismatchPolicy,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Decode one line (without its terminator).
    pub fn decode(&self, line: &str) -> Decoded {
        let chars: Vec<char> = line.chars().collect();
        let mut warnings = Vec::new();

        let expected = self.schema.line_length();
        if chars.len() != expected {
            warnings.push(DecodeWarning::LengthMismatch {
                observed: chars.len(),
                expected,
            });
        }

        let mut values = Vec::with_capacity(self.schema.len());
        let mut cursor = 0;

        for column in &self.schema.columns {
            let Some(width) = column.width() else {
                warnings.push(DecodeWarning::InvalidWidth {
                    column: column.name.clone(),
                    width: column.width_token.clone(),
                });
                values.push(default_value(&column.datatype));
                continue;
            };

            let raw: String = chars.iter().skip(cursor).take(width).collect();
            cursor = cursor.saturating_add(width);

            let (value, warning) = coerce(column, raw);
            values.push(value);
            warnings.extend(warning);
        }

        Decoded {
            record: Record::new(values),
            warnings,
        }
    }

    /// Decode every line of a data file.
    ///
    /// Accepts `\n` and `\r\n` terminators; a trailing terminator does not
    /// produce an extra empty record.
    pub fn decode_file(&self, file: &str, content: &str) -> DecodedFile {
        let mut decoded_file = DecodedFile::default();

        for (index, line) in content.lines().enumerate() {
            let decoded = self.decode(line);
            let skip = self.policy == MismatchPolicy::Skip && decoded.has_length_mismatch();

            decoded_file
                .warnings
                .extend(decoded.warnings.into_iter().map(|warning| LineWarning {
                    file: file.to_string(),
                    line: index + 1,
                    warning,
                }));

            if skip {
                decoded_file.skipped += 1;
            } else {
                decoded_file.records.push(decoded.record);
            }
        }

        decoded_file
    }
}

/// Convert a raw slice according to the column's datatype.
fn coerce(column: &ColumnSpec, raw: String) -> (Value, Option<DecodeWarning>) {
    let type_error = |raw: String| DecodeWarning::TypeError {
        column: column.name.clone(),
        datatype: column.datatype.clone(),
        raw,
    };

    match &column.datatype {
        DataType::Text => (coerce_text(&raw), None),
        DataType::Boolean => match coerce_boolean(&raw) {
            Some(value) => (value, None),
            None => (Value::Boolean(false), Some(type_error(raw))),
        },
        DataType::Integer => match coerce_integer(&raw) {
            Some(value) => (value, None),
            None => (Value::Integer(0), Some(type_error(raw))),
        },
        DataType::Unsupported(token) => (
            Value::Text(raw),
            Some(DecodeWarning::UnsupportedType {
                column: column.name.clone(),
                datatype: token.clone(),
            }),
        ),
    }
}

fn coerce_text(raw: &str) -> Value {
    Value::Text(raw.trim_end().to_string())
}

/// Integer token, non-zero is true.
fn coerce_boolean(raw: &str) -> Option<Value> {
    parse_integer(raw).map(|n| Value::Boolean(n != 0))
}

fn coerce_integer(raw: &str) -> Option<Value> {
    parse_integer(raw).map(Value::Integer)
}

/// Decimal integer with optional sign; padding on either side is ignored.
fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn default_value(datatype: &DataType) -> Value {
    match datatype {
        DataType::Boolean => Value::Boolean(false),
        DataType::Integer => Value::Integer(0),
        DataType::Text | DataType::Unsupported(_) => Value::Text(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader_common::FormatKey;

    fn testformat1() -> Schema {
        Schema::new(
            FormatKey::new("testformat1"),
            vec![
                ColumnSpec::new("name", 10, DataType::Text),
                ColumnSpec::new("valid", 1, DataType::Boolean),
                ColumnSpec::new("count", 3, DataType::Integer),
            ],
        )
    }

    fn record(name: &str, valid: bool, count: i64) -> Record {
        Record::new(vec![name.into(), valid.into(), count.into()])
    }

    #[test]
    fn test_decode_example_lines() {
        let schema = testformat1();
        let decoder = RecordDecoder::new(&schema);

        let cases = [
            ("Foonyor   1  1", record("Foonyor", true, 1)),
            ("Barzane   0-12", record("Barzane", false, -12)),
            ("Quuxitude 1103", record("Quuxitude", true, 103)),
        ];

        for (line, expected) in cases {
            let decoded = decoder.decode(line);
            assert_eq!(decoded.record, expected, "line {:?}", line);
            assert!(decoded.warnings.is_empty(), "line {:?}", line);
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let schema = testformat1();
        let decoder = RecordDecoder::new(&schema);

        assert_eq!(decoder.decode("Quuxitude 1103"), decoder.decode("Quuxitude 1103"));
    }

    #[test]
    fn test_short_line_still_decodes() {
        let schema = testformat1();
        let decoded = RecordDecoder::new(&schema).decode("Foonyor   1");

        assert_eq!(decoded.record.len(), 3);
        assert_eq!(decoded.record, record("Foonyor", true, 0));
        assert_eq!(
            decoded.warnings,
            vec![
                DecodeWarning::LengthMismatch { observed: 11, expected: 14 },
                DecodeWarning::TypeError {
                    column: "count".to_string(),
                    datatype: DataType::Integer,
                    raw: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_long_line_ignores_overflow() {
        let schema = testformat1();
        let decoded = RecordDecoder::new(&schema).decode("Foonyor   1  1EXTRA");

        assert_eq!(decoded.record, record("Foonyor", true, 1));
        assert_eq!(
            decoded.warnings,
            vec![DecodeWarning::LengthMismatch { observed: 19, expected: 14 }]
        );
    }

    #[test]
    fn test_type_errors_fall_back_to_defaults() {
        let schema = testformat1();
        let decoded = RecordDecoder::new(&schema).decode("Foonyor   Xabc");

        assert_eq!(decoded.record, record("Foonyor", false, 0));
        assert_eq!(decoded.warnings.len(), 2);
        assert!(decoded
            .warnings
            .iter()
            .all(|w| matches!(w, DecodeWarning::TypeError { .. })));
    }

    #[test]
    fn test_unsupported_type_keeps_raw_slice() {
        let schema = Schema::new(
            FormatKey::new("dated"),
            vec![
                ColumnSpec::new("day", 10, DataType::Unsupported("DATE".to_string())),
                ColumnSpec::new("n", 2, DataType::Integer),
            ],
        );
        let decoded = RecordDecoder::new(&schema).decode("2015-06-28 7");

        assert_eq!(decoded.record, Record::new(vec!["2015-06-28".into(), 7i64.into()]));
        assert_eq!(
            decoded.warnings,
            vec![DecodeWarning::UnsupportedType {
                column: "day".to_string(),
                datatype: "DATE".to_string(),
            }]
        );
    }

    #[test]
    fn test_invalid_width_consumes_nothing() {
        let schema = Schema::new(
            FormatKey::new("odd"),
            vec![
                ColumnSpec::from_tokens("flag", "x", "BOOLEAN"),
                ColumnSpec::new("name", 4, DataType::Text),
            ],
        );
        let decoded = RecordDecoder::new(&schema).decode("abcd");

        assert_eq!(decoded.record, Record::new(vec![false.into(), "abcd".into()]));
        assert_eq!(
            decoded.warnings,
            vec![DecodeWarning::InvalidWidth {
                column: "flag".to_string(),
                width: "x".to_string(),
            }]
        );
    }

    #[test]
    fn test_oversized_width_is_invalid() {
        let schema = Schema::new(
            FormatKey::new("huge"),
            vec![
                ColumnSpec::from_tokens("a", "18446744073709551615", "TEXT"),
                ColumnSpec::from_tokens("b", "1", "INTEGER"),
            ],
        );
        assert_eq!(schema.line_length(), 1);

        let decoded = RecordDecoder::new(&schema).decode("x1");

        assert_eq!(decoded.record, Record::new(vec!["".into(), 0i64.into()]));
        assert_eq!(
            decoded.warnings,
            vec![
                DecodeWarning::LengthMismatch { observed: 2, expected: 1 },
                DecodeWarning::InvalidWidth {
                    column: "a".to_string(),
                    width: "18446744073709551615".to_string(),
                },
                DecodeWarning::TypeError {
                    column: "b".to_string(),
                    datatype: DataType::Integer,
                    raw: "x".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_widths_at_the_cap_do_not_overflow() {
        let widest = loader_common::MAX_COLUMN_WIDTH.to_string();
        let schema = Schema::new(
            FormatKey::new("wide"),
            vec![
                ColumnSpec::from_tokens("a", &widest, "TEXT"),
                ColumnSpec::from_tokens("b", &widest, "TEXT"),
            ],
        );
        let decoded = RecordDecoder::new(&schema).decode("short");

        assert_eq!(decoded.record, Record::new(vec!["short".into(), "".into()]));
        assert!(decoded.has_length_mismatch());
    }

    #[test]
    fn test_text_keeps_leading_whitespace() {
        let schema = Schema::new(
            FormatKey::new("t"),
            vec![ColumnSpec::new("name", 6, DataType::Text)],
        );
        let decoded = RecordDecoder::new(&schema).decode("  ab  ");
        assert_eq!(decoded.record, Record::new(vec!["  ab".into()]));
    }

    #[test]
    fn test_multibyte_characters_count_once() {
        let schema = Schema::new(
            FormatKey::new("t"),
            vec![
                ColumnSpec::new("name", 5, DataType::Text),
                ColumnSpec::new("n", 1, DataType::Integer),
            ],
        );
        let decoded = RecordDecoder::new(&schema).decode("Zoë  4");

        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.record, Record::new(vec!["Zoë".into(), 4i64.into()]));
    }

    #[test]
    fn test_decode_file_keep_policy() {
        let schema = testformat1();
        let content = "Foonyor   1  1\r\nBad\nQuuxitude 1103\n";
        let decoded = RecordDecoder::new(&schema).decode_file("testformat1_x.txt", content);

        assert_eq!(decoded.records.len(), 3);
        assert_eq!(decoded.skipped, 0);
        assert_eq!(decoded.records[0], record("Foonyor", true, 1));
        assert_eq!(decoded.warnings[0].line, 2);
        assert_eq!(decoded.warnings[0].file, "testformat1_x.txt");
        assert_eq!(
            decoded.warnings[0].warning,
            DecodeWarning::LengthMismatch { observed: 3, expected: 14 }
        );
    }

    #[test]
    fn test_decode_file_skip_policy() {
        let schema = testformat1();
        let content = "Foonyor   1  1\nBad\nQuuxitude 1103\n";
        let decoded = RecordDecoder::new(&schema)
            .with_policy(MismatchPolicy::Skip)
            .decode_file("testformat1_x.txt", content);

        assert_eq!(
            decoded.records,
            vec![record("Foonyor", true, 1), record("Quuxitude", true, 103)]
        );
        assert_eq!(decoded.skipped, 1);
        assert!(!decoded.warnings.is_empty());
    }

    #[test]
    fn test_warning_display() {
        let warning = LineWarning {
            file: "testformat1_x.txt".to_string(),
            line: 2,
            warning: DecodeWarning::LengthMismatch { observed: 3, expected: 14 },
        };
        assert_eq!(
            warning.to_string(),
            "Invalid line length (3), expected 14 in data file: testformat1_x.txt (line 2)"
        );
    }
}
