//! Format keys, column definitions and decoded values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by a spec file and all data files belonging to it.
///
/// Also used verbatim as the destination table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FormatKey(pub String);

impl FormatKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key from a data filename such as `testformat1_2015-06-28.txt`.
    ///
    /// The name is split once from the right on `_`. Returns `None` when there
    /// is no underscore or the key part is empty.
    pub fn from_data_filename(filename: &str) -> Option<Self> {
        match filename.rsplit_once('_') {
            Some((key, _suffix)) if !key.is_empty() => Some(Self(key.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared column type from a spec file.
///
/// Unknown tokens are kept so they can be reported when a line is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Text,
    Boolean,
    Integer,
    Unsupported(String),
}

impl DataType {
    /// Parse a datatype token. Matching is exact (`TEXT`, not `text`).
    pub fn parse(token: &str) -> Self {
        match token {
            "TEXT" => DataType::Text,
            "BOOLEAN" => DataType::Boolean,
            "INTEGER" => DataType::Integer,
            other => DataType::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::Unsupported(token) => token,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DataType::Unsupported(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Widest column a spec file may declare, in characters.
pub const MAX_COLUMN_WIDTH: usize = 1 << 20;

/// One schema entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, also the table column name
    pub name: String,
    /// Width token as written in the spec file
    pub width_token: String,
    /// Declared datatype
    pub datatype: DataType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, width: usize, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            width_token: width.to_string(),
            datatype,
        }
    }

    /// Build from raw spec-file tokens without validating them.
    pub fn from_tokens(name: &str, width: &str, datatype: &str) -> Self {
        Self {
            name: name.to_string(),
            width_token: width.to_string(),
            datatype: DataType::parse(datatype),
        }
    }

    /// Number of characters consumed, or `None` if the width token is not an
    /// integer in `1..=MAX_COLUMN_WIDTH`.
    pub fn width(&self) -> Option<usize> {
        match self.width_token.parse::<usize>() {
            Ok(width) if (1..=MAX_COLUMN_WIDTH).contains(&width) => Some(width),
            _ => None,
        }
    }
}

/// A single decoded field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Boolean(bool),
    Integer(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// One decoded row, positionally aligned with its schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record(pub Vec<Value>);

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_key_from_filename() {
        let key = FormatKey::from_data_filename("testformat1_2015-06-28.txt").unwrap();
        assert_eq!(key.as_str(), "testformat1");

        // Only the last underscore separates the suffix
        let key = FormatKey::from_data_filename("daily_sales_2018-08-03.txt").unwrap();
        assert_eq!(key.as_str(), "daily_sales");
    }

    #[test]
    fn test_format_key_malformed() {
        assert!(FormatKey::from_data_filename("nounderscore.txt").is_none());
        assert!(FormatKey::from_data_filename("_2015-06-28.txt").is_none());
    }

    #[test]
    fn test_datatype_parse() {
        assert_eq!(DataType::parse("TEXT"), DataType::Text);
        assert_eq!(DataType::parse("BOOLEAN"), DataType::Boolean);
        assert_eq!(DataType::parse("INTEGER"), DataType::Integer);
        assert_eq!(
            DataType::parse("DATE"),
            DataType::Unsupported("DATE".to_string())
        );
        assert!(!DataType::parse("text").is_supported());
    }

    #[test]
    fn test_column_width() {
        assert_eq!(ColumnSpec::from_tokens("name", "10", "TEXT").width(), Some(10));
        assert_eq!(ColumnSpec::from_tokens("name", "0", "TEXT").width(), None);
        assert_eq!(ColumnSpec::from_tokens("name", "-3", "TEXT").width(), None);
        assert_eq!(ColumnSpec::from_tokens("name", "ten", "TEXT").width(), None);
    }

    #[test]
    fn test_column_width_cap() {
        let widest = MAX_COLUMN_WIDTH.to_string();
        assert_eq!(
            ColumnSpec::from_tokens("name", &widest, "TEXT").width(),
            Some(MAX_COLUMN_WIDTH)
        );

        let too_wide = (MAX_COLUMN_WIDTH + 1).to_string();
        assert_eq!(ColumnSpec::from_tokens("name", &too_wide, "TEXT").width(), None);
        assert_eq!(
            ColumnSpec::from_tokens("name", "18446744073709551615", "TEXT").width(),
            None
        );
        assert_eq!(
            ColumnSpec::from_tokens("name", "99999999999999999999999", "TEXT").width(),
            None
        );
    }

    #[test]
    fn test_record_display() {
        let record = Record::new(vec!["Foonyor".into(), true.into(), 1i64.into()]);
        assert_eq!(record.to_string(), "(\"Foonyor\", true, 1)");
    }
}
