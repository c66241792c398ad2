//! The `testformat1` sample format.
//!
//! A three-column layout with one line per supported datatype, used by the
//! pipeline, storage and service tests.

use loader_common::{ColumnSpec, DataType, Record};

pub const TESTFORMAT1: &str = "testformat1";

pub const TESTFORMAT1_SPEC: &str = "\"column name\",width,datatype
name,10,TEXT
valid,1,BOOLEAN
count,3,INTEGER
";

pub const TESTFORMAT1_DATA_FILE: &str = "testformat1_2015-06-28.txt";

pub const TESTFORMAT1_DATA: &str = "Foonyor   1  1
Barzane   0-12
Quuxitude 1103
";

/// Spec file with the datatype column missing from its header.
pub const MISSING_DATATYPE_SPEC: &str = "\"column name\",width
name,10
valid,1
";

pub fn testformat1_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("name", 10, DataType::Text),
        ColumnSpec::new("valid", 1, DataType::Boolean),
        ColumnSpec::new("count", 3, DataType::Integer),
    ]
}

/// Rows expected after loading [`TESTFORMAT1_DATA`].
pub fn testformat1_records() -> Vec<Record> {
    vec![
        Record::new(vec!["Foonyor".into(), true.into(), 1i64.into()]),
        Record::new(vec!["Barzane".into(), false.into(), (-12i64).into()]),
        Record::new(vec!["Quuxitude".into(), true.into(), 103i64.into()]),
    ]
}
