//! Helpers for loader tests.
//!
//! [`TestTree`] gives each test its own installation directory (incoming data,
//! specs and the hold/processed areas). The `testformat1` constants describe a
//! spec file, a matching data file and the rows it should load. Sample files
//! checked in under `crates/ingestion/testdata` are found with
//! [`require_test_file!`].
//!
//! ```ignore
//! let tree = TestTree::new();
//! tree.write_spec(TESTFORMAT1, TESTFORMAT1_SPEC);
//! tree.write_data(TESTFORMAT1_DATA_FILE, TESTFORMAT1_DATA);
//! ```

pub mod fixtures;
pub mod paths;
pub mod tree;

pub use fixtures::*;
pub use paths::*;
pub use tree::TestTree;

/// Path of a sample file, or an early return from the calling test when no
/// search location has it.
///
/// ```ignore
/// let spec = require_test_file!("specs/testformat1.csv");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Set TEST_DATA_DIR to point at it.",
                    $name
                );
                return;
            }
        }
    }};
}
