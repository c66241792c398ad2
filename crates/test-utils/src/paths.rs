//! Where sample spec and data files live.

use std::path::PathBuf;

/// Two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .and_then(|crates| crates.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// `crates/<crate_name>/testdata` under the workspace root.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join(crate_name)
        .join("testdata")
}

/// First existing `name` under `TEST_DATA_DIR`, the ingestion crate's
/// `testdata` or a workspace-level `testdata`, in that order.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    candidates.extend([
        crate_testdata_dir("ingestion").join(name),
        workspace_root().join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_members() {
        let root = workspace_root();
        assert!(root.join("crates/ingestion").is_dir(), "{:?}", root);
        assert!(root.join("services/loader").is_dir(), "{:?}", root);
    }

    #[test]
    fn test_crate_testdata_dir() {
        let dir = crate_testdata_dir("ingestion");
        assert!(dir.ends_with("crates/ingestion/testdata"));
    }

    #[test]
    fn test_find_sample_spec() {
        let spec = find_test_file("specs/testformat1.csv").unwrap();
        assert!(spec.ends_with("specs/testformat1.csv"));
        assert!(find_test_file("specs/absent.csv").is_none());
    }
}
