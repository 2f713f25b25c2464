use std::io::Write;

use anyhow::Result;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use vcs_log_graph::GraphError;
use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::test_support::hashes_in_order;
use vcs_log_protocol::SortMode;

const FIXTURE: &str = r#"{
    "commits": [
        {"hash": "a1", "root": "repo", "author": {"name": "Alice", "email": "alice@x.io"}, "timestamp": 10, "subject": "init"},
        {"hash": "b2", "root": "repo", "parents": ["a1"], "author": {"name": "Bob", "email": "bob@x.io"}, "timestamp": 20, "subject": "second", "paths": ["src/lib.rs"]}
    ],
    "refs": [{"root": "repo", "name": "main", "commit_hash": "b2", "ref_type": "local_branch"}],
    "is_full": false
}"#;

#[test]
fn snapshot_loads_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(FIXTURE.as_bytes())?;

    let snapshot = GraphSnapshot::load_fixture(file.path())?;
    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.is_full());
    assert_eq!(hashes_in_order(&snapshot, SortMode::Chronological), vec!["b2", "a1"]);
    Ok(())
}

#[test]
fn malformed_hash_is_rejected() {
    let json = r#"{"commits": [{"hash": "not-hex", "root": "repo", "author": {"name": "A", "email": ""}, "timestamp": 1}]}"#;
    assert_matches!(GraphSnapshot::from_fixture_json(json), Err(GraphError::Fixture(_)));
}

#[test]
fn missing_file_is_an_io_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    assert_matches!(
        GraphSnapshot::load_fixture(&dir.path().join("absent.json")),
        Err(GraphError::Io(_))
    );
    Ok(())
}
