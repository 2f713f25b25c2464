use anyhow::Result;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vcs_log_core::LogConfig;
use vcs_log_core::LogError;
use vcs_log_protocol::SortMode;

#[test]
fn config_file_overrides_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("log.toml");
    std::fs::write(
        &path,
        "page_size = 25\ndefault_sort = \"linearized_merges\"\nhighlight_my_commits = false\n",
    )?;

    let config = LogConfig::load(&path)?;
    assert_eq!(
        config,
        LogConfig {
            page_size: 25,
            default_sort: SortMode::LinearizedMerges,
            highlight_my_commits: false,
            ..LogConfig::default()
        }
    );
    Ok(())
}

#[test]
fn missing_config_file_is_reported_with_its_path() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("absent.toml");
    assert_matches!(
        LogConfig::load(&path),
        Err(LogError::ConfigRead { path: reported, .. }) if reported == path
    );
    Ok(())
}
