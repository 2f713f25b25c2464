use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use vcs_log_protocol::SortMode;

use crate::error::LogError;
use crate::error::Result;

/// Log viewer settings, read from a TOML file. Every field has a default,
/// so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Rows the table model materializes per `request_more`.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Sort mode of a freshly opened log.
    #[serde(default)]
    pub default_sort: SortMode,

    /// Default `tracing` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Whether a navigation waiting for more data asks storage to load more
    /// commits.
    #[serde(default = "default_true")]
    pub load_more_on_wait: bool,

    #[serde(default = "default_true")]
    pub highlight_merges: bool,

    #[serde(default = "default_true")]
    pub highlight_my_commits: bool,
}

fn default_page_size() -> usize {
    100
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_sort: SortMode::default(),
            log_filter: default_log_filter(),
            load_more_on_wait: true,
            highlight_merges: true,
            highlight_my_commits: true,
        }
    }
}

impl LogConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| LogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(LogError::InvalidConfig("page_size must be > 0".to_string()));
        }
        Ok(())
    }
}
