use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

/// Index of a row in a visible graph.
pub type RowIndex = usize;

/// Order in which visible rows are emitted. Both variants are topological:
/// a commit always precedes its parents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortMode {
    /// Among commits whose children are all emitted, the newest goes first.
    #[default]
    Chronological,
    /// Commits of a merged branch are emitted right below their merge
    /// commit, before the mainline continues.
    LinearizedMerges,
}

/// Structural edits a view can request on its visible graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "row", rename_all = "snake_case")]
pub enum GraphAction {
    ExpandAll,
    CollapseAll,
    ExpandNode(RowIndex),
    CollapseNode(RowIndex),
}

impl GraphAction {
    pub fn title(self) -> &'static str {
        match self {
            GraphAction::ExpandAll => "Expanding merges",
            GraphAction::CollapseAll => "Collapsing merges",
            GraphAction::ExpandNode(_) => "Expanding merge",
            GraphAction::CollapseNode(_) => "Collapsing merge",
        }
    }
}
