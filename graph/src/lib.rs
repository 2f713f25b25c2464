//! Commit graph model of the log viewer: the immutable permanent graph of a
//! refresh, the filter/sort pipeline that derives visible graphs from it, and
//! the structural expand/collapse edits applied on top.

mod collapse;
mod controller;
mod error;
mod filter;
mod snapshot;
mod sort;
mod users;
mod visible;

pub mod test_support;

pub use collapse::CollapseState;
pub use controller::Answer;
pub use controller::GraphActionController;
pub use controller::Updater;
pub use error::BuildError;
pub use error::Cancelled;
pub use error::GraphError;
pub use error::Result;
pub use snapshot::CommitIndex;
pub use snapshot::CommitNode;
pub use snapshot::CommitRecord;
pub use snapshot::GraphSnapshot;
pub use snapshot::SnapshotBuilder;
pub use snapshot::SnapshotFixture;
pub use users::UserIdentityResolver;
pub use users::name_from_email;
pub use users::normalize_name;
pub use visible::Row;
pub use visible::VisibleGraph;
pub use visible::VisibleGraphBuilder;
