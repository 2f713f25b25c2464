//! Value types shared by the commit log crates: commit identities, users,
//! references, filters and the structural graph actions a view can request.

mod action;
mod error;
mod filter;
mod ids;
mod user;

pub use action::GraphAction;
pub use action::RowIndex;
pub use action::SortMode;
pub use error::ProtocolError;
pub use error::Result;
pub use filter::BranchFilter;
pub use filter::DateFilter;
pub use filter::FilterSet;
pub use filter::TextFilter;
pub use filter::TextMatcher;
pub use filter::ME_TOKEN;
pub use ids::CommitId;
pub use ids::Hash;
pub use ids::RootId;
pub use user::RefType;
pub use user::VcsRef;
pub use user::VcsUser;
