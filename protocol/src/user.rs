use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::ids::Hash;
use crate::ids::RootId;

/// Author or committer identity. Two users are the same identity only when
/// both name and email are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VcsUser {
    pub name: String,
    pub email: String,
}

impl VcsUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// The part of the email before `@`, or the whole email when there is none.
    pub fn email_local_part(&self) -> &str {
        match self.email.split_once('@') {
            Some((local, _)) => local,
            None => &self.email,
        }
    }
}

impl fmt::Display for VcsUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefType {
    Head,
    LocalBranch,
    RemoteBranch,
    Tag,
}

impl RefType {
    pub fn is_branch(self) -> bool {
        matches!(self, RefType::LocalBranch | RefType::RemoteBranch)
    }
}

/// A named reference. Field order defines the `(root, name, hash, type)` key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VcsRef {
    pub root: RootId,
    pub name: String,
    pub commit_hash: Hash,
    pub ref_type: RefType,
}

impl VcsRef {
    pub fn new(commit_hash: Hash, name: impl Into<String>, ref_type: RefType, root: RootId) -> Self {
        Self {
            root,
            name: name.into(),
            commit_hash,
            ref_type,
        }
    }
}
