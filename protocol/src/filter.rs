use std::collections::BTreeSet;

use regex_lite::Regex;
use regex_lite::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ProtocolError;
use crate::error::Result;
use crate::ids::Hash;
use crate::ids::RootId;

/// User filter token that stands for the root's own committer identity.
pub const ME_TOKEN: &str = "me";

/// Shorter hex patterns are too likely to be ordinary words.
const MIN_HASH_PREFIX_LEN: usize = 4;

/// The active query of a log view. `FilterSet::default()` admits everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<BTreeSet<RootId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<BranchFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateFilter>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.roots.is_none()
            && self.branches.is_none()
            && self.users.is_none()
            && self.paths.is_none()
            && self.text.is_none()
            && self.date.is_none()
    }

    pub fn with_roots<I>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = RootId>,
    {
        self.roots = Some(roots.into_iter().collect());
        self
    }

    pub fn with_branches<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = Some(BranchFilter::include(names));
        self
    }

    pub fn with_branch_filter(mut self, filter: BranchFilter) -> Self {
        self.branches = Some(filter);
        self
    }

    pub fn with_users<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_paths<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = Some(
            prefixes
                .into_iter()
                .map(|prefix| normalize_path(&prefix.into()))
                .collect(),
        );
        self
    }

    pub fn with_text(mut self, text: TextFilter) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_date(mut self, date: DateFilter) -> Self {
        self.date = Some(date);
        self
    }

    /// Checks the parts that can be malformed (currently only the text regex).
    pub fn validate(&self) -> Result<()> {
        if let Some(text) = &self.text {
            text.matcher()?;
        }
        Ok(())
    }
}

/// Branch filter by reference name. A commit passes when it is reachable
/// from an included ref (or `include` is empty) and not reachable from an
/// excluded one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFilter {
    #[serde(default)]
    pub include: BTreeSet<String>,
    #[serde(default)]
    pub exclude: BTreeSet<String>,
}

impl BranchFilter {
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: names.into_iter().map(Into::into).collect(),
            exclude: BTreeSet::new(),
        }
    }

    /// Parses `name` / `-name` tokens, the spelling used on the command line.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for token in tokens {
            let token = token.as_ref().trim();
            if let Some(excluded) = token.strip_prefix('-') {
                if !excluded.is_empty() {
                    filter.exclude.insert(excluded.to_string());
                }
            } else if !token.is_empty() {
                filter.include.insert(token.to_string());
            }
        }
        filter
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFilter {
    pub pattern: String,
    #[serde(default)]
    pub match_case: bool,
    #[serde(default)]
    pub regex: bool,
}

impl TextFilter {
    pub fn plain(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_case: false,
            regex: false,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_case: false,
            regex: true,
        }
    }

    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    pub fn matcher(&self) -> Result<TextMatcher> {
        let regex = if self.regex {
            let compiled = RegexBuilder::new(&self.pattern)
                .case_insensitive(!self.match_case)
                .build()
                .map_err(|err| ProtocolError::InvalidRegex {
                    pattern: self.pattern.clone(),
                    message: err.to_string(),
                })?;
            Some(compiled)
        } else {
            None
        };
        Ok(TextMatcher {
            needle: if self.match_case {
                self.pattern.clone()
            } else {
                self.pattern.to_lowercase()
            },
            match_case: self.match_case,
            hash_prefix: (self.pattern.trim().len() >= MIN_HASH_PREFIX_LEN
                && Hash::looks_like_hash(&self.pattern))
            .then(|| self.pattern.trim().to_string()),
            regex,
        })
    }
}

/// Compiled form of a [`TextFilter`].
#[derive(Debug, Clone)]
pub struct TextMatcher {
    needle: String,
    match_case: bool,
    hash_prefix: Option<String>,
    regex: Option<Regex>,
}

impl TextMatcher {
    pub fn matches(&self, hash: &Hash, subject: &str) -> bool {
        if let Some(prefix) = &self.hash_prefix
            && hash.starts_with(prefix)
        {
            return true;
        }
        match &self.regex {
            Some(regex) => regex.is_match(subject),
            None if self.match_case => subject.contains(&self.needle),
            None => subject.to_lowercase().contains(&self.needle),
        }
    }
}

/// Inclusive range of commit timestamps in unix seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<i64>,
}

impl DateFilter {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.after.is_none_or(|after| timestamp >= after)
            && self.before.is_none_or(|before| timestamp <= before)
    }
}

fn normalize_path(path: &str) -> String {
    path.trim().replace('\\', "/").trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hash(text: &str) -> Hash {
        Hash::parse(text).expect("valid hash")
    }

    #[test]
    fn default_filter_set_is_empty() {
        assert!(FilterSet::default().is_empty());
        assert!(!FilterSet::default().with_users(["alice"]).is_empty());
    }

    #[test]
    fn filter_sets_compare_by_value() {
        let a = FilterSet::default().with_users(["alice", "bob"]);
        let b = FilterSet::default().with_users(["bob", "alice"]);
        assert_eq!(a, b);
    }

    #[test]
    fn branch_tokens_split_into_include_and_exclude() {
        let filter = BranchFilter::from_tokens(["main", "-release", "-", " dev "]);
        assert_eq!(
            filter.include,
            BTreeSet::from(["dev".to_string(), "main".to_string()])
        );
        assert_eq!(filter.exclude, BTreeSet::from(["release".to_string()]));
    }

    #[test]
    fn plain_text_matching_ignores_case_by_default() {
        let matcher = TextFilter::plain("Fix").matcher().expect("matcher");
        assert!(matcher.matches(&hash("123"), "a fix for the parser"));
        assert!(!matcher.matches(&hash("123"), "feature work"));

        let strict = TextFilter::plain("Fix").match_case(true).matcher().expect("matcher");
        assert!(!strict.matches(&hash("123"), "a fix for the parser"));
    }

    #[test]
    fn hex_patterns_also_match_hash_prefixes() {
        let matcher = TextFilter::plain("abc1").matcher().expect("matcher");
        assert!(matcher.matches(&hash("abc123"), "unrelated subject"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let filter = FilterSet::default().with_text(TextFilter::regex("("));
        assert!(matches!(
            filter.validate(),
            Err(ProtocolError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn date_filter_bounds_are_inclusive() {
        let range = DateFilter {
            after: Some(10),
            before: Some(20),
        };
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(21));
        assert!(DateFilter::default().contains(i64::MIN));
    }

    #[test]
    fn path_prefixes_are_normalized() {
        let filter = FilterSet::default().with_paths(["src\\core/"]);
        assert_eq!(filter.paths, Some(BTreeSet::from(["src/core".to_string()])));
    }
}
