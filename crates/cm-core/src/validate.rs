//! # Shared validation schemas
//!
//! Enforced client-side before submission and again authoritatively in the
//! handlers. Limits mirror what the backend accepts; client-side failures
//! never reach the network.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const COMMUNITY_NAME_MIN: usize = 2;
pub const COMMUNITY_NAME_MAX: usize = 24;
pub const POST_TITLE_MIN: usize = 2;
pub const POST_TITLE_MAX: usize = 256;
pub const POST_CONTENT_MAX: usize = 4096;
pub const COMMENT_CONTENT_MIN: usize = 4;
pub const COMMENT_CONTENT_MAX: usize = 4096;
pub const PAGE_COUNT_MIN: i64 = 4;
pub const PAGE_COUNT_MAX: i64 = 50;
/// `findCommunity` never returns more than this many matches.
pub const COMMUNITY_FIND_LIMIT: i64 = 12;

/// Community names are lowercase slugs: 2..=24 chars of `[a-z0-9_]`.
pub fn community_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(COMMUNITY_NAME_MIN..=COMMUNITY_NAME_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "community name must be {COMMUNITY_NAME_MIN}-{COMMUNITY_NAME_MAX} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(AppError::ValidationError(
            "community name may only contain a-z, 0-9 and _".to_string(),
        ));
    }
    Ok(())
}

pub fn post_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if !(POST_TITLE_MIN..=POST_TITLE_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "title must be {POST_TITLE_MIN}-{POST_TITLE_MAX} characters"
        )));
    }
    Ok(())
}

pub fn post_content(content: &str) -> Result<()> {
    if content.chars().count() > POST_CONTENT_MAX {
        return Err(AppError::ValidationError(format!(
            "post content must be at most {POST_CONTENT_MAX} characters"
        )));
    }
    Ok(())
}

pub fn comment_content(content: &str) -> Result<()> {
    let len = content.chars().count();
    if !(COMMENT_CONTENT_MIN..=COMMENT_CONTENT_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "comment must be {COMMENT_CONTENT_MIN}-{COMMENT_CONTENT_MAX} characters"
        )));
    }
    Ok(())
}

pub fn page_count(count: i64) -> Result<()> {
    if !(PAGE_COUNT_MIN..=PAGE_COUNT_MAX).contains(&count) {
        return Err(AppError::ValidationError(format!(
            "count must be {PAGE_COUNT_MIN}-{PAGE_COUNT_MAX}"
        )));
    }
    Ok(())
}

/// Community rules, stored as a flat string sequence of even length and
/// interpreted as (title, content) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RuleList(Vec<String>);

impl RuleList {
    pub fn new() -> Self {
        RuleList(Vec::new())
    }

    /// Wraps an existing flat sequence, rejecting odd lengths.
    pub fn from_flat(entries: Vec<String>) -> Result<Self> {
        if entries.len() % 2 != 0 {
            return Err(AppError::ValidationError(
                "rules sequence must have even length".to_string(),
            ));
        }
        Ok(RuleList(entries))
    }

    pub fn len_pairs(&self) -> usize {
        self.0.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (title, content) view over the flat storage.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.chunks_exact(2).map(|c| (c[0].as_str(), c[1].as_str()))
    }

    /// Appends exactly two entries.
    pub fn add_rule(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.0.push(title.into());
        self.0.push(content.into());
    }

    /// Removes exactly the pair at (2i, 2i+1).
    pub fn remove_rule(&mut self, index: usize) -> Result<()> {
        let at = index * 2;
        if at + 1 >= self.0.len() {
            return Err(AppError::ValidationError(format!(
                "no rule at index {index}"
            )));
        }
        self.0.drain(at..at + 2);
        Ok(())
    }

    pub fn as_flat(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for RuleList {
    type Error = AppError;

    fn try_from(entries: Vec<String>) -> Result<Self> {
        RuleList::from_flat(entries)
    }
}

impl From<RuleList> for Vec<String> {
    fn from(rules: RuleList) -> Self {
        rules.0
    }
}
