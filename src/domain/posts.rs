//! Post records as published in the JSON snapshot.
//!
//! Records are produced by the content pipeline and never mutated here; the
//! helpers below only derive read-only views (tag and year universes) from a
//! loaded snapshot.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::SnapshotError;

/// Number of leading `date` characters that form the year key.
pub const YEAR_PREFIX_LEN: usize = 4;

/// Metadata for a single blog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub slug: String,
    pub date: String,
}

impl PostRecord {
    /// Year key derived from the leading characters of `date`.
    ///
    /// A date shorter than four characters yields whatever prefix exists.
    pub fn year(&self) -> &str {
        match self.date.char_indices().nth(YEAR_PREFIX_LEN) {
            Some((end, _)) => &self.date[..end],
            None => &self.date,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    /// Relative path of the raw markdown body.
    pub fn content_path(&self) -> String {
        content_path(&self.slug)
    }
}

pub fn content_path(slug: &str) -> String {
    format!("posts/{slug}.md")
}

/// Decode a snapshot document whose top level is an array of records.
pub fn parse_snapshot(bytes: &[u8]) -> Result<Vec<PostRecord>, SnapshotError> {
    serde_json::from_slice(bytes).map_err(SnapshotError::from)
}

/// Distinct tags in first-seen order, excluding the site-wide sentinel.
pub fn all_tags(records: &[PostRecord], sentinel: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|record| record.tags.iter())
        .filter(|tag| tag.as_str() != sentinel)
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

/// Distinct year keys in first-seen order.
pub fn all_years(records: &[PostRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(PostRecord::year)
        .filter(|year| seen.insert(*year))
        .map(str::to_owned)
        .collect()
}

/// Slugs that appear on more than one record, in first-duplicate order.
pub fn duplicate_slugs(records: &[PostRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    records
        .iter()
        .map(|record| record.slug.as_str())
        .filter(|slug| !seen.insert(*slug) && reported.insert(*slug))
        .collect()
}

#[cfg(test)]
pub(crate) fn record(title: &str, tags: &[&str], date: &str) -> PostRecord {
    PostRecord {
        title: title.to_string(),
        summary: None,
        tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
        slug: title.to_lowercase().replace(' ', "-"),
        date: date.to_string(),
    }
}
