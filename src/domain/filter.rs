//! Filter state and the pure visibility predicate for the post browser.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::posts::PostRecord;

/// Separator between independent search terms.
pub const SEARCH_TERM_SEPARATOR: char = '|';

/// Which criterion the browser exposes alongside free-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Tag,
    Year,
}

impl ViewMode {
    /// Plural noun used in empty-state copy.
    pub fn noun(self) -> &'static str {
        match self {
            ViewMode::Tag => "tags",
            ViewMode::Year => "years",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Tag => f.write_str("tag"),
            ViewMode::Year => f.write_str("year"),
        }
    }
}

/// The user's current selections. Ephemeral per view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub selected_tags: BTreeSet<String>,
    pub selected_years: BTreeSet<String>,
    pub search_query: String,
}

impl FilterState {
    /// Default state for a freshly loaded snapshot: every year selected.
    pub fn with_years<I, S>(years: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected_years: years.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        toggle(&mut self.selected_tags, tag);
    }

    pub fn toggle_year(&mut self, year: &str) {
        toggle(&mut self.selected_years, year);
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn is_tag_selected(&self, tag: &str) -> bool {
        self.selected_tags.contains(tag)
    }

    pub fn is_year_selected(&self, year: &str) -> bool {
        self.selected_years.contains(year)
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

/// Split a query on `|`, trimming and lowercasing each term.
///
/// An empty query produces a single empty term, which matches everything.
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .split(SEARCH_TERM_SEPARATOR)
        .map(|term| term.trim().to_lowercase())
        .collect()
}

fn matches_tags(record: &PostRecord, state: &FilterState) -> bool {
    state.selected_tags.iter().all(|tag| record.has_tag(tag))
}

fn matches_year(record: &PostRecord, state: &FilterState) -> bool {
    state.selected_years.contains(record.year())
}

fn matches_search(record: &PostRecord, terms: &[String]) -> bool {
    let title = record.title.to_lowercase();
    let summary = record.summary_text().to_lowercase();
    terms
        .iter()
        .all(|term| title.contains(term.as_str()) || summary.contains(term.as_str()))
}

/// Whether a single record satisfies every active criterion.
pub fn matches(record: &PostRecord, state: &FilterState, mode: ViewMode) -> bool {
    let terms = search_terms(&state.search_query);
    matches_with_terms(record, state, mode, &terms)
}

fn matches_with_terms(
    record: &PostRecord,
    state: &FilterState,
    mode: ViewMode,
    terms: &[String],
) -> bool {
    let criterion = match mode {
        ViewMode::Tag => matches_tags(record, state),
        ViewMode::Year => matches_year(record, state),
    };
    criterion && matches_search(record, terms)
}

/// Records visible under `state`, in snapshot order.
pub fn compute_visible<'a>(
    records: &'a [PostRecord],
    state: &FilterState,
    mode: ViewMode,
) -> Vec<&'a PostRecord> {
    let terms = search_terms(&state.search_query);
    records
        .iter()
        .filter(|record| matches_with_terms(record, state, mode, &terms))
        .collect()
}
