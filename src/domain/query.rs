//! Query-string representation of tag and year selections.
//!
//! Serialization is pure: applying the result to a live address bar is the
//! caller's concern. Search text is never encoded.

use std::collections::BTreeSet;

use url::form_urlencoded;

use super::filter::FilterState;

pub const TAGS_PARAM: &str = "tags";
pub const YEARS_PARAM: &str = "years";

/// Canonical `tags=..&years=..` string, or empty when nothing is selected.
pub fn to_query_string(state: &FilterState) -> String {
    selection_query(&state.selected_tags, &state.selected_years)
}

pub fn selection_query(tags: &BTreeSet<String>, years: &BTreeSet<String>) -> String {
    if tags.is_empty() && years.is_empty() {
        return String::new();
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for tag in tags {
        serializer.append_pair(TAGS_PARAM, tag);
    }
    for year in years {
        serializer.append_pair(YEARS_PARAM, year);
    }
    serializer.finish()
}

/// Selections decoded from a shared link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelection {
    pub tags: BTreeSet<String>,
    pub years: BTreeSet<String>,
    /// Whether any `years` key was present. Without one the default
    /// "all years" selection applies.
    pub years_present: bool,
}

impl QuerySelection {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut selection = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                TAGS_PARAM => {
                    selection.tags.insert(value.into_owned());
                }
                YEARS_PARAM => {
                    selection.years_present = true;
                    selection.years.insert(value.into_owned());
                }
                _ => {}
            }
        }
        selection
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && !self.years_present
    }
}

impl FilterState {
    /// Rebuild selections from a shared link.
    ///
    /// Tags are kept when `known_tag` accepts them and years when they were
    /// observed in the snapshot. The search text is left untouched.
    pub fn restore(
        &mut self,
        selection: &QuerySelection,
        known_tag: impl Fn(&str) -> bool,
        years: &[String],
    ) {
        self.selected_tags = selection
            .tags
            .iter()
            .filter(|tag| known_tag(tag))
            .cloned()
            .collect();

        self.selected_years = if selection.years_present {
            selection
                .years
                .iter()
                .filter(|year| years.contains(*year))
                .cloned()
                .collect()
        } else {
            years.iter().cloned().collect()
        };
    }
}
