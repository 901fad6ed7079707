//! Plain-text view models for the post browser.

use std::fmt;

use crate::application::browser::PostBrowser;
use crate::domain::filter::ViewMode;
use crate::domain::posts::PostRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagBadge {
    pub label: String,
    pub is_active: bool,
}

/// A selectable tag or year shown above the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterChip {
    pub label: String,
    pub is_active: bool,
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub slug: String,
    pub heading: String,
    pub summary: String,
    pub badges: Vec<TagBadge>,
}

#[derive(Clone, Debug)]
pub struct BrowserView {
    pub mode: ViewMode,
    pub search: String,
    pub chips: Vec<FilterChip>,
    pub cards: Vec<PostCard>,
    pub empty_message: String,
    pub location: String,
}

impl BrowserView {
    pub fn from_browser(browser: &PostBrowser) -> Self {
        let filter = browser.filter();
        let mode = browser.mode();

        let chips = match mode {
            ViewMode::Tag => browser
                .all_tags()
                .iter()
                .map(|tag| FilterChip {
                    label: tag.clone(),
                    is_active: filter.is_tag_selected(tag),
                })
                .collect(),
            ViewMode::Year => browser
                .years()
                .iter()
                .map(|year| FilterChip {
                    label: year.clone(),
                    is_active: filter.is_year_selected(year),
                })
                .collect(),
        };

        let cards = browser
            .visible()
            .into_iter()
            .map(|record| post_card(record, browser))
            .collect();

        Self {
            mode,
            search: filter.search_query.clone(),
            chips,
            cards,
            empty_message: browser.empty_message(),
            location: browser.location().to_string(),
        }
    }
}

fn post_card(record: &PostRecord, browser: &PostBrowser) -> PostCard {
    let tag_mode = browser.mode() == ViewMode::Tag;
    PostCard {
        slug: record.slug.clone(),
        heading: format!("{} - {}", record.title, record.date),
        summary: record.summary_text().to_string(),
        badges: record
            .tags
            .iter()
            .map(|tag| TagBadge {
                label: format!("#{tag}"),
                is_active: tag_mode && browser.filter().is_tag_selected(tag),
            })
            .collect(),
    }
}

fn chip_label(label: &str, is_active: bool) -> String {
    if is_active {
        format!("[{label}]")
    } else {
        label.to_string()
    }
}

impl fmt::Display for BrowserView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search: {}", self.search)?;

        let chips: Vec<String> = self
            .chips
            .iter()
            .map(|chip| chip_label(&chip.label, chip.is_active))
            .collect();
        let heading = match self.mode {
            ViewMode::Tag => "Tags",
            ViewMode::Year => "Years",
        };
        writeln!(f, "{heading}: {}", chips.join(" "))?;
        writeln!(f)?;

        if self.cards.is_empty() {
            writeln!(f, "{}", self.empty_message)?;
        }
        for card in &self.cards {
            writeln!(f, "{}", card.heading)?;
            if !card.summary.is_empty() {
                writeln!(f, "  {}", card.summary)?;
            }
            if !card.badges.is_empty() {
                let badges: Vec<String> = card
                    .badges
                    .iter()
                    .map(|badge| chip_label(&badge.label, badge.is_active))
                    .collect();
                writeln!(f, "  {}", badges.join(" "))?;
            }
        }

        writeln!(f)?;
        if self.location.is_empty() {
            write!(f, "Location: (cleared)")
        } else {
            write!(f, "Location: ?{}", self.location)
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::sources::{SnapshotSource, SourceError};
    use crate::domain::posts::record;

    struct Fixture;

    #[async_trait]
    impl SnapshotSource for Fixture {
        async fn load_snapshot(&self) -> Result<Vec<PostRecord>, SourceError> {
            let mut first = record("A", &["x", "fan"], "2023-05-01");
            first.summary = Some("first post".to_string());
            Ok(vec![first, record("B", &["y"], "2022-01-01")])
        }

        fn describe(&self) -> String {
            "fixture".to_string()
        }
    }

    async fn browser(mode: ViewMode) -> PostBrowser {
        let mut browser = PostBrowser::new(mode, "fan");
        browser.load(&Fixture).await;
        browser
    }

    #[tokio::test]
    async fn tag_view_marks_selected_chips_and_badges() {
        let mut browser = browser(ViewMode::Tag).await;
        browser.toggle_tag("x");
        let view = BrowserView::from_browser(&browser);

        assert_eq!(
            view.chips,
            vec![
                FilterChip {
                    label: "x".to_string(),
                    is_active: true
                },
                FilterChip {
                    label: "y".to_string(),
                    is_active: false
                },
            ]
        );
        assert_eq!(view.cards.len(), 1);
        assert_eq!(view.cards[0].heading, "A - 2023-05-01");
        assert_eq!(view.cards[0].badges.len(), 2);
        assert!(view.cards[0].badges[0].is_active);
        assert_eq!(view.cards[0].badges[1].label, "#fan");
    }

    #[tokio::test]
    async fn year_view_renders_text() {
        let mut browser = browser(ViewMode::Year).await;
        browser.toggle_year("2022");
        let text = BrowserView::from_browser(&browser).to_string();

        let expected = "Search: \n\
                        Years: [2023] 2022\n\
                        \n\
                        A - 2023-05-01\n  first post\n  #x #fan\n\
                        \n\
                        Location: ?years=2023";
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn empty_view_shows_mode_message() {
        let mut browser = browser(ViewMode::Tag).await;
        browser.set_search("nothing matches this");
        let text = BrowserView::from_browser(&browser).to_string();
        assert!(text.contains("No posts match the selected tags."));
        assert!(text.ends_with("Location: ?years=2022&years=2023"));
    }
}
