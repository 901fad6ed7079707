//! Interactive post browser over a loaded snapshot.
//!
//! The browser owns the records, the derived tag and year universes, the
//! user's [`FilterState`] and the query string currently shown in the address
//! bar. Visibility is always recomputed from scratch through
//! [`compute_visible`], so there is no cached view to invalidate.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::application::sources::{ContentSource, SnapshotSource};
use crate::domain::filter::{FilterState, ViewMode, compute_visible};
use crate::domain::posts::{PostRecord, all_tags, all_years, duplicate_slugs};
use crate::domain::query::{QuerySelection, to_query_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    /// Terminal: the browser stays empty and never retries.
    Failed,
}

pub struct PostBrowser {
    mode: ViewMode,
    sentinel_tag: String,
    records: Vec<PostRecord>,
    all_tags: Vec<String>,
    years: Vec<String>,
    filter: FilterState,
    location: String,
    load_state: LoadState,
    pending_query: Option<String>,
    content: Option<Arc<dyn ContentSource>>,
    fetches: JoinSet<()>,
}

impl PostBrowser {
    pub fn new(mode: ViewMode, sentinel_tag: impl Into<String>) -> Self {
        Self {
            mode,
            sentinel_tag: sentinel_tag.into(),
            records: Vec::new(),
            all_tags: Vec::new(),
            years: Vec::new(),
            filter: FilterState::default(),
            location: String::new(),
            load_state: LoadState::Pending,
            pending_query: None,
            content: None,
            fetches: JoinSet::new(),
        }
    }

    pub fn with_content_source(mut self, content: Arc<dyn ContentSource>) -> Self {
        self.content = Some(content);
        self
    }

    /// Load the snapshot once. Failures are logged and leave the browser
    /// permanently empty.
    pub async fn load(&mut self, source: &dyn SnapshotSource) -> LoadState {
        if self.load_state != LoadState::Pending {
            return self.load_state;
        }

        match source.load_snapshot().await {
            Ok(records) => {
                for slug in duplicate_slugs(&records) {
                    warn!(slug, "duplicate slug in post snapshot");
                }
                self.all_tags = all_tags(&records, &self.sentinel_tag);
                self.years = all_years(&records);
                self.filter.selected_years = self.years.iter().cloned().collect();
                self.records = records;
                self.load_state = LoadState::Loaded;
                info!(
                    source = %source.describe(),
                    posts = self.records.len(),
                    tags = self.all_tags.len(),
                    years = self.years.len(),
                    "post snapshot loaded"
                );
                if let Some(query) = self.pending_query.take() {
                    self.apply_query(&query);
                }
            }
            Err(err) => {
                metrics::counter!("fanblog_snapshot_load_failures_total").increment(1);
                error!(source = %source.describe(), error = %err, "failed to load post snapshot");
                self.load_state = LoadState::Failed;
                self.pending_query = None;
            }
        }

        self.load_state
    }

    /// Restore tag and year selections from a shared link.
    ///
    /// Before the snapshot loads the link is held back and applied once the
    /// universes are known. After a failed load it is ignored.
    pub fn apply_query(&mut self, query: &str) {
        match self.load_state {
            LoadState::Pending => {
                self.pending_query = Some(query.to_string());
                return;
            }
            LoadState::Failed => {
                debug!(query, "snapshot unavailable; ignoring shared link");
                return;
            }
            LoadState::Loaded => {}
        }

        let selection = QuerySelection::parse(query);
        if selection.is_empty() {
            return;
        }
        // Same acceptance rule as the toggles: any tag carried by a record.
        let records = &self.records;
        self.filter.restore(
            &selection,
            |tag| records.iter().any(|record| record.has_tag(tag)),
            &self.years,
        );
        self.sync_location();
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        self.filter.toggle_tag(tag);
        self.sync_location();
    }

    pub fn toggle_year(&mut self, year: &str) {
        self.filter.toggle_year(year);
        self.sync_location();
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.filter.set_search(query);
        self.sync_location();
    }

    fn sync_location(&mut self) {
        self.location = to_query_string(&self.filter);
        debug!(location = %self.location, "filter location updated");
    }

    pub fn visible(&self) -> Vec<&PostRecord> {
        compute_visible(&self.records, &self.filter, self.mode)
    }

    /// Start a best-effort fetch of a post's raw body.
    ///
    /// The fetch is owned by the browser and aborted when it is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn select_post(&mut self, slug: &str) {
        let Some(content) = self.content.clone() else {
            debug!(slug, "no content source configured; skipping fetch");
            return;
        };

        self.reap_finished_fetches();
        let slug = slug.to_string();
        self.fetches.spawn(async move {
            match content.fetch_content(&slug).await {
                Ok(markdown) => debug!(slug = %slug, content = %markdown, "fetched post content"),
                Err(err) => {
                    metrics::counter!("fanblog_content_fetch_failures_total").increment(1);
                    warn!(slug = %slug, error = %err, "failed to fetch post content");
                }
            }
        });
    }

    fn reap_finished_fetches(&mut self) {
        while let Some(result) = self.fetches.try_join_next() {
            log_fetch_exit(result);
        }
    }

    /// Wait for every outstanding content fetch to finish.
    pub async fn settle(&mut self) {
        while let Some(result) = self.fetches.join_next().await {
            log_fetch_exit(result);
        }
    }

    pub fn fetches_in_flight(&self) -> usize {
        self.fetches.len()
    }

    /// Whether any record carries `tag`, the sentinel included.
    pub fn knows_tag(&self, tag: &str) -> bool {
        self.records.iter().any(|record| record.has_tag(tag))
    }

    pub fn knows_year(&self, year: &str) -> bool {
        self.years.iter().any(|candidate| candidate == year)
    }

    pub fn empty_message(&self) -> String {
        format!("No posts match the selected {}.", self.mode.noun())
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    pub fn all_tags(&self) -> &[String] {
        &self.all_tags
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Query string currently mirrored into the address bar; empty when
    /// cleared.
    pub fn location(&self) -> &str {
        &self.location
    }
}

fn log_fetch_exit(result: Result<(), JoinError>) {
    if let Err(err) = result {
        warn!(error = %err, "content fetch task ended abnormally");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::application::sources::SourceError;
    use crate::domain::posts::record;

    struct StaticSnapshot {
        records: Vec<PostRecord>,
        calls: AtomicUsize,
    }

    impl StaticSnapshot {
        fn new(records: Vec<PostRecord>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for StaticSnapshot {
        async fn load_snapshot(&self) -> Result<Vec<PostRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    struct BrokenSnapshot {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for BrokenSnapshot {
        async fn load_snapshot(&self) -> Result<Vec<PostRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::io(
                "postsData.json",
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            ))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingContent {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentSource for RecordingContent {
        async fn fetch_content(&self, slug: &str) -> Result<String, SourceError> {
            self.fetched
                .lock()
                .expect("fetch log poisoned")
                .push(slug.to_string());
            if slug == "missing" {
                return Err(SourceError::Status {
                    location: format!("/posts/{slug}.md"),
                    status: 404,
                });
            }
            Ok(format!("# {slug}"))
        }
    }

    struct DropSignal(Option<oneshot::Sender<()>>);

    impl Drop for DropSignal {
        fn drop(&mut self) {
            if let Some(tx) = self.0.take() {
                let _ = tx.send(());
            }
        }
    }

    struct HangingContent {
        signal: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl ContentSource for HangingContent {
        async fn fetch_content(&self, _slug: &str) -> Result<String, SourceError> {
            let _guard = DropSignal(self.signal.lock().expect("signal poisoned").take());
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    fn scenario() -> Vec<PostRecord> {
        vec![
            record("A", &["x", "fan"], "2023-05-01"),
            record("B", &["y"], "2022-01-01"),
        ]
    }

    fn titles(browser: &PostBrowser) -> Vec<String> {
        browser
            .visible()
            .iter()
            .map(|record| record.title.clone())
            .collect()
    }

    async fn loaded(mode: ViewMode) -> PostBrowser {
        let mut browser = PostBrowser::new(mode, "fan");
        browser.load(&StaticSnapshot::new(scenario())).await;
        browser
    }

    #[tokio::test]
    async fn empty_until_snapshot_loads() {
        let browser = PostBrowser::new(ViewMode::Tag, "fan");
        assert_eq!(browser.load_state(), LoadState::Pending);
        assert!(browser.visible().is_empty());
        assert!(browser.all_tags().is_empty());
        assert!(browser.years().is_empty());
    }

    #[tokio::test]
    async fn load_derives_universes_and_defaults_years() {
        let browser = loaded(ViewMode::Year).await;
        assert_eq!(browser.load_state(), LoadState::Loaded);
        assert_eq!(browser.all_tags(), ["x", "y"]);
        assert_eq!(browser.years(), ["2023", "2022"]);
        assert_eq!(browser.filter().selected_years.len(), 2);
        assert_eq!(titles(&browser), vec!["A", "B"]);
        assert_eq!(browser.location(), "");
    }

    #[tokio::test]
    async fn load_runs_once() {
        let source = StaticSnapshot::new(scenario());
        let mut browser = PostBrowser::new(ViewMode::Tag, "fan");
        browser.load(&source).await;
        browser.load(&source).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_permanent() {
        let source = BrokenSnapshot {
            calls: AtomicUsize::new(0),
        };
        let mut browser = PostBrowser::new(ViewMode::Tag, "fan");
        assert_eq!(browser.load(&source).await, LoadState::Failed);
        assert_eq!(browser.load(&source).await, LoadState::Failed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(browser.visible().is_empty());
        assert_eq!(browser.empty_message(), "No posts match the selected tags.");
    }

    #[tokio::test]
    async fn tag_toggle_filters_and_syncs_location() {
        let mut browser = loaded(ViewMode::Tag).await;
        browser.toggle_tag("x");
        assert_eq!(titles(&browser), vec!["A"]);
        assert_eq!(browser.location(), "tags=x&years=2022&years=2023");
    }

    #[tokio::test]
    async fn double_toggle_location_reflects_final_state() {
        let mut browser = loaded(ViewMode::Tag).await;
        browser.toggle_tag("x");
        browser.toggle_tag("x");
        assert!(browser.filter().selected_tags.is_empty());
        assert_eq!(browser.location(), "years=2022&years=2023");
    }

    #[tokio::test]
    async fn deselecting_year_narrows_year_view() {
        let mut browser = loaded(ViewMode::Year).await;
        browser.toggle_year("2022");
        assert_eq!(titles(&browser), vec!["A"]);
        assert_eq!(browser.location(), "years=2023");
        browser.toggle_year("2023");
        assert!(browser.visible().is_empty());
        assert_eq!(browser.location(), "");
        assert_eq!(browser.empty_message(), "No posts match the selected years.");
    }

    #[tokio::test]
    async fn search_updates_filter_but_not_query_contents() {
        let mut browser = loaded(ViewMode::Tag).await;
        browser.set_search(" b ");
        assert_eq!(titles(&browser), vec!["B"]);
        assert_eq!(browser.location(), "years=2022&years=2023");
    }

    #[tokio::test]
    async fn apply_query_restores_shared_link() {
        let mut browser = loaded(ViewMode::Year).await;
        browser.apply_query("?years=2022&tags=y");
        assert_eq!(titles(&browser), vec!["B"]);
        assert!(browser.filter().is_tag_selected("y"));
        assert_eq!(browser.location(), "tags=y&years=2022");
    }

    #[tokio::test]
    async fn own_location_with_sentinel_tag_restores_same_view() {
        let mut original = loaded(ViewMode::Tag).await;
        original.toggle_tag("fan");
        assert_eq!(titles(&original), vec!["A"]);

        let mut restored = loaded(ViewMode::Tag).await;
        restored.apply_query(original.location());
        assert_eq!(restored.location(), original.location());
        assert_eq!(titles(&restored), titles(&original));
    }

    #[tokio::test]
    async fn shared_link_given_before_load_applies_after_load() {
        let mut browser = PostBrowser::new(ViewMode::Tag, "fan");
        browser.apply_query("tags=y");
        assert_eq!(browser.location(), "");

        browser.load(&StaticSnapshot::new(scenario())).await;
        assert_eq!(titles(&browser), vec!["B"]);
        assert_eq!(browser.location(), "tags=y&years=2022&years=2023");
    }

    #[tokio::test]
    async fn shared_link_after_failed_load_is_ignored() {
        let mut browser = PostBrowser::new(ViewMode::Tag, "fan");
        browser.apply_query("tags=y");
        let source = BrokenSnapshot {
            calls: AtomicUsize::new(0),
        };
        browser.load(&source).await;
        browser.apply_query("tags=y");
        assert!(browser.filter().selected_tags.is_empty());
        assert_eq!(browser.location(), "");
    }

    #[tokio::test]
    async fn empty_query_keeps_defaults() {
        let mut browser = loaded(ViewMode::Year).await;
        browser.apply_query("");
        assert_eq!(browser.filter().selected_years.len(), 2);
        assert_eq!(browser.location(), "");
    }

    #[tokio::test]
    async fn select_post_fetches_without_touching_visible_set() {
        let content = Arc::new(RecordingContent::default());
        let mut browser = loaded(ViewMode::Tag).await.with_content_source(content.clone());
        browser.toggle_tag("x");
        browser.select_post("a");
        browser.select_post("missing");
        browser.settle().await;
        assert_eq!(browser.fetches_in_flight(), 0);
        let mut fetched = content.fetched.lock().expect("fetch log poisoned").clone();
        fetched.sort();
        assert_eq!(fetched, vec!["a", "missing"]);
        assert_eq!(titles(&browser), vec!["A"]);
    }

    #[tokio::test]
    async fn finished_fetches_are_reaped_before_spawning() {
        let content = Arc::new(RecordingContent::default());
        let mut browser = loaded(ViewMode::Tag).await.with_content_source(content.clone());
        browser.select_post("a");
        browser.select_post("b");
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(content.fetched.lock().expect("fetch log poisoned").len(), 2);

        browser.select_post("c");
        assert_eq!(browser.fetches_in_flight(), 1);
        browser.settle().await;
    }

    #[tokio::test]
    async fn knows_sentinel_tag_but_does_not_offer_it() {
        let browser = loaded(ViewMode::Tag).await;
        assert!(browser.knows_tag("fan"));
        assert!(!browser.all_tags().iter().any(|tag| tag == "fan"));
        assert!(!browser.knows_tag("zzz"));
        assert!(browser.knows_year("2022"));
        assert!(!browser.knows_year("1999"));
    }

    #[tokio::test]
    async fn select_post_without_content_source_is_noop() {
        let mut browser = loaded(ViewMode::Tag).await;
        browser.select_post("a");
        assert_eq!(browser.fetches_in_flight(), 0);
    }

    #[tokio::test]
    async fn dropping_browser_aborts_outstanding_fetches() {
        let (tx, rx) = oneshot::channel();
        let content = Arc::new(HangingContent {
            signal: Mutex::new(Some(tx)),
        });
        let mut browser = loaded(ViewMode::Tag).await.with_content_source(content);
        browser.select_post("a");
        assert_eq!(browser.fetches_in_flight(), 1);
        tokio::task::yield_now().await;
        drop(browser);
        // Resolves once the aborted fetch future has been dropped.
        let _ = rx.await;
    }
}
