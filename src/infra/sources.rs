//! Filesystem and HTTP adapters for snapshots and raw post content.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::application::sources::{ContentSource, SnapshotSource, SourceError};
use crate::domain::posts::{PostRecord, content_path, parse_snapshot};

/// Parse `location` as an `http`/`https` URL, or `None` for a filesystem path.
pub fn http_location(location: &str) -> Option<Url> {
    Url::parse(location)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

pub fn snapshot_source(location: &str) -> Arc<dyn SnapshotSource> {
    match http_location(location) {
        Some(url) => Arc::new(HttpSnapshotSource::new(url)),
        None => Arc::new(FileSnapshotSource::new(location)),
    }
}

pub fn content_source(location: &str) -> Arc<dyn ContentSource> {
    match http_location(location) {
        Some(url) => Arc::new(HttpContentSource::new(url)),
        None => Arc::new(FileContentSource::new(location)),
    }
}

#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn load_snapshot(&self) -> Result<Vec<PostRecord>, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|err| SourceError::io(self.path.display().to_string(), err))?;
        Ok(parse_snapshot(&bytes)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    url: Url,
}

impl HttpSnapshotSource {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn load_snapshot(&self) -> Result<Vec<PostRecord>, SourceError> {
        let body = get_bytes(&self.client, &self.url).await?;
        Ok(parse_snapshot(&body)?)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Reads `{root}/posts/{slug}.md`.
#[derive(Debug, Clone)]
pub struct FileContentSource {
    root: PathBuf,
}

impl FileContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentSource for FileContentSource {
    async fn fetch_content(&self, slug: &str) -> Result<String, SourceError> {
        let path = self.root.join(content_path(slug));
        debug!(path = %path.display(), "reading post content");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| SourceError::io(path.display().to_string(), err))
    }
}

/// Fetches `{base}/posts/{slug}.md`.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    base: Url,
}

impl HttpContentSource {
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    fn content_url(&self, slug: &str) -> Result<Url, SourceError> {
        let raw = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            content_path(slug)
        );
        Url::parse(&raw).map_err(|err| SourceError::http(raw, err))
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_content(&self, slug: &str) -> Result<String, SourceError> {
        let url = self.content_url(slug)?;
        let body = get_bytes(&self.client, &url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

async fn get_bytes(client: &Client, url: &Url) -> Result<Vec<u8>, SourceError> {
    debug!(url = %url, "fetching");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| SourceError::http(url.as_str(), err))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            location: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| SourceError::http(url.as_str(), err))?;
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use httpmock::MockServer;
    use tempfile::TempDir;

    use super::*;

    const SNAPSHOT: &str = r#"[{"title":"Hello","tags":["x","fan"],"slug":"hello","date":"2024-01-01"}]"#;

    #[test]
    fn http_location_detects_scheme() {
        assert!(http_location("https://elky84.github.io/fan/postsData.json").is_some());
        assert!(http_location("http://localhost:3000").is_some());
        assert!(http_location("public/postsData.json").is_none());
        assert!(http_location("file:///tmp/postsData.json").is_none());
    }

    #[tokio::test]
    async fn file_snapshot_source_reads_records() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("postsData.json");
        fs::write(&path, SNAPSHOT).expect("write snapshot");

        let records = FileSnapshotSource::new(&path)
            .load_snapshot()
            .await
            .expect("snapshot loads");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slug, "hello");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = TempDir::new().expect("temp dir");
        let err = FileSnapshotSource::new(dir.path().join("absent.json"))
            .load_snapshot()
            .await
            .expect_err("missing snapshot");
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn malformed_file_is_snapshot_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("postsData.json");
        fs::write(&path, "{ not json").expect("write snapshot");
        let err = FileSnapshotSource::new(&path)
            .load_snapshot()
            .await
            .expect_err("malformed snapshot");
        assert!(matches!(err, SourceError::Snapshot(_)));
    }

    #[tokio::test]
    async fn file_content_source_reads_markdown_by_slug() {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir_all(dir.path().join("posts")).expect("posts dir");
        fs::write(dir.path().join("posts/hello.md"), "# Hello").expect("write post");

        let source = FileContentSource::new(dir.path());
        assert_eq!(
            source.fetch_content("hello").await.expect("content"),
            "# Hello"
        );
        assert!(source.fetch_content("absent").await.is_err());
    }

    #[tokio::test]
    async fn http_snapshot_source_fetches_and_parses() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/fan/postsData.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(SNAPSHOT);
            })
            .await;

        let url = Url::parse(&server.url("/fan/postsData.json")).expect("mock url");
        let records = HttpSnapshotSource::new(url)
            .load_snapshot()
            .await
            .expect("snapshot loads");
        assert_eq!(records[0].title, "Hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/postsData.json");
                then.status(404);
            })
            .await;

        let url = Url::parse(&server.url("/postsData.json")).expect("mock url");
        let err = HttpSnapshotSource::new(url)
            .load_snapshot()
            .await
            .expect_err("404 is an error");
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn http_content_source_builds_post_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/fan/posts/hello.md");
                then.status(200).body("# Hello");
            })
            .await;

        let base = Url::parse(&server.url("/fan/")).expect("mock url");
        let body = HttpContentSource::new(base)
            .fetch_content("hello")
            .await
            .expect("content");
        assert_eq!(body, "# Hello");
        mock.assert_async().await;
    }
}
