//! RSS generation from the post snapshot.
//!
//! Rendering is a pure mapping from records to XML; [`generate_feed`] wraps it
//! with the synchronous read of the snapshot and the overwrite of the output
//! file. The document is fully rendered before anything is written, so a
//! failure never leaves partial output behind.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc2822;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::domain::error::SnapshotError;
use crate::domain::posts::{PostRecord, parse_snapshot};

const GENERATOR: &str = "fanblog";

/// Channel-level metadata and the fixed pieces of every item.
#[derive(Debug, Clone)]
pub struct FeedChannel {
    pub title: String,
    pub description: String,
    pub feed_url: String,
    pub site_url: String,
    pub language: String,
    /// Path segment between the site URL and a post slug.
    pub posts_segment: String,
    /// Text placed between a post title and its tag list.
    pub tag_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub pub_date: String,
}

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error("failed to read snapshot `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("failed to write feed `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a successful generation run.
#[derive(Debug, Clone)]
pub struct FeedReport {
    pub output: PathBuf,
    pub items: usize,
}

pub fn feed_item(record: &PostRecord, channel: &FeedChannel) -> FeedItem {
    FeedItem {
        title: record.title.clone(),
        description: format!(
            "{}{}{}",
            record.title,
            channel.tag_label,
            record.tags.join(", ")
        ),
        link: post_link(&channel.site_url, &channel.posts_segment, &record.slug),
        pub_date: item_pub_date(&record.date),
    }
}

/// `{site}/{segment}/{slug}`; the slug is used verbatim.
pub fn post_link(site_url: &str, segment: &str, slug: &str) -> String {
    let base = site_url.trim_end_matches('/');
    let segment = segment.trim_matches('/');
    if segment.is_empty() {
        format!("{base}/{slug}")
    } else {
        format!("{base}/{segment}/{slug}")
    }
}

/// RFC 2822 at midnight UTC when the date is `YYYY-MM-DD`, the raw string
/// otherwise.
fn item_pub_date(raw: &str) -> String {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .ok()
        .and_then(|date| date.midnight().assume_utc().format(&Rfc2822).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn rfc2822(moment: OffsetDateTime) -> String {
    moment
        .format(&Rfc2822)
        .unwrap_or_else(|_| moment.to_string())
}

pub fn render_item(item: &FeedItem) -> String {
    format!(
        "    <item>\n      <title>{}</title>\n      <description>{}</description>\n      <link>{}</link>\n      <guid isPermaLink=\"true\">{}</guid>\n      <pubDate>{}</pubDate>\n    </item>\n",
        cdata(&item.title),
        cdata(&item.description),
        xml_escape(&item.link),
        xml_escape(&item.link),
        xml_escape(&item.pub_date),
    )
}

/// Render an RSS 2.0 document for `records` in snapshot order.
pub fn render_rss(
    records: &[PostRecord],
    channel: &FeedChannel,
    generated_at: OffsetDateTime,
) -> String {
    let built = rfc2822(generated_at);

    let mut items = String::new();
    for record in records {
        items.push_str(&render_item(&feed_item(record, channel)));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:content=\"http://purl.org/rss/1.0/modules/content/\" xmlns:atom=\"http://www.w3.org/2005/Atom\" version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <description>{}</description>\n    <link>{}</link>\n    <generator>{}</generator>\n    <lastBuildDate>{}</lastBuildDate>\n    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n    <pubDate>{}</pubDate>\n    <language>{}</language>\n{}  </channel>\n</rss>\n",
        cdata(&channel.title),
        cdata(&channel.description),
        xml_escape(&channel.site_url),
        GENERATOR,
        built,
        xml_escape(&channel.feed_url),
        built,
        xml_escape(&channel.language),
        items,
    )
}

/// Read the snapshot, render the feed and overwrite `output`.
pub fn generate_feed(
    snapshot: &Path,
    output: &Path,
    channel: &FeedChannel,
    generated_at: OffsetDateTime,
) -> Result<FeedReport, SyndicationError> {
    let bytes = fs::read(snapshot).map_err(|source| SyndicationError::Read {
        path: snapshot.to_path_buf(),
        source,
    })?;
    let records = parse_snapshot(&bytes)?;
    debug!(snapshot = %snapshot.display(), posts = records.len(), "snapshot parsed");

    let xml = render_rss(&records, channel, generated_at);
    fs::write(output, xml).map_err(|source| SyndicationError::Write {
        path: output.to_path_buf(),
        source,
    })?;

    metrics::counter!("fanblog_feed_items_total").increment(records.len() as u64);
    info!(output = %output.display(), items = records.len(), "rss feed written");

    Ok(FeedReport {
        output: output.to_path_buf(),
        items: records.len(),
    })
}

fn cdata(input: &str) -> String {
    format!("<![CDATA[{}]]>", input.replace("]]>", "]]]]><![CDATA[>"))
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
pub(crate) fn test_channel() -> FeedChannel {
    FeedChannel {
        title: "Elky's Fan".to_string(),
        description: "Fan 블로그".to_string(),
        feed_url: "https://elky84.github.io/fan/rss.xml".to_string(),
        site_url: "https://elky84.github.io/fan".to_string(),
        language: "ko".to_string(),
        posts_segment: "posts".to_string(),
        tag_label: " - 태그: ".to_string(),
    }
}
