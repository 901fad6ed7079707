//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::syndication::FeedChannel;

pub use cli::{BrowseArgs, CliArgs, Command, LoggingOverrides, RssArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fanblog";
const ENV_PREFIX: &str = "FANBLOG";

const DEFAULT_SITE_TITLE: &str = "Elky's Fan";
const DEFAULT_SITE_DESCRIPTION: &str = "Fan 블로그";
const DEFAULT_SITE_URL: &str = "https://elky84.github.io/fan";
const DEFAULT_FEED_URL: &str = "https://elky84.github.io/fan/rss.xml";
const DEFAULT_LANGUAGE: &str = "ko";
const DEFAULT_POSTS_SEGMENT: &str = "posts";
const DEFAULT_TAG_LABEL: &str = " - 태그: ";
const DEFAULT_SENTINEL_TAG: &str = "fan";

const DEFAULT_SNAPSHOT_PATH: &str = "public/postsData.json";
const DEFAULT_OUTPUT_PATH: &str = "public/rss.xml";
const DEFAULT_CONTENT_ROOT: &str = "public";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteSettings,
    pub paths: PathSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
    pub site_url: String,
    pub feed_url: String,
    pub language: String,
    pub posts_segment: String,
    pub tag_label: String,
    /// Site-wide tag hidden from tag choices.
    pub sentinel_tag: String,
}

#[derive(Debug, Clone)]
pub struct PathSettings {
    /// Snapshot location; a filesystem path or an http(s) URL.
    pub snapshot: String,
    pub output: PathBuf,
    /// Site root holding `posts/{slug}.md`; a path or an http(s) URL.
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

impl From<&SiteSettings> for FeedChannel {
    fn from(site: &SiteSettings) -> Self {
        Self {
            title: site.title.clone(),
            description: site.description.clone(),
            feed_url: site.feed_url.clone(),
            site_url: site.site_url.clone(),
            language: site.language.clone(),
            posts_segment: site.posts_segment.clone(),
            tag_label: site.tag_label.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_logging_overrides(&cli.logging);
    match cli.command.as_ref() {
        Some(Command::Rss(args)) => raw.apply_rss_overrides(args),
        Some(Command::Browse(args)) => raw.apply_browse_overrides(args),
        None => raw.apply_rss_overrides(&RssArgs::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    site: RawSiteSettings,
    paths: RawPathSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_rss_overrides(&mut self, overrides: &RssArgs) {
        if let Some(path) = overrides.snapshot.as_ref() {
            self.paths.snapshot = Some(path.display().to_string());
        }
        if let Some(path) = overrides.output.as_ref() {
            self.paths.output = Some(path.clone());
        }
    }

    fn apply_browse_overrides(&mut self, overrides: &BrowseArgs) {
        if let Some(location) = overrides.snapshot.as_ref() {
            self.paths.snapshot = Some(location.clone());
        }
        if let Some(location) = overrides.content.as_ref() {
            self.paths.content = Some(location.clone());
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    description: Option<String>,
    site_url: Option<String>,
    feed_url: Option<String>,
    language: Option<String>,
    posts_segment: Option<String>,
    tag_label: Option<String>,
    sentinel_tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPathSettings {
    snapshot: Option<String>,
    output: Option<PathBuf>,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            site,
            paths,
            logging,
        } = raw;

        let site = build_site_settings(site)?;
        let paths = build_path_settings(paths)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            site,
            paths,
            logging,
        })
    }
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let title = non_empty(site.title, DEFAULT_SITE_TITLE, "site.title")?;
    let description = site
        .description
        .unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string());
    let site_url = absolute_url(site.site_url, DEFAULT_SITE_URL, "site.site_url")?;
    let feed_url = absolute_url(site.feed_url, DEFAULT_FEED_URL, "site.feed_url")?;
    let language = non_empty(site.language, DEFAULT_LANGUAGE, "site.language")?;

    let posts_segment = site
        .posts_segment
        .unwrap_or_else(|| DEFAULT_POSTS_SEGMENT.to_string())
        .trim_matches('/')
        .to_string();
    if posts_segment.contains('/') || posts_segment.contains('?') || posts_segment.contains('#') {
        return Err(LoadError::invalid(
            "site.posts_segment",
            "must be a single path segment",
        ));
    }

    let tag_label = site
        .tag_label
        .unwrap_or_else(|| DEFAULT_TAG_LABEL.to_string());
    let sentinel_tag = site
        .sentinel_tag
        .unwrap_or_else(|| DEFAULT_SENTINEL_TAG.to_string());

    Ok(SiteSettings {
        title,
        description,
        site_url,
        feed_url,
        language,
        posts_segment,
        tag_label,
        sentinel_tag,
    })
}

fn build_path_settings(paths: RawPathSettings) -> Result<PathSettings, LoadError> {
    let snapshot = non_empty(paths.snapshot, DEFAULT_SNAPSHOT_PATH, "paths.snapshot")?;
    let content = non_empty(paths.content, DEFAULT_CONTENT_ROOT, "paths.content")?;

    let output = paths
        .output
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
    if output.as_os_str().is_empty() {
        return Err(LoadError::invalid("paths.output", "path must not be empty"));
    }

    Ok(PathSettings {
        snapshot,
        output,
        content,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_empty(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn absolute_url(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = non_empty(value, default, key)?;
    let url = Url::parse(&value).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    Ok(value)
}
