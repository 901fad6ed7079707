use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::filter::ViewMode;

/// Command-line arguments for the fanblog binary.
#[derive(Debug, Parser)]
#[command(
    name = "fanblog",
    version,
    about = "Post browser and RSS generator for the Fan blog"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FANBLOG_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate the RSS feed from the post snapshot (default).
    Rss(RssArgs),
    /// Filter and search the post snapshot from the terminal.
    Browse(BrowseArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RssArgs {
    /// Override the snapshot path.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,

    /// Override the feed output path.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BrowseArgs {
    /// Snapshot path or http(s) URL.
    #[arg(long, value_name = "LOCATION")]
    pub snapshot: Option<String>,

    /// Site root (path or http(s) URL) holding `posts/{slug}.md`.
    #[arg(long, value_name = "LOCATION")]
    pub content: Option<String>,

    /// Filtering mode shown next to search.
    #[arg(long, value_enum, default_value_t = ViewMode::Tag)]
    pub mode: ViewMode,

    /// Shared-link query string to restore, e.g. `tags=rust&years=2024`.
    #[arg(long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Toggle a tag after restoring the query. Repeatable.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Toggle a year after restoring the query. Repeatable.
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<String>,

    /// Search text; `|` separates terms that must all match.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Fetch the raw content of a post by slug. Repeatable.
    #[arg(long = "open", value_name = "SLUG")]
    pub open: Vec<String>,
}
