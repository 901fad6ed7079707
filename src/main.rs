use std::{path::Path, process};

use fanblog::{
    application::{
        browser::{LoadState, PostBrowser},
        error::AppError,
        syndication::{FeedChannel, generate_feed},
    },
    config,
    infra::{
        error::InfraError,
        sources::{content_source, http_location, snapshot_source},
        telemetry,
    },
    presentation::views::BrowserView,
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, causes = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, causes = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        None | Some(config::Command::Rss(_)) => run_rss(&settings),
        Some(config::Command::Browse(args)) => run_browse(&settings, args).await,
    }
}

fn run_rss(settings: &config::Settings) -> Result<(), AppError> {
    if http_location(&settings.paths.snapshot).is_some() {
        return Err(AppError::validation(
            "rss reads the snapshot from the filesystem; got a URL",
        ));
    }

    let channel = FeedChannel::from(&settings.site);
    let report = generate_feed(
        Path::new(&settings.paths.snapshot),
        &settings.paths.output,
        &channel,
        OffsetDateTime::now_utc(),
    )?;

    println!(
        "RSS feed generated: {} ({} items)",
        report.output.display(),
        report.items
    );
    Ok(())
}

async fn run_browse(
    settings: &config::Settings,
    args: config::BrowseArgs,
) -> Result<(), AppError> {
    let snapshot = snapshot_source(&settings.paths.snapshot);
    let content = content_source(&settings.paths.content);

    let mut browser =
        PostBrowser::new(args.mode, settings.site.sentinel_tag.clone()).with_content_source(content);

    if browser.load(snapshot.as_ref()).await == LoadState::Loaded {
        if let Some(query) = args.query.as_deref() {
            browser.apply_query(query);
        }
        for tag in &args.tags {
            if browser.knows_tag(tag) {
                browser.toggle_tag(tag);
            } else {
                warn!(tag = %tag, "tag not present in snapshot; ignoring");
            }
        }
        for year in &args.years {
            if browser.knows_year(year) {
                browser.toggle_year(year);
            } else {
                warn!(year = %year, "year not present in snapshot; ignoring");
            }
        }
    }

    if let Some(search) = args.search {
        browser.set_search(search);
    }

    for slug in &args.open {
        browser.select_post(slug);
    }

    println!("{}", BrowserView::from_browser(&browser));

    browser.settle().await;
    info!(visible = browser.visible().len(), "browse finished");
    Ok(())
}
