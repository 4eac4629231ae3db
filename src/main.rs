//! # Article Ingest
//!
//! Collects news articles from a list of URLs into a local store, each URL
//! at most once.
//!
//! ## Features
//!
//! - Fetches every page with a per-run identity (random user agent) and a
//!   per-request timeout
//! - Renders pages in headless Chrome over WebDriver so client-side content
//!   is present, or parses the raw HTML when `--renderer static` is given
//! - Extracts the `<article>` body, a title (`<title>`/`<h1>` cascade) and a
//!   publication date written in English, Polish, German, French or Spanish
//! - Stores records in a JSON file keyed by URL; re-running a list only
//!   processes what is new
//!
//! ## Usage
//!
//! ```sh
//! article_ingest scrape --urls urls.txt
//! article_ingest list --source example.com
//! article_ingest show 1
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture, one URL at a time:
//! 1. **Dedup**: Skip URLs the store already holds
//! 2. **Fetching**: Download the page (`article_ingest::fetch`)
//! 3. **Rendering**: Produce the final DOM (`article_ingest::render`)
//! 4. **Extraction**: Pull out title, content and date (`article_ingest::extract`)
//! 5. **Storage**: Persist the record (`article_ingest::store`)
//!
//! A failure at any stage is reported for that URL and the batch moves on.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use article_ingest::config::Settings;
use article_ingest::fetch::Session;
use article_ingest::ingest::{IngestOptions, Ingestor};
use article_ingest::listing;
use article_ingest::models::RecordId;
use article_ingest::render::{Renderer, StaticRenderer, WebDriverRenderer};
use article_ingest::store::JsonFileStore;
use article_ingest::utils::read_url_list;
use cli::{Cli, Command, RendererKind, ScrapeArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match args.command {
        Command::Scrape(scrape) => run_scrape(&args.store, settings, scrape).await?,
        Command::List { source } => {
            let store = JsonFileStore::open(&args.store)?;
            let views = listing::filter_by_source(&store, source.as_deref())?;
            info!(count = views.len(), "Listing articles");
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        Command::Show { id } => {
            let store = JsonFileStore::open(&args.store)?;
            match listing::find_by_id(&store, RecordId(id))? {
                Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
                None => {
                    let missing = listing::NotFound(RecordId(id));
                    error!(id, "Article not found");
                    eprintln!("{missing}");
                    std::process::exit(1);
                }
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Ingest every URL listed in `scrape.urls` into the store at `store_path`.
#[instrument(level = "info", skip_all, fields(urls = %scrape.urls.display()))]
async fn run_scrape(
    store_path: &std::path::Path,
    mut settings: Settings,
    scrape: ScrapeArgs,
) -> Result<(), Box<dyn Error>> {
    // Flags win over the settings file.
    if let Some(url) = scrape.webdriver_url {
        settings.render.webdriver_url = url;
    }
    if let Some(ms) = scrape.fetch_timeout_ms {
        settings.fetch.timeout_ms = ms;
    }
    if let Some(ms) = scrape.render_sleep_ms {
        settings.render.sleep_ms = ms;
    }
    if let Some(ms) = scrape.render_timeout_ms {
        settings.render.timeout_ms = ms;
    }

    let urls = read_url_list(&scrape.urls).await?;
    let store = JsonFileStore::open(store_path)?;
    let session = Session::new(&settings.fetch)?;
    info!(user_agent = %session.user_agent(), "Fetch session ready");

    let renderer = match scrape.renderer {
        RendererKind::Webdriver => {
            let renderer = WebDriverRenderer::new(&session, &settings.render);
            info!(endpoint = %renderer.endpoint(), "Rendering through WebDriver");
            debug!(capabilities = ?renderer.capabilities(), "Browser capabilities");
            Renderer::WebDriver(renderer)
        }
        RendererKind::Static => Renderer::Static(StaticRenderer),
    };
    let options = IngestOptions {
        prefer_h1: scrape.title_h1,
        title_strict: scrape.title_strict,
        fetch_timeout: Duration::from_millis(settings.fetch.timeout_ms),
        render_sleep: Duration::from_millis(settings.render.sleep_ms),
        render_timeout: Duration::from_millis(settings.render.timeout_ms),
    };

    let mut ingestor = Ingestor::new(session, renderer, store, options);
    let summary = ingestor.ingest(&urls).await;
    let store = ingestor.finish().await;

    info!(
        path = %store.path().display(),
        total = summary.reports.len(),
        saved = summary.saved(),
        failed = summary.failed(),
        "Scrape complete"
    );
    Ok(())
}
