//! Command-line interface definitions for the article ingester.
//!
//! Store location, settings file and WebDriver endpoint can also be given
//! through environment variables.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Ingest a list of URLs, preferring <h1> titles
/// article_ingest scrape --urls urls.txt --title-h1
///
/// # Reject pages without a title
/// article_ingest scrape --urls urls.txt --title-strict
///
/// # Browse what was stored
/// article_ingest list --source example.com
/// article_ingest show 3
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the JSON article store
    #[arg(long, global = true, env = "ARTICLE_STORE", default_value = "articles.json")]
    pub store: PathBuf,

    /// Optional path to a settings YAML file
    #[arg(short, long, global = true, env = "ARTICLE_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, render and store every article in a URL list
    Scrape(ScrapeArgs),

    /// List stored articles
    List {
        /// Only articles whose URL contains this text (case-insensitive)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show one stored article
    Show {
        /// Article id
        id: u64,
    },
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// File with one URL per line
    #[arg(short, long)]
    pub urls: PathBuf,

    /// Prefer the page's <h1> over its <title>
    #[arg(long)]
    pub title_h1: bool,

    /// Skip articles without a title instead of saving them untitled
    #[arg(long)]
    pub title_strict: bool,

    /// How fetched pages are turned into a DOM
    #[arg(long, value_enum, default_value_t = RendererKind::Webdriver)]
    pub renderer: RendererKind,

    /// WebDriver endpoint, overrides the settings file
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Per-request fetch timeout in milliseconds
    #[arg(long)]
    pub fetch_timeout_ms: Option<u64>,

    /// Delay after the page is ready, in milliseconds
    #[arg(long)]
    pub render_sleep_ms: Option<u64>,

    /// Upper bound for page load in the browser, in milliseconds
    #[arg(long)]
    pub render_timeout_ms: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererKind {
    /// Headless Chrome over WebDriver
    Webdriver,
    /// Parse the fetched HTML without running scripts
    Static,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "article_ingest",
            "--store",
            "/tmp/store.json",
            "scrape",
            "--urls",
            "urls.txt",
            "--title-h1",
        ]);

        assert_eq!(cli.store, PathBuf::from("/tmp/store.json"));
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.urls, PathBuf::from("urls.txt"));
        assert!(args.title_h1);
        assert!(!args.title_strict);
        assert_eq!(args.renderer, RendererKind::Webdriver);
    }

    #[test]
    fn test_scrape_overrides() {
        let cli = Cli::parse_from([
            "article_ingest",
            "scrape",
            "-u",
            "urls.txt",
            "--title-strict",
            "--renderer",
            "static",
            "--fetch-timeout-ms",
            "500",
            "--render-sleep-ms",
            "0",
            "--render-timeout-ms",
            "3000",
            "--webdriver-url",
            "http://driver:4444",
        ]);

        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert!(args.title_strict);
        assert_eq!(args.renderer, RendererKind::Static);
        assert_eq!(args.fetch_timeout_ms, Some(500));
        assert_eq!(args.render_sleep_ms, Some(0));
        assert_eq!(args.render_timeout_ms, Some(3000));
        assert_eq!(args.webdriver_url.as_deref(), Some("http://driver:4444"));
    }

    #[test]
    fn test_scrape_requires_urls() {
        assert!(Cli::try_parse_from(["article_ingest", "scrape"]).is_err());
    }

    #[test]
    fn test_list_and_show() {
        let cli = Cli::parse_from(["article_ingest", "list", "--source", "example.com"]);
        assert!(matches!(cli.command, Command::List { source: Some(ref s) } if s == "example.com"));

        let cli = Cli::parse_from(["article_ingest", "show", "7", "--store", "a.json"]);
        assert!(matches!(cli.command, Command::Show { id: 7 }));
        assert_eq!(cli.store, PathBuf::from("a.json"));
    }
}
