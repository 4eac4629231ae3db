//! Batch ingestion: fetch, render, extract and store each URL once.
//!
//! URLs are processed one at a time, in input order. Each URL moves through a
//! fixed sequence of stages and stops at the first one that rejects it:
//!
//! ```text
//! exists? ──yes──> Duplicate
//!    │no
//! fetch ──err──> FetchFailed
//!    │
//! render ──err──> RenderFailed
//!    │
//! extract ──no container──> MissingContent
//!    │    ──no date──────> MissingDate
//!    │    ──no title─────> MissingTitle (strict) / saved untitled
//!    │
//! insert ──err──> StoreFailed
//!    │
//! Saved
//! ```
//!
//! [`Ingestor::process_url`] returns an [`Outcome`] rather than a `Result`, so
//! one URL's failure can never end the batch. Every input URL gets exactly
//! one [`UrlReport`].

use crate::extract::Extractor;
use crate::fetch::{Fetch, FetchError};
use crate::models::{Extraction, NewArticle, RecordId};
use crate::render::{Render, RenderError};
use crate::store::{RecordStore, StoreError};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Per-batch switches and timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Prefer the page's `<h1>` over its `<title>`.
    pub prefer_h1: bool,
    /// Reject pages without a title instead of saving them untitled.
    pub title_strict: bool,
    pub fetch_timeout: Duration,
    /// Settle delay handed to the renderer.
    pub render_sleep: Duration,
    pub render_timeout: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            prefer_h1: false,
            title_strict: false,
            fetch_timeout: Duration::from_secs(10),
            render_sleep: Duration::from_secs(2),
            render_timeout: Duration::from_secs(20),
        }
    }
}

/// How loudly an outcome is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Terminal state of one URL.
#[derive(Debug)]
pub enum Outcome {
    /// Stored; `untitled` when saved with an empty title.
    Saved { id: RecordId, untitled: bool },
    /// Already in the store; nothing was fetched.
    Duplicate,
    FetchFailed(FetchError),
    RenderFailed(RenderError),
    /// No article container on the rendered page.
    MissingContent,
    MissingDate,
    /// No title while strict title mode is on.
    MissingTitle,
    StoreFailed(StoreError),
}

impl Outcome {
    pub fn severity(&self) -> Severity {
        match self {
            Outcome::Saved { untitled: false, .. } | Outcome::Duplicate => Severity::Info,
            Outcome::Saved { untitled: true, .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable machine-readable name of the outcome.
    pub fn category(&self) -> &'static str {
        match self {
            Outcome::Saved { untitled: false, .. } => "saved",
            Outcome::Saved { untitled: true, .. } => "saved-untitled",
            Outcome::Duplicate => "duplicate",
            Outcome::FetchFailed(_) => "fetch",
            Outcome::RenderFailed(_) => "render",
            Outcome::MissingContent => "no-content",
            Outcome::MissingDate => "no-date",
            Outcome::MissingTitle => "no-title",
            Outcome::StoreFailed(_) => "store",
        }
    }

    pub fn saved_id(&self) -> Option<RecordId> {
        match self {
            Outcome::Saved { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Saved { id, untitled: false } => write!(f, "saved article as #{id}"),
            Outcome::Saved { id, untitled: true } => {
                write!(f, "no title found, saved article as #{id} with an empty title")
            }
            Outcome::Duplicate => f.write_str("article already saved, skipping"),
            Outcome::FetchFailed(e) => write!(f, "error fetching: {e}"),
            Outcome::RenderFailed(e) => write!(f, "error rendering: {e}"),
            Outcome::MissingContent => f.write_str("no article content found"),
            Outcome::MissingDate => f.write_str("no publish date found"),
            Outcome::MissingTitle => f.write_str("no title found"),
            Outcome::StoreFailed(e) => write!(f, "error saving: {e}"),
        }
    }
}

/// Outcome of one input URL.
#[derive(Debug)]
pub struct UrlReport {
    /// 1-based position in the input list.
    pub position: usize,
    pub total: usize,
    pub url: String,
    pub outcome: Outcome,
}

impl UrlReport {
    fn log(&self) {
        let (position, total, url) = (self.position, self.total, &self.url);
        let category = self.outcome.category();
        match self.outcome.severity() {
            Severity::Info => info!(position, total, %url, category, "{}", self.outcome),
            Severity::Warning => warn!(position, total, %url, category, "{}", self.outcome),
            Severity::Error => error!(position, total, %url, category, "{}", self.outcome),
        }
    }
}

/// Every report of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<UrlReport>,
}

impl BatchSummary {
    /// Number of reports per [`Outcome::category`].
    pub fn counts(&self) -> HashMap<&'static str, usize> {
        self.reports.iter().counts_by(|r| r.outcome.category())
    }

    pub fn saved(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.saved_id().is_some())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.severity() == Severity::Error)
            .count()
    }
}

/// Drives one batch. Owns the fetch session, the renderer and the store.
pub struct Ingestor<F, R, S> {
    fetcher: F,
    renderer: R,
    store: S,
    extractor: Extractor,
    options: IngestOptions,
}

impl<F, R, S> Ingestor<F, R, S>
where
    F: Fetch,
    R: Render,
    S: RecordStore,
{
    pub fn new(fetcher: F, renderer: R, store: S, options: IngestOptions) -> Self {
        Self {
            fetcher,
            renderer,
            store,
            extractor: Extractor::default(),
            options,
        }
    }

    /// Replace the extractor (tests pin the date parser's reference time).
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process `urls` in order and report one outcome per URL.
    #[instrument(level = "info", skip_all, fields(total = urls.len()))]
    pub async fn ingest(&mut self, urls: &[String]) -> BatchSummary {
        let total = urls.len();
        let mut summary = BatchSummary::default();

        for (i, url) in urls.iter().enumerate() {
            info!(position = i + 1, total, %url, "Scraping article {} of {}", i + 1, total);
            let report = UrlReport {
                position: i + 1,
                total,
                url: url.clone(),
                outcome: self.process_url(url).await,
            };
            report.log();
            summary.reports.push(report);
        }

        info!(
            total,
            saved = summary.saved(),
            failed = summary.failed(),
            counts = ?summary.counts(),
            "Batch finished"
        );
        summary
    }

    /// Run one URL through every stage.
    pub async fn process_url(&mut self, url: &str) -> Outcome {
        match self.store.exists(url) {
            Ok(true) => return Outcome::Duplicate,
            Ok(false) => {}
            Err(e) => return Outcome::StoreFailed(e),
        }

        let page = match self.fetcher.fetch(url, self.options.fetch_timeout).await {
            Ok(page) => page,
            Err(e) => return Outcome::FetchFailed(e),
        };

        let dom = match self
            .renderer
            .render(&page, self.options.render_sleep, self.options.render_timeout)
            .await
        {
            Ok(dom) => dom,
            Err(e) => return Outcome::RenderFailed(e),
        };

        let extraction = self.extractor.extract(&dom, self.options.prefer_h1);
        let (article, untitled) = match admit(url, extraction, self.options.title_strict) {
            Ok(admitted) => admitted,
            Err(rejected) => return rejected,
        };

        info!(%url, title = %truncate_for_log(&article.title, 80), "Saving article");
        match self.store.insert(article) {
            Ok(id) => Outcome::Saved { id, untitled },
            Err(e) => Outcome::StoreFailed(e),
        }
    }

    /// Release the renderer's browser and hand back the store.
    pub async fn finish(mut self) -> S {
        self.renderer.close().await;
        self.store
    }
}

/// Decide whether an extraction becomes a record.
///
/// Content is checked before the date, and the date before the title.
fn admit(url: &str, extraction: Extraction, title_strict: bool) -> Result<(NewArticle, bool), Outcome> {
    let Some(html_content) = extraction.html_content else {
        return Err(Outcome::MissingContent);
    };
    let Some(publish_date) = extraction.publish_date else {
        return Err(Outcome::MissingDate);
    };
    let (title, untitled) = match extraction.title {
        Some(title) => (title, false),
        None if title_strict => return Err(Outcome::MissingTitle),
        None => (String::new(), true),
    };

    Ok((
        NewArticle {
            url: url.to_string(),
            title,
            html_content,
            plain_text: extraction.plain_text.unwrap_or_default(),
            publish_date,
        },
        untitled,
    ))
}
