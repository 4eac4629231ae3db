//! Turning fetched pages into rendered DOM trees.
//!
//! Many publishers build the article body client-side, so the raw response is
//! often an empty shell. [`WebDriverRenderer`] loads the page in a headless
//! Chrome driven over WebDriver (`fantoccini`) and snapshots the DOM once the
//! scripts have had time to run. [`StaticRenderer`] skips the browser and
//! parses the fetched markup as-is, which is enough for server-rendered sites
//! and for tests.
//!
//! Rendering failures are reported as [`RenderError`], a failure class kept
//! apart from fetch errors.

use crate::config::RenderSettings;
use crate::fetch::{FetchedPage, Session};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use scraper::Html;
use serde_json::{Map, Value, json};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

const READY_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not start browser session at {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("rendering {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("browser failed while rendering {url}: {source}")]
    Browser {
        url: String,
        #[source]
        source: CmdError,
    },
}

/// Produces the rendered DOM of a fetched page.
pub trait Render {
    /// Render `page`, allowing scripts up to `timeout` and then waiting `settle`.
    ///
    /// Every browser round trip is bounded by `timeout`; `settle` comes on top.
    async fn render(
        &mut self,
        page: &FetchedPage,
        settle: Duration,
        timeout: Duration,
    ) -> Result<Html, RenderError>;

    /// Release any browser resources. Called once at the end of a batch.
    async fn close(&mut self) {}
}

/// Renderer selected at runtime.
#[derive(Debug)]
pub enum Renderer {
    WebDriver(WebDriverRenderer),
    Static(StaticRenderer),
}

impl Render for Renderer {
    async fn render(
        &mut self,
        page: &FetchedPage,
        settle: Duration,
        timeout: Duration,
    ) -> Result<Html, RenderError> {
        match self {
            Renderer::WebDriver(r) => r.render(page, settle, timeout).await,
            Renderer::Static(r) => r.render(page, settle, timeout).await,
        }
    }

    async fn close(&mut self) {
        if let Renderer::WebDriver(r) = self {
            r.close().await;
        }
    }
}

/// Parses the fetched body without executing scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticRenderer;

impl Render for StaticRenderer {
    async fn render(
        &mut self,
        page: &FetchedPage,
        _settle: Duration,
        _timeout: Duration,
    ) -> Result<Html, RenderError> {
        let dom = Html::parse_document(&page.body);
        info!(url = %page.url, "Page rendered without script execution");
        Ok(dom)
    }
}

/// Headless Chrome over WebDriver.
///
/// The browser session is opened on first use and reused for every page
/// after that. A failed connection is reported for the page being rendered;
/// the next page tries to connect again.
pub struct WebDriverRenderer {
    endpoint: String,
    capabilities: Map<String, Value>,
    client: Option<Client>,
}

impl std::fmt::Debug for WebDriverRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverRenderer")
            .field("endpoint", &self.endpoint)
            .field("capabilities", &self.capabilities)
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl WebDriverRenderer {
    /// Build a renderer whose browser presents the same identity as `session`.
    pub fn new(session: &Session, settings: &RenderSettings) -> Self {
        Self {
            endpoint: settings.webdriver_url.clone(),
            capabilities: chrome_capabilities(session.browser_args(), settings),
            client: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn capabilities(&self) -> &Map<String, Value> {
        &self.capabilities
    }

    /// The live browser session, opened on first use within `limit`.
    async fn client(&mut self, url: &str, limit: Duration) -> Result<Client, RenderError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());
        let client = match timeout(limit, builder.connect(&self.endpoint)).await {
            Err(_) => {
                warn!(endpoint = %self.endpoint, "WebDriver did not answer the session request");
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                    timeout: limit,
                });
            }
            Ok(Err(e)) => {
                return Err(RenderError::Connect {
                    endpoint: self.endpoint.clone(),
                    message: e.to_string(),
                });
            }
            Ok(Ok(client)) => client,
        };
        info!(endpoint = %self.endpoint, "Browser session started");
        self.client = Some(client.clone());
        Ok(client)
    }
}

impl Render for WebDriverRenderer {
    #[instrument(level = "info", skip_all, fields(url = %page.url))]
    async fn render(
        &mut self,
        page: &FetchedPage,
        settle: Duration,
        limit: Duration,
    ) -> Result<Html, RenderError> {
        let url = page.url.as_str();
        let client = self.client(url, limit).await?;
        let browser_error = |source: CmdError| RenderError::Browser {
            url: url.to_string(),
            source,
        };

        let load = async {
            client.goto(url).await?;
            while client
                .execute("return document.readyState", Vec::new())
                .await?
                .as_str()
                != Some("complete")
            {
                sleep(READY_POLL).await;
            }
            Ok::<(), CmdError>(())
        };

        match timeout(limit, load).await {
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                    timeout: limit,
                });
            }
            Ok(Err(e)) => return Err(browser_error(e)),
            Ok(Ok(())) => debug!("Document ready"),
        }

        sleep(settle).await;

        let snapshot = async {
            let source = client.source().await?;
            let canonical = match client.current_url().await {
                Ok(current) => current.to_string(),
                Err(e) => {
                    warn!(error = %e, "Could not read canonical URL from browser");
                    url.to_string()
                }
            };
            Ok::<_, CmdError>((source, canonical))
        };
        let (source, canonical) = match timeout(limit, snapshot).await {
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                    timeout: limit,
                });
            }
            Ok(result) => result.map_err(browser_error)?,
        };

        info!(url = %canonical, bytes = source.len(), "Page rendered");
        Ok(Html::parse_document(&source))
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            match client.close().await {
                Ok(()) => info!(endpoint = %self.endpoint, "Browser session closed"),
                Err(e) => warn!(endpoint = %self.endpoint, error = %e, "Failed to close browser session"),
            }
        }
    }
}

fn chrome_capabilities(session_args: &[String], settings: &RenderSettings) -> Map<String, Value> {
    let mut args: Vec<String> = session_args.to_vec();
    args.extend(settings.browser_args.iter().cloned());
    if settings.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }

    let mut caps = Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}
