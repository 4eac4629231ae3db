//! HTTP session and page fetching.
//!
//! A [`Session`] is created once per batch. It picks a random user agent from
//! the configured pool (or from `fake_user_agent` when none is configured),
//! sends it on every request, and carries the browser
//! arguments the renderer has to launch Chrome with so both sides present
//! the same identity.
//!
//! Fetching does exactly one attempt. Timeouts, transport failures and
//! non-2xx statuses come back as a classified [`FetchError`]; retry policy
//! belongs to the caller.

use crate::config::FetchSettings;
use rand::seq::IndexedRandom;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL as given by the caller.
    pub requested_url: String,
    /// Final URL after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

/// Anything that can fetch a page; implemented by [`Session`] and by test doubles.
pub trait Fetch {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// Shared HTTP client plus the identity it presents.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    user_agent: String,
    browser_args: Vec<String>,
}

impl Session {
    /// Create a session with a user agent picked at random from `settings`.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let user_agent = pick_user_agent(&settings.user_agents);
        let client = Client::builder()
            .user_agent(user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        let browser_args = vec![
            "--no-sandbox".to_string(),
            format!("--user-agent={user_agent}"),
        ];
        info!(%user_agent, "HTTP session created");

        Ok(Self {
            client,
            user_agent,
            browser_args,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Arguments the renderer passes to the browser it launches.
    pub fn browser_args(&self) -> &[String] {
        &self.browser_args
    }
}

impl Fetch for Session {
    #[instrument(level = "info", skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let target = parse_target(url)?;

        let response = self
            .client
            .get(target)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        if final_url.as_str() != url {
            debug!(%url, final_url = %final_url, "Request was redirected");
        }
        info!(%url, status = status.as_u16(), bytes = body.len(), "Request successful");

        Ok(FetchedPage {
            requested_url: url.to_string(),
            url: final_url,
            status,
            body,
        })
    }
}

/// A configured agent if the pool has any, otherwise a random real-world one.
fn pick_user_agent(pool: &[String]) -> String {
    match pool.choose(&mut rand::rng()) {
        Some(ua) => ua.clone(),
        None => fake_user_agent::get_rua().to_string(),
    }
}

fn parse_target(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

fn classify(url: &str, timeout: Duration, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}
