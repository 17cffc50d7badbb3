//! Source fetching over HTTP.
//!
//! [`HttpFetcher`] is the production [`Fetcher`]: one shared `reqwest::Client`
//! with the configured timeout. [`fetch_all`] walks the sources in order and
//! records absence instead of failing, so a dead mirror never stops a run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::{FetchConfig, Source};
use crate::contract::{FetchError, Fetcher};

const USER_AGENT: &str = concat!("subsync/", env!("CARGO_PKG_VERSION"));

/// Outcome of fetching one source.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source: Source,
    pub body: Option<String>,
}

impl FetchResult {
    pub fn is_present(&self) -> bool {
        self.body.is_some()
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeout(config.timeout())
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<String, FetchError> {
        let url = source.url.as_str();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(FetchError::Body {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }
        Ok(trimmed.to_string())
    }
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_decode() {
        FetchError::Body {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Fetch every source one after another, in configured order.
///
/// Failures are logged and recorded as an absent body; this never errors.
pub async fn fetch_all<F>(fetcher: &F, sources: &[Source]) -> Vec<FetchResult>
where
    F: Fetcher + ?Sized,
{
    let total = sources.len();
    let mut results = Vec::with_capacity(total);
    for (idx, source) in sources.iter().enumerate() {
        info!(index = idx + 1, total, url = %source.url, kind = ?source.kind, "Fetching source");
        let body = match fetcher.fetch(source).await {
            Ok(body) => {
                info!(url = %source.url, bytes = body.len(), "Fetched source");
                Some(body)
            }
            Err(e) => {
                warn!(url = %source.url, error = %e, "Source skipped");
                None
            }
        };
        results.push(FetchResult {
            source: source.clone(),
            body,
        });
    }
    results
}
