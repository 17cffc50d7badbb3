//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline talks to the network through exactly two traits:
//! - [`Fetcher`] retrieves the raw text of one subscription source.
//! - [`Publisher`] pushes the rendered artifacts to the document store.
//!
//! Both are annotated for `mockall`, so orchestration tests can script
//! fetch outcomes and assert on publish calls without any network. The mocks
//! are exported under the `test-export-mocks` feature for use from `tests/`.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::config::Source;

/// One named output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub content: String,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Returned by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Number of files submitted.
    pub files: usize,
    /// Human-readable location of the updated document.
    pub location: String,
}

/// Why a single source contributed nothing. All variants are treated alike
/// by the orchestrator; they only differ in what gets logged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unreadable body from {url}: {reason}")]
    Body { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publisher credentials unavailable: {0}")]
    Credentials(String),

    #[error("no non-empty artifacts to publish")]
    NothingToPublish,

    #[error("publish rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("publish request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Retrieves the raw payload of one source.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body of `source` as text. Any failure means the source is skipped.
    async fn fetch(&self, source: &Source) -> Result<String, FetchError>;
}

/// Pushes all artifacts of one run to the document store in a single request.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Submit every artifact. Implementations drop entries with empty content.
    async fn publish(&self, artifacts: &[Artifact]) -> Result<PublishReceipt, PublishError>;
}
