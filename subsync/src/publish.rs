#![doc = "Publisher integration for the CLI: implements the core `Publisher` trait against the GitHub Gist API."]
//
//! # Gist publisher
//!
//! [`GistClient`] updates every file of one existing Gist in a single
//! `PATCH /gists/{id}` request.
//!
//! ## Client Usage
//!
//! - Construct with [`GistClient::new_from_env`] (`GIST_PAT`, `GIST_LINK`), or
//!   [`GistClient::new`] with explicit values in tests.
//! - `GIST_LINK` is `<user>/<gist_id>`; the user part only builds the
//!   human-readable location in the receipt.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

pub use subsync_core::contract::{Artifact, PublishError, PublishReceipt};
use subsync_core::config::PublishConfig;
use subsync_core::contract::Publisher;

pub const GIST_PAT_ENV: &str = "GIST_PAT";
pub const GIST_LINK_ENV: &str = "GIST_LINK";

const ACCEPT_GITHUB_V3: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("subsync/", env!("CARGO_PKG_VERSION"));
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct GistFile<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct GistUpdate<'a> {
    files: BTreeMap<&'a str, GistFile<'a>>,
}

pub struct GistClient {
    http: Client,
    api_base: String,
    token: String,
    owner: String,
    gist_id: String,
}

impl std::fmt::Debug for GistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistClient")
            .field("api_base", &self.api_base)
            .field("owner", &self.owner)
            .field("gist_id", &self.gist_id)
            .finish_non_exhaustive()
    }
}

/// Split `<user>/<gist_id>`.
pub fn parse_gist_link(link: &str) -> Result<(String, String), PublishError> {
    match link.trim().split('/').collect::<Vec<_>>().as_slice() {
        [owner, gist_id] if !owner.is_empty() && !gist_id.is_empty() => {
            Ok((owner.to_string(), gist_id.to_string()))
        }
        _ => Err(PublishError::Credentials(format!(
            "invalid {GIST_LINK_ENV} format: expected <user>/<gist_id>, got {link:?}"
        ))),
    }
}

impl GistClient {
    pub fn new(api_base: &str, token: &str, gist_link: &str) -> Result<Self, PublishError> {
        if token.trim().is_empty() {
            return Err(PublishError::Credentials(format!("{GIST_PAT_ENV} is empty")));
        }
        let (owner, gist_id) = parse_gist_link(gist_link)?;
        let http = Client::builder().timeout(PUBLISH_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            owner,
            gist_id,
        })
    }

    pub fn new_from_env(config: &PublishConfig) -> Result<Self, PublishError> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        match (env::var(GIST_PAT_ENV), env::var(GIST_LINK_ENV)) {
            (Ok(token), Ok(link)) => {
                let client = Self::new(&config.api_base, &token, &link)?;
                tracing::info!(
                    token_set = !token.is_empty(),
                    owner = %client.owner,
                    gist_id = %client.gist_id,
                    "Initialized GistClient from environment"
                );
                Ok(client)
            }
            (Err(e), _) => {
                tracing::error!(error = ?e, "GIST_PAT missing in environment");
                Err(PublishError::Credentials(format!("{GIST_PAT_ENV}: {e}")))
            }
            (_, Err(e)) => {
                tracing::error!(error = ?e, "GIST_LINK missing in environment");
                Err(PublishError::Credentials(format!("{GIST_LINK_ENV}: {e}")))
            }
        }
    }

    pub fn location(&self) -> String {
        format!("https://gist.github.com/{}/{}", self.owner, self.gist_id)
    }
}

#[async_trait]
impl Publisher for GistClient {
    async fn publish(&self, artifacts: &[Artifact]) -> Result<PublishReceipt, PublishError> {
        let files: BTreeMap<&str, GistFile<'_>> = artifacts
            .iter()
            .filter(|a| !a.content.is_empty())
            .map(|a| (a.filename.as_str(), GistFile { content: &a.content }))
            .collect();
        if files.is_empty() {
            tracing::error!("No valid files to upload");
            return Err(PublishError::NothingToPublish);
        }

        let count = files.len();
        let url = format!("{}/gists/{}", self.api_base, self.gist_id);
        tracing::info!(files = count, gist_id = %self.gist_id, "Uploading files to Gist");

        let response = self
            .http
            .patch(&url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, ACCEPT_GITHUB_V3)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(&GistUpdate { files })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Gist request failed");
                PublishError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Gist API rejected the update");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let location = self.location();
        tracing::info!(files = count, location = %location, "Successfully uploaded to Gist");
        Ok(PublishReceipt {
            files: count,
            location,
        })
    }
}
