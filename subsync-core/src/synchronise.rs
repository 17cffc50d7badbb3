//! High-level pipeline: fetch → normalise → merge → assemble → encode → publish.
//!
//! # Major Types
//! - [`AggregateReport`]: what one run fetched, merged and rendered.
//! - [`SynchroniseReport`]: the aggregate report plus the publish receipt.
//! - [`SyncError`]: the run-level fatal conditions.
//!
//! # Responsibilities
//! - Source-level failures are logged and skipped; a run only stops when no
//!   source produced anything, when the merged node set is empty, or when
//!   publishing fails.
//! - Record-level failures (nameless nodes, malformed vmess links) are dropped
//!   inside the merge and convert stages.
//! - [`aggregate`] never touches the publisher, so callers can render
//!   artifacts without credentials and only then build a publisher.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Split entrypoints: [`aggregate`], [`publish`]

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clash;
use crate::config::{SourceKind, SyncConfig};
use crate::contract::{Artifact, Fetcher, PublishError, PublishReceipt, Publisher};
use crate::encode;
use crate::fetch::{fetch_all, FetchResult};
use crate::merge::{self, merge_structured, MergedNodes};
use crate::normalize::{classify, Normalized};
use crate::vmess;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("none of the {total} configured sources returned content")]
    NoSourceContent { total: usize },

    #[error("no usable proxy nodes after merging {sources} fetched sources")]
    EmptyMergedSet { sources: usize },

    #[error("failed to render artifact: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub sources_total: usize,
    pub sources_fetched: usize,
    pub structured_nodes: usize,
    pub uri_nodes: usize,
    /// Structured nodes that came from converted `vmess://` links.
    pub converted_nodes: usize,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone)]
pub struct SynchroniseReport {
    pub aggregate: AggregateReport,
    pub receipt: PublishReceipt,
}

fn kind_matches(kind: SourceKind, normalized: &Normalized) -> bool {
    matches!(
        (kind, normalized),
        (SourceKind::Clash, Normalized::Structured(_)) | (SourceKind::V2ray, Normalized::UriList(_))
    )
}

fn normalize_results(results: &[FetchResult]) -> Vec<Normalized> {
    results
        .iter()
        .filter_map(|result| {
            let body = result.body.as_deref()?;
            let normalized = classify(body);
            match &normalized {
                Normalized::Unrecognized => {
                    warn!(url = %result.source.url, "Unrecognised payload, source ignored");
                }
                other if !kind_matches(result.source.kind, other) => {
                    warn!(
                        url = %result.source.url,
                        expected = ?result.source.kind,
                        nodes = other.len(),
                        "Payload shape differs from the configured kind"
                    );
                }
                other => {
                    info!(url = %result.source.url, nodes = other.len(), "Normalised source");
                }
            }
            Some(normalized)
        })
        .collect()
}

/// Fetch, merge and render every artifact for one run. Does not publish.
pub async fn aggregate<F>(config: &SyncConfig, fetcher: &F) -> Result<AggregateReport, SyncError>
where
    F: Fetcher + ?Sized,
{
    info!("[SYNC] Fetching {} sources", config.sources.len());
    let results = fetch_all(fetcher, &config.sources).await;
    let sources_total = results.len();
    let sources_fetched = results.iter().filter(|r| r.is_present()).count();
    if sources_fetched == 0 {
        error!(total = sources_total, "[SYNC][ERROR] No source returned content");
        return Err(SyncError::NoSourceContent {
            total: sources_total,
        });
    }
    info!(fetched = sources_fetched, total = sources_total, "[SYNC] Fetch stage complete");

    let MergedNodes {
        mut structured,
        uris,
    } = merge::merge_all(normalize_results(&results));

    let mut converted_nodes = 0;
    if config.clash.convert_vmess {
        let converted = vmess::convert_all(&uris);
        let before = structured.len();
        structured = merge_structured(vec![structured, converted]);
        converted_nodes = structured.len() - before;
        info!(added = converted_nodes, "[SYNC] Appended converted vmess nodes");
    }

    info!(
        structured = structured.len(),
        uris = uris.len(),
        "[SYNC] Merged unique nodes"
    );
    if structured.is_empty() && uris.is_empty() {
        error!("[SYNC][ERROR] Merged node set is empty");
        return Err(SyncError::EmptyMergedSet {
            sources: sources_fetched,
        });
    }

    let structured_nodes = structured.len();
    let clash_config = (!structured.is_empty()).then(|| clash::assemble(structured, &config.clash));
    if let Some(assembled) = &clash_config {
        let dangling = assembled.dangling_references();
        if !dangling.is_empty() {
            warn!(?dangling, "[SYNC] Proxy groups reference unknown nodes");
        }
    }

    let artifacts = encode::render_artifacts(clash_config.as_ref(), &uris)?;
    debug!(files = artifacts.len(), "[SYNC] Rendered artifacts");

    Ok(AggregateReport {
        sources_total,
        sources_fetched,
        structured_nodes,
        uri_nodes: uris.len(),
        converted_nodes,
        artifacts,
    })
}

/// Publish rendered artifacts in one call.
pub async fn publish<P>(publisher: &P, artifacts: &[Artifact]) -> Result<PublishReceipt, SyncError>
where
    P: Publisher + ?Sized,
{
    info!(files = artifacts.len(), "[SYNC][PUBLISH] Uploading artifacts");
    match publisher.publish(artifacts).await {
        Ok(receipt) => {
            info!(files = receipt.files, location = %receipt.location, "[SYNC][PUBLISH] Upload succeeded");
            Ok(receipt)
        }
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR][PUBLISH] Upload failed");
            Err(SyncError::Publish(e))
        }
    }
}

/// Run the whole pipeline against `fetcher` and `publisher`.
pub async fn synchronise<F, P>(
    config: &SyncConfig,
    fetcher: &F,
    publisher: &P,
) -> Result<SynchroniseReport, SyncError>
where
    F: Fetcher + ?Sized,
    P: Publisher + ?Sized,
{
    info!("[SYNC] Starting full synchronisation pipeline");
    let aggregate = aggregate(config, fetcher).await?;
    let receipt = publish(publisher, &aggregate.artifacts).await?;
    Ok(SynchroniseReport { aggregate, receipt })
}
