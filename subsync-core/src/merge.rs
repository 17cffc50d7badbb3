//! Cross-source deduplication.
//!
//! Structured nodes are keyed by `name`, first occurrence wins and order of
//! first appearance is kept. Share links are keyed by their exact trimmed text
//! and come out sorted, so consecutive runs produce stable diffs.

use std::collections::{BTreeSet, HashSet};

use serde_yaml::Value;
use tracing::debug;

use crate::normalize::{has_uri_scheme, Normalized, ProxyNode};

/// The deduplicated node sets of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedNodes {
    pub structured: Vec<ProxyNode>,
    pub uris: Vec<String>,
}

impl MergedNodes {
    pub fn is_empty(&self) -> bool {
        self.structured.is_empty() && self.uris.is_empty()
    }
}

/// The `name` of a structured node, if it is a non-empty string.
pub fn node_name(node: &ProxyNode) -> Option<&str> {
    node.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

/// Merge structured node lists in source order. First-seen name wins.
pub fn merge_structured<I>(lists: I) -> Vec<ProxyNode>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = ProxyNode>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for node in lists.into_iter().flatten() {
        let Some(name) = node_name(&node) else {
            debug!("Dropping node without a usable name");
            continue;
        };
        if !seen.insert(name.to_string()) {
            debug!(name, "Dropping duplicate node");
            continue;
        }
        merged.push(node);
    }
    merged
}

/// Merge share-link lists into a sorted, deduplicated list.
pub fn merge_uris<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| has_uri_scheme(line))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Split classified payloads by universe and merge each one.
pub fn merge_all(payloads: Vec<Normalized>) -> MergedNodes {
    let mut structured = Vec::new();
    let mut uris = Vec::new();
    for payload in payloads {
        match payload {
            Normalized::Structured(nodes) => structured.push(nodes),
            Normalized::UriList(lines) => uris.extend(lines),
            Normalized::Unrecognized => {}
        }
    }
    MergedNodes {
        structured: merge_structured(structured),
        uris: merge_uris(uris),
    }
}
