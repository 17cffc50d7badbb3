//! Payload classification.
//!
//! Sources publish either a full Clash document, a plain list of share links,
//! or that same list base64-encoded as one block. [`classify`] tries those
//! shapes in order and returns an explicit [`Normalized`] value.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::codec;

/// A structured proxy record, exactly as published (key order preserved).
pub type ProxyNode = Mapping;

/// Share-link schemes recognised in URI lists.
pub const URI_SCHEMES: [&str; 7] = [
    "vmess://",
    "vless://",
    "trojan://",
    "ss://",
    "ssr://",
    "hysteria://",
    "hysteria2://",
];

const PROXIES_KEY: &str = "proxies";

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A Clash-style document with a node list.
    Structured(Vec<ProxyNode>),
    /// Share links, one per entry, trimmed.
    UriList(Vec<String>),
    Unrecognized,
}

impl Normalized {
    /// Number of nodes or links carried.
    pub fn len(&self) -> usize {
        match self {
            Normalized::Structured(nodes) => nodes.len(),
            Normalized::UriList(lines) => lines.len(),
            Normalized::Unrecognized => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn has_uri_scheme(line: &str) -> bool {
    URI_SCHEMES.iter().any(|scheme| line.starts_with(scheme))
}

fn contains_uri_scheme(text: &str) -> bool {
    URI_SCHEMES.iter().any(|scheme| text.contains(scheme))
}

/// Classify one raw payload.
pub fn classify(payload: &str) -> Normalized {
    if let Some(nodes) = structured_nodes(payload) {
        return Normalized::Structured(nodes);
    }

    let decoded = codec::decode_text(payload).filter(|text| contains_uri_scheme(text));
    let text = decoded.as_deref().unwrap_or(payload);

    let lines = uri_lines(text);
    if lines.is_empty() {
        Normalized::Unrecognized
    } else {
        Normalized::UriList(lines)
    }
}

fn structured_nodes(payload: &str) -> Option<Vec<ProxyNode>> {
    match serde_yaml::from_str::<Value>(payload) {
        Ok(document) => nodes_from_document(&document),
        Err(_) => nodes_from_block(payload),
    }
}

fn nodes_from_document(document: &Value) -> Option<Vec<ProxyNode>> {
    let proxies = document.as_mapping()?.get(PROXIES_KEY)?;
    // `proxies:` with no entries parses as null.
    if proxies.is_null() {
        return Some(Vec::new());
    }
    let nodes = proxies
        .as_sequence()?
        .iter()
        .filter_map(|entry| entry.as_mapping().cloned())
        .collect();
    Some(nodes)
}

/// Recovery path for documents the parser rejects as a whole, usually over a
/// duplicated key. Each entry of the top-level `proxies:` block is parsed on
/// its own, so one untidy record only costs that record.
fn nodes_from_block(payload: &str) -> Option<Vec<ProxyNode>> {
    let mut lines = payload.lines();
    lines.by_ref().find(|line| line.trim_end() == "proxies:")?;

    let mut entries: Vec<String> = Vec::new();
    let mut dash_indent: Option<usize> = None;
    for line in lines {
        let content = line.trim_start();
        let indent = line.len() - content.len();
        let top_level = indent == 0 && !content.is_empty();
        if top_level && !content.starts_with('-') && !content.starts_with('#') {
            break;
        }
        let is_dash = content == "-" || content.starts_with("- ");
        if is_dash && dash_indent.map_or(true, |d| d == indent) {
            dash_indent = Some(indent);
            // Swap the dash for a space so the entry keeps its column.
            entries.push(format!("{}{}", " ".repeat(indent + 1), &content[1..]));
        } else if let Some(entry) = entries.last_mut() {
            entry.push('\n');
            entry.push_str(line);
        }
    }

    let total = entries.len();
    let nodes: Vec<ProxyNode> = entries
        .iter()
        .filter_map(|entry| parse_entry(entry).or_else(|| parse_entry(&last_key_wins(entry)?)))
        .collect();
    if nodes.len() < total {
        debug!(dropped = total - nodes.len(), kept = nodes.len(), "Dropped unparseable proxy entries");
    }
    Some(nodes)
}

fn parse_entry(entry: &str) -> Option<ProxyNode> {
    match serde_yaml::from_str::<Value>(entry).ok()? {
        Value::Mapping(node) => Some(node),
        _ => None,
    }
}

/// Rewrite one entry so a repeated top-level key keeps its last value at the
/// position of its first occurrence.
fn last_key_wins(entry: &str) -> Option<String> {
    let key_indent = entry
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())?;

    let mut chunks: Vec<(String, String)> = Vec::new();
    for line in entry.lines() {
        let content = line.trim_start();
        let indent = line.len() - content.len();
        if indent == key_indent && !content.is_empty() && !content.starts_with('#') {
            let (key, _) = content.split_once(':')?;
            chunks.push((key.trim().to_string(), line.to_string()));
        } else {
            let (_, text) = chunks.last_mut()?;
            text.push('\n');
            text.push_str(line);
        }
    }

    let mut merged: Vec<(String, String)> = Vec::new();
    for (key, text) in chunks {
        match merged.iter_mut().find(|(seen, _)| *seen == key) {
            Some(slot) => slot.1 = text,
            None => merged.push((key, text)),
        }
    }
    let rewritten: Vec<String> = merged.into_iter().map(|(_, text)| text).collect();
    Some(rewritten.join("\n"))
}

/// Trimmed lines starting with a recognised scheme, in input order.
pub fn uri_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| has_uri_scheme(line))
        .map(str::to_string)
        .collect()
}
