//! `vmess://` share links to Clash proxy records.
//!
//! A vmess link is `vmess://` followed by base64 of a small JSON object
//! (`v`, `ps`, `add`, `port`, `id`, `aid`, `net`, `type`, `host`, `path`,
//! `tls`, `sni`, `scy`). Conversion is per link: anything malformed yields
//! `None` and the caller moves on.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::codec;
use crate::normalize::ProxyNode;

pub const SCHEME: &str = "vmess://";

const DEFAULT_PORT: u16 = 443;
const DEFAULT_CIPHER: &str = "auto";

/// Every field is kept as raw JSON: generators disagree on whether names,
/// ports and flags are strings, numbers or booleans.
#[derive(Debug, Deserialize)]
struct VmessLink {
    #[serde(default)]
    ps: Option<JsonValue>,
    #[serde(default)]
    add: Option<JsonValue>,
    #[serde(default)]
    port: Option<JsonValue>,
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    aid: Option<JsonValue>,
    #[serde(default)]
    scy: Option<JsonValue>,
    #[serde(default)]
    net: Option<JsonValue>,
    #[serde(default)]
    host: Option<JsonValue>,
    #[serde(default)]
    path: Option<JsonValue>,
    #[serde(default)]
    tls: Option<JsonValue>,
    #[serde(default)]
    sni: Option<JsonValue>,
}

/// Numbers show up both as JSON numbers and as strings.
fn as_number(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) if s.trim().is_empty() => None,
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scalar as trimmed text. Null, `false`, blanks and containers count as absent.
fn text(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn yaml_str(text: &str) -> Value {
    Value::String(text.to_string())
}

/// Convert one `vmess://` link. Returns `None` for other schemes or malformed links.
pub fn convert(uri: &str) -> Option<ProxyNode> {
    let payload = uri.trim().strip_prefix(SCHEME)?;
    let decoded = codec::decode_text(payload)?;
    let link: VmessLink = serde_json::from_str(&decoded).ok()?;

    let server = text(link.add.as_ref())?;
    let uuid = text(link.id.as_ref())?;
    let port = match link.port.as_ref().filter(|value| !is_blank(value)) {
        None => DEFAULT_PORT,
        Some(value) => u16::try_from(as_number(value)?).ok()?,
    };
    let alter_id = link.aid.as_ref().and_then(as_number).unwrap_or(0);
    let name = text(link.ps.as_ref()).unwrap_or_else(|| format!("{server}:{port}"));
    let cipher = text(link.scy.as_ref()).unwrap_or_else(|| DEFAULT_CIPHER.to_string());
    let host_text = text(link.host.as_ref());
    let path_text = text(link.path.as_ref());
    let host = host_text.as_deref();
    let path = path_text.as_deref();
    let tls = matches!(text(link.tls.as_ref()).as_deref(), Some("tls" | "true"));
    let sni = text(link.sni.as_ref());
    let net = text(link.net.as_ref());

    let mut node = Mapping::new();
    node.insert(yaml_str("name"), Value::String(name));
    node.insert(yaml_str("type"), yaml_str("vmess"));
    node.insert(yaml_str("server"), Value::String(server));
    node.insert(yaml_str("port"), Value::from(port));
    node.insert(yaml_str("uuid"), Value::String(uuid));
    node.insert(yaml_str("alterId"), Value::from(alter_id));
    node.insert(yaml_str("cipher"), Value::String(cipher));

    if tls {
        node.insert(yaml_str("tls"), Value::Bool(true));
        if let Some(servername) = sni.as_deref().or(host) {
            node.insert(yaml_str("servername"), yaml_str(servername));
        }
    }

    match net.as_deref() {
        None | Some("tcp") => {}
        Some("ws") => {
            node.insert(yaml_str("network"), yaml_str("ws"));
            let mut opts = Mapping::new();
            opts.insert(yaml_str("path"), yaml_str(path.unwrap_or("/")));
            if let Some(host) = host {
                let mut headers = Mapping::new();
                headers.insert(yaml_str("Host"), yaml_str(host));
                opts.insert(yaml_str("headers"), Value::Mapping(headers));
            }
            node.insert(yaml_str("ws-opts"), Value::Mapping(opts));
        }
        Some("h2") => {
            node.insert(yaml_str("network"), yaml_str("h2"));
            let mut opts = Mapping::new();
            if let Some(host) = host {
                opts.insert(yaml_str("host"), Value::Sequence(vec![yaml_str(host)]));
            }
            opts.insert(yaml_str("path"), yaml_str(path.unwrap_or("/")));
            node.insert(yaml_str("h2-opts"), Value::Mapping(opts));
        }
        Some("grpc") => {
            node.insert(yaml_str("network"), yaml_str("grpc"));
            let mut opts = Mapping::new();
            if let Some(service) = path {
                opts.insert(yaml_str("grpc-service-name"), yaml_str(service));
            }
            node.insert(yaml_str("grpc-opts"), Value::Mapping(opts));
        }
        Some(other) => {
            node.insert(yaml_str("network"), yaml_str(other));
        }
    }

    Some(node)
}

/// Convert every `vmess://` link in `uris`, silently skipping the rest.
pub fn convert_all<I, S>(uris: I) -> Vec<ProxyNode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dropped = 0usize;
    let nodes: Vec<ProxyNode> = uris
        .into_iter()
        .filter(|uri| uri.as_ref().trim_start().starts_with(SCHEME))
        .filter_map(|uri| {
            let node = convert(uri.as_ref());
            if node.is_none() {
                dropped += 1;
            }
            node
        })
        .collect();
    if dropped > 0 {
        debug!(dropped, converted = nodes.len(), "Dropped malformed vmess links");
    }
    nodes
}
