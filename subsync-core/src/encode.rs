//! Rendering merged nodes into output artifacts.

use tracing::info;

use crate::clash::ClashConfig;
use crate::codec;
use crate::contract::Artifact;

pub const CLASH_FILENAME: &str = "clash.yaml";
pub const V2RAY_FILENAME: &str = "v2ray.txt";
pub const QUANTUMULT_X_FILENAME: &str = "quantumult_x.conf";

/// Clash config as YAML. Key order follows the struct; non-ASCII stays literal.
pub fn clash_yaml(config: &ClashConfig) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(config)
}

/// Newline-joined share links.
pub fn uri_list(uris: &[String]) -> String {
    uris.join("\n")
}

/// The joined share-link list base64-encoded as one block.
pub fn uri_list_encoded(uris: &[String]) -> String {
    codec::encode(&uri_list(uris))
}

/// Build every artifact that has content. The Clash file is only produced
/// when there is at least one node; the URI files only when there are links.
pub fn render_artifacts(
    clash: Option<&ClashConfig>,
    uris: &[String],
) -> Result<Vec<Artifact>, serde_yaml::Error> {
    let mut artifacts = Vec::new();

    if let Some(config) = clash.filter(|c| !c.proxies.is_empty()) {
        let yaml = clash_yaml(config)?;
        info!(
            file = CLASH_FILENAME,
            bytes = yaml.len(),
            nodes = config.proxies.len(),
            "Generated artifact"
        );
        artifacts.push(Artifact::new(CLASH_FILENAME, yaml));
    }

    if !uris.is_empty() {
        let encoded = uri_list_encoded(uris);
        info!(file = V2RAY_FILENAME, nodes = uris.len(), "Generated artifact");
        artifacts.push(Artifact::new(V2RAY_FILENAME, encoded));

        info!(file = QUANTUMULT_X_FILENAME, nodes = uris.len(), "Generated artifact");
        artifacts.push(Artifact::new(QUANTUMULT_X_FILENAME, uri_list(uris)));
    }

    Ok(artifacts)
}
