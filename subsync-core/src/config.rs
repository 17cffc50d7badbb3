//! Run configuration: which sources to fetch and how to render the outputs.
//!
//! A [`SyncConfig`] is built once at process start (from YAML or from
//! [`SyncConfig::default`]) and passed by reference to every stage.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SELECTOR_CAP: usize = 50;
pub const DEFAULT_PROBE_URL: &str = "http://www.gstatic.com/generate_204";
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub clash: ClashSettings,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            fetch: FetchConfig::default(),
            clash: ClashSettings::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            sources_count = self.sources.len(),
            timeout_secs = self.fetch.timeout_secs,
            selector_cap = self.clash.selector_cap,
            convert_vmess = self.clash.convert_vmess,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

/// Expected payload format of a source. Advisory only: the normaliser
/// decides the actual shape of each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Clash,
    V2ray,
}

/// A remote subscription to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub kind: SourceKind,
}

impl Source {
    pub fn clash(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: SourceKind::Clash,
        }
    }

    pub fn v2ray(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: SourceKind::V2ray,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Knobs for the generated Clash configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClashSettings {
    /// Maximum number of individual nodes offered by the manual selector group.
    #[serde(default = "default_selector_cap")]
    pub selector_cap: usize,
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Append converted `vmess://` links to the Clash node list.
    #[serde(default)]
    pub convert_vmess: bool,
}

impl Default for ClashSettings {
    fn default() -> Self {
        Self {
            selector_cap: DEFAULT_SELECTOR_CAP,
            probe_url: default_probe_url(),
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            convert_vmess: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

/// Public subscriptions fetched when no config file is given.
pub fn default_sources() -> Vec<Source> {
    vec![
        Source::clash("https://raw.githubusercontent.com/Ruk1ng001/freeSub/main/clash.yaml"),
        Source::clash("https://raw.githubusercontent.com/free-nodes/clashfree/main/clash.yml"),
        Source::clash("https://raw.githubusercontent.com/PuddinCat/BestClash/main/clash.yaml"),
        Source::clash(
            "https://raw.githubusercontent.com/ermaozi/get_subscribe/main/subscribe/clash.yml",
        ),
        Source::clash("https://raw.githubusercontent.com/Pawdroid/Free-servers/main/sub"),
        Source::clash("https://raw.githubusercontent.com/aiboboxx/clashfree/main/clash.yml"),
        Source::clash("https://raw.githubusercontent.com/freefq/free/master/clash.yaml"),
        Source::v2ray("https://raw.githubusercontent.com/barry-far/V2ray-config/main/Sub2.txt"),
        Source::v2ray("https://raw.githubusercontent.com/barry-far/V2ray-config/main/Sub5.txt"),
        Source::v2ray(
            "https://raw.githubusercontent.com/ebrasha/free-v2ray-public-list/main/all_extracted_configs.txt",
        ),
    ]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_selector_cap() -> usize {
    DEFAULT_SELECTOR_CAP
}

fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.to_string()
}

fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
