//! Clash configuration assembly.
//!
//! The merged node list is wrapped in fixed runtime defaults, three derived
//! proxy groups and a static rule list. Field declaration order in
//! [`ClashConfig`] is the key order of the rendered YAML.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::ClashSettings;
use crate::merge::node_name;
use crate::normalize::ProxyNode;

pub const SELECT_GROUP: &str = "🚀 节点选择";
pub const AUTO_GROUP: &str = "♻️ 自动选择";
pub const DIRECT_GROUP: &str = "🎯 全球直连";
pub const DIRECT: &str = "DIRECT";

const MIXED_PORT: u16 = 7890;
const SOCKS_PORT: u16 = 7891;
const MODE: &str = "Rule";
const LOG_LEVEL: &str = "info";
const EXTERNAL_CONTROLLER: &str = "127.0.0.1:9090";

const STATIC_RULES: [&str; 8] = [
    "DOMAIN-SUFFIX,local,DIRECT",
    "IP-CIDR,127.0.0.0/8,DIRECT",
    "IP-CIDR,172.16.0.0/12,DIRECT",
    "IP-CIDR,192.168.0.0/16,DIRECT",
    "IP-CIDR,10.0.0.0/8,DIRECT",
    "IP-CIDR,17.0.0.0/8,DIRECT",
    "IP-CIDR,100.64.0.0/10,DIRECT",
    "GEOIP,CN,DIRECT",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClashConfig {
    pub port: u16,
    #[serde(rename = "socks-port")]
    pub socks_port: u16,
    #[serde(rename = "allow-lan")]
    pub allow_lan: bool,
    pub mode: String,
    #[serde(rename = "log-level")]
    pub log_level: String,
    #[serde(rename = "external-controller")]
    pub external_controller: String,
    pub proxies: Vec<ProxyNode>,
    #[serde(rename = "proxy-groups")]
    pub proxy_groups: Vec<ProxyGroup>,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "url-test")]
    UrlTest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GroupKind,
    pub proxies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

/// Build the full configuration around `nodes`. Nodes must already be
/// deduplicated by name; they are emitted unchanged and in order.
pub fn assemble(nodes: Vec<ProxyNode>, settings: &ClashSettings) -> ClashConfig {
    let names: Vec<String> = nodes
        .iter()
        .filter_map(node_name)
        .map(str::to_string)
        .collect();

    let mut selector = vec![AUTO_GROUP.to_string(), DIRECT_GROUP.to_string()];
    selector.extend(names.iter().take(settings.selector_cap).cloned());

    let proxy_groups = vec![
        ProxyGroup {
            name: SELECT_GROUP.to_string(),
            kind: GroupKind::Select,
            proxies: selector,
            url: None,
            interval: None,
        },
        ProxyGroup {
            name: AUTO_GROUP.to_string(),
            kind: GroupKind::UrlTest,
            proxies: names,
            url: Some(settings.probe_url.clone()),
            interval: Some(settings.probe_interval_secs),
        },
        ProxyGroup {
            name: DIRECT_GROUP.to_string(),
            kind: GroupKind::Select,
            proxies: vec![DIRECT.to_string()],
            url: None,
            interval: None,
        },
    ];

    let mut rules: Vec<String> = STATIC_RULES.iter().map(|r| r.to_string()).collect();
    rules.push(format!("MATCH,{SELECT_GROUP}"));

    ClashConfig {
        port: MIXED_PORT,
        socks_port: SOCKS_PORT,
        allow_lan: false,
        mode: MODE.to_string(),
        log_level: LOG_LEVEL.to_string(),
        external_controller: EXTERNAL_CONTROLLER.to_string(),
        proxies: nodes,
        proxy_groups,
        rules,
    }
}

impl ClashConfig {
    pub fn group(&self, name: &str) -> Option<&ProxyGroup> {
        self.proxy_groups.iter().find(|g| g.name == name)
    }

    /// Group members that name a node, i.e. neither a group nor `DIRECT`.
    pub fn referenced_names(&self) -> Vec<&str> {
        let groups: HashSet<&str> = self.proxy_groups.iter().map(|g| g.name.as_str()).collect();
        self.proxy_groups
            .iter()
            .flat_map(|g| g.proxies.iter().map(String::as_str))
            .filter(|member| *member != DIRECT && !groups.contains(member))
            .collect()
    }

    /// Node references that do not resolve to an entry in `proxies`.
    pub fn dangling_references(&self) -> Vec<&str> {
        let known: HashSet<&str> = self.proxies.iter().filter_map(node_name).collect();
        self.referenced_names()
            .into_iter()
            .filter(|name| !known.contains(name))
            .collect()
    }
}
