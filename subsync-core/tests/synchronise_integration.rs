use std::collections::HashMap;

use serde_yaml::Value;
use subsync_core::codec;
use subsync_core::config::{Source, SyncConfig};
use subsync_core::contract::{
    Artifact, FetchError, MockFetcher, MockPublisher, PublishError, PublishReceipt,
};
use subsync_core::encode::{CLASH_FILENAME, QUANTUMULT_X_FILENAME, V2RAY_FILENAME};
use subsync_core::synchronise::{aggregate, synchronise, SyncError};

/// A fetcher that serves canned bodies by URL; `None` simulates a failed fetch.
fn scripted_fetcher(responses: Vec<(&str, Option<String>)>) -> MockFetcher {
    let table: HashMap<String, Option<String>> = responses
        .into_iter()
        .map(|(url, body)| (url.to_string(), body))
        .collect();
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().returning(move |source| {
        match table.get(&source.url).cloned().flatten() {
            Some(body) => Ok(body),
            None => Err(FetchError::Timeout {
                url: source.url.clone(),
            }),
        }
    });
    fetcher
}

fn config_with(sources: Vec<Source>) -> SyncConfig {
    SyncConfig {
        sources,
        ..SyncConfig::default()
    }
}

fn artifact<'a>(artifacts: &'a [Artifact], name: &str) -> Option<&'a Artifact> {
    artifacts.iter().find(|a| a.filename == name)
}

fn vmess_link(json: &str) -> String {
    format!("vmess://{}", codec::encode(json))
}

const CLASH_A: &str = r#"
proxies:
  - name: shared
    type: ss
    server: a.example
    port: 8388
  - name: only-a
    type: ss
    server: a2.example
    port: 8388
"#;

const CLASH_B: &str = r#"
port: 7890
proxies:
  - name: shared
    type: trojan
    server: b.example
    port: 443
  - name: only-b
    type: trojan
    server: b2.example
    port: 443
"#;

#[tokio::test]
async fn overlapping_clash_sources_keep_first_version() {
    let config = config_with(vec![
        Source::clash("https://a.example/clash.yaml"),
        Source::clash("https://b.example/clash.yaml"),
    ]);
    let fetcher = scripted_fetcher(vec![
        ("https://a.example/clash.yaml", Some(CLASH_A.to_string())),
        ("https://b.example/clash.yaml", Some(CLASH_B.to_string())),
    ]);

    let report = aggregate(&config, &fetcher).await.expect("aggregate succeeds");
    assert_eq!(report.sources_fetched, 2);
    assert_eq!(report.structured_nodes, 3);
    assert_eq!(report.uri_nodes, 0);

    let clash = artifact(&report.artifacts, CLASH_FILENAME).expect("clash.yaml rendered");
    let parsed: Value = serde_yaml::from_str(&clash.content).unwrap();
    let proxies = parsed["proxies"].as_sequence().unwrap();
    let names: Vec<_> = proxies.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, vec!["shared", "only-a", "only-b"]);
    assert_eq!(proxies[0]["server"].as_str(), Some("a.example"));

    assert!(artifact(&report.artifacts, V2RAY_FILENAME).is_none());
    assert!(artifact(&report.artifacts, QUANTUMULT_X_FILENAME).is_none());
}

#[tokio::test]
async fn encoded_subscription_yields_only_matching_lines() {
    let blob = codec::encode("vmess://first\nhttps://not-a-node.example\nvmess://second\n");
    let config = config_with(vec![Source::v2ray("https://v.example/sub")]);
    let fetcher = scripted_fetcher(vec![("https://v.example/sub", Some(blob))]);

    let report = aggregate(&config, &fetcher).await.expect("aggregate succeeds");
    assert_eq!(report.uri_nodes, 2);

    let plain = artifact(&report.artifacts, QUANTUMULT_X_FILENAME).unwrap();
    assert_eq!(plain.content, "vmess://first\nvmess://second");

    let encoded = artifact(&report.artifacts, V2RAY_FILENAME).unwrap();
    assert_eq!(codec::decode_text(&encoded.content).as_deref(), Some(plain.content.as_str()));
}

#[tokio::test]
async fn uri_sources_are_merged_sorted_and_unique() {
    let config = config_with(vec![
        Source::v2ray("https://v.example/1"),
        Source::v2ray("https://v.example/2"),
    ]);
    let fetcher = scripted_fetcher(vec![
        ("https://v.example/1", Some("trojan://b\nss://a\n".to_string())),
        ("https://v.example/2", Some(codec::encode("ss://a\nvless://c"))),
    ]);

    let report = aggregate(&config, &fetcher).await.unwrap();
    let plain = artifact(&report.artifacts, QUANTUMULT_X_FILENAME).unwrap();
    assert_eq!(plain.content, "ss://a\ntrojan://b\nvless://c");
}

#[tokio::test]
async fn source_kind_is_only_a_hint() {
    let config = config_with(vec![
        Source::clash("https://mislabelled.example/clash.yaml"),
        Source::v2ray("https://mislabelled.example/sub.txt"),
    ]);
    let fetcher = scripted_fetcher(vec![
        ("https://mislabelled.example/clash.yaml", Some("vless://z
ss://y
".to_string())),
        ("https://mislabelled.example/sub.txt", Some(CLASH_A.to_string())),
    ]);

    let report = aggregate(&config, &fetcher).await.unwrap();
    assert_eq!(report.uri_nodes, 2);
    assert_eq!(report.structured_nodes, 2);

    let plain = artifact(&report.artifacts, QUANTUMULT_X_FILENAME).unwrap();
    assert_eq!(plain.content, "ss://y
vless://z");
    let clash = artifact(&report.artifacts, CLASH_FILENAME).unwrap();
    assert!(clash.content.contains("only-a"));
}

#[tokio::test]
async fn all_sources_failing_stops_before_publish() {
    let config = config_with(vec![
        Source::clash("https://down.example/1"),
        Source::v2ray("https://down.example/2"),
    ]);
    let fetcher = scripted_fetcher(vec![]);
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(0);

    let err = synchronise(&config, &fetcher, &publisher)
        .await
        .expect_err("run must fail");
    assert!(matches!(err, SyncError::NoSourceContent { total: 2 }));
}

#[tokio::test]
async fn unusable_content_is_an_empty_merged_set() {
    let config = config_with(vec![Source::clash("https://junk.example/")]);
    let fetcher = scripted_fetcher(vec![(
        "https://junk.example/",
        Some("<html>rate limited</html>".to_string()),
    )]);
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(0);

    let err = synchronise(&config, &fetcher, &publisher).await.unwrap_err();
    assert!(matches!(err, SyncError::EmptyMergedSet { sources: 1 }));
}

#[tokio::test]
async fn failing_sources_are_skipped_when_others_succeed() {
    let config = config_with(vec![
        Source::clash("https://down.example/clash.yaml"),
        Source::clash("https://a.example/clash.yaml"),
    ]);
    let fetcher = scripted_fetcher(vec![("https://a.example/clash.yaml", Some(CLASH_A.to_string()))]);

    let report = aggregate(&config, &fetcher).await.unwrap();
    assert_eq!(report.sources_total, 2);
    assert_eq!(report.sources_fetched, 1);
    assert_eq!(report.structured_nodes, 2);
}

#[tokio::test]
async fn rejected_publish_fails_the_run() {
    let config = config_with(vec![Source::clash("https://a.example/clash.yaml")]);
    let fetcher = scripted_fetcher(vec![("https://a.example/clash.yaml", Some(CLASH_A.to_string()))]);
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(1).returning(|_| {
        Err(PublishError::Rejected {
            status: 401,
            body: "Bad credentials".to_string(),
        })
    });

    let err = synchronise(&config, &fetcher, &publisher).await.unwrap_err();
    match err {
        SyncError::Publish(PublishError::Rejected { status, .. }) => assert_eq!(status, 401),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn successful_run_publishes_every_artifact_once() {
    let config = config_with(vec![
        Source::clash("https://a.example/clash.yaml"),
        Source::v2ray("https://v.example/sub"),
    ]);
    let fetcher = scripted_fetcher(vec![
        ("https://a.example/clash.yaml", Some(CLASH_A.to_string())),
        ("https://v.example/sub", Some("ss://a\n".to_string())),
    ]);
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .withf(|artifacts| {
            let names: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
            names == [CLASH_FILENAME, V2RAY_FILENAME, QUANTUMULT_X_FILENAME]
        })
        .times(1)
        .returning(|artifacts| {
            Ok(PublishReceipt {
                files: artifacts.len(),
                location: "https://gist.github.com/someone/abc".to_string(),
            })
        });

    let report = synchronise(&config, &fetcher, &publisher).await.unwrap();
    assert_eq!(report.receipt.files, 3);
    assert_eq!(report.aggregate.artifacts.len(), 3);
}

#[tokio::test]
async fn vmess_conversion_appends_only_valid_links() {
    let good = vmess_link(r#"{"ps":"converted","add":"v.example","port":"443","id":"uuid-1","net":"ws","path":"/ws"}"#);
    let bad = "vmess://e30K%%%".to_string();
    let shadow = vmess_link(r#"{"ps":"shared","add":"dupe.example","id":"uuid-2"}"#);
    let mut config = config_with(vec![
        Source::clash("https://a.example/clash.yaml"),
        Source::v2ray("https://v.example/sub"),
    ]);
    config.clash.convert_vmess = true;
    let fetcher = scripted_fetcher(vec![
        ("https://a.example/clash.yaml", Some(CLASH_A.to_string())),
        ("https://v.example/sub", Some(format!("{good}\n{bad}\n{shadow}\ntrojan://x"))),
    ]);

    let report = aggregate(&config, &fetcher).await.unwrap();
    assert_eq!(report.converted_nodes, 1);
    assert_eq!(report.structured_nodes, 3);
    // Links stay in the URI outputs untouched.
    assert_eq!(report.uri_nodes, 4);

    let clash = artifact(&report.artifacts, CLASH_FILENAME).unwrap();
    let parsed: Value = serde_yaml::from_str(&clash.content).unwrap();
    let names: Vec<_> = parsed["proxies"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, vec!["shared", "only-a", "converted"]);
    assert_eq!(parsed["proxies"][0]["server"].as_str(), Some("a.example"));
    assert_eq!(parsed["proxies"][2]["ws-opts"]["path"].as_str(), Some("/ws"));
}

#[tokio::test]
async fn rendered_groups_only_reference_rendered_nodes() {
    let many: String = std::iter::once("proxies:".to_string())
        .chain((0..120).map(|i| format!("  - {{name: n{i}, type: ss, server: s{i}.example, port: 1}}")))
        .collect::<Vec<_>>()
        .join("\n");
    let config = config_with(vec![Source::clash("https://big.example/clash.yaml")]);
    let fetcher = scripted_fetcher(vec![("https://big.example/clash.yaml", Some(many))]);

    let report = aggregate(&config, &fetcher).await.unwrap();
    let clash = artifact(&report.artifacts, CLASH_FILENAME).unwrap();
    let parsed: Value = serde_yaml::from_str(&clash.content).unwrap();

    let names: Vec<&str> = parsed["proxies"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names.len(), 120);

    let groups = parsed["proxy-groups"].as_sequence().unwrap();
    let group_names: Vec<&str> = groups.iter().filter_map(|g| g["name"].as_str()).collect();
    for group in groups {
        for member in group["proxies"].as_sequence().unwrap() {
            let member = member.as_str().unwrap();
            assert!(
                member == "DIRECT" || group_names.contains(&member) || names.contains(&member),
                "dangling reference {member}"
            );
        }
    }
    let selector = groups[0]["proxies"].as_sequence().unwrap();
    assert_eq!(selector.len(), 2 + config.clash.selector_cap);
}

#[test]
fn render_error_message_does_not_name_a_single_file() {
    let yaml_err = serde_yaml::from_str::<Value>("key: [unclosed").unwrap_err();
    let message = SyncError::from(yaml_err).to_string();
    assert!(message.starts_with("failed to render artifact"), "{message}");
    assert!(!message.contains(CLASH_FILENAME), "{message}");
}
