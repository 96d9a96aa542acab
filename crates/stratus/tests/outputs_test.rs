mod common;

use common::TestProject;
use predicates::prelude::*;
use serde_json::Value;
use stratus_cloud::{DeployState, RecordStatus, ResourceRecord};
use stratus_core::ResourceKind;

const STACK_KDL: &str = r#"
stack "demo"

service {
    image "ghcr.io/sample/web:1.0.0"
    port 8080
}
"#;

fn recorded_state() -> DeployState {
    let mut state = DeployState::new();
    state.set_record(
        "network".to_string(),
        ResourceRecord::new("net-0a1b", ResourceKind::Network).with_status(RecordStatus::Ready),
    );
    state.set_record(
        "service".to_string(),
        ResourceRecord::new("svc-9f3c", ResourceKind::Service)
            .with_status(RecordStatus::Ready)
            .with_attribute("dns_name", serde_json::json!("demo-lb.example.net")),
    );
    state
}

/// 状態がなければすべての出力は未解決になる
#[test]
fn test_outputs_are_pending_without_state() {
    let project = TestProject::new();
    project.write_stack_kdl(STACK_KDL);

    project
        .command()
        .arg("outputs")
        .assert()
        .success()
        .stdout(predicate::str::contains("service-endpoint"))
        .stdout(predicate::str::contains("(pending)"));
}

/// 記録済みの属性から出力が解決される
#[test]
fn test_outputs_resolve_from_recorded_state() {
    let project = TestProject::new();
    project.write_stack_kdl(STACK_KDL);
    project.write_state_json(&recorded_state());

    project
        .command()
        .arg("outputs")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo-lb.example.net"))
        .stdout(predicate::str::contains("http://demo-lb.example.net"))
        .stdout(predicate::str::contains("net-0a1b"));
}

/// --json で機械可読な形式になる
#[test]
fn test_outputs_json_format() {
    let project = TestProject::new();
    project.write_stack_kdl(STACK_KDL);
    project.write_state_json(&recorded_state());

    let assert = project
        .command()
        .args(["outputs", "--json"])
        .assert()
        .success();
    let outputs: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();

    let find = |name: &str| -> &Value {
        outputs
            .as_array()
            .unwrap()
            .iter()
            .find(|output| output["name"] == name)
            .unwrap_or_else(|| panic!("出力 {name} が見つからない"))
    };

    let endpoint = find("service-endpoint");
    assert_eq!(endpoint["value"]["state"], "resolved");
    assert_eq!(endpoint["value"]["value"], "demo-lb.example.net");

    let url = find("service-url");
    assert_eq!(url["value"]["value"], "http://demo-lb.example.net");

    let network_id = find("network-id");
    assert_eq!(network_id["value"]["value"], "net-0a1b");
}

/// 一部だけ記録済みなら残りは未解決のまま
#[test]
fn test_partially_recorded_state_mixes_resolved_and_pending() {
    let project = TestProject::new();
    project.write_stack_kdl(STACK_KDL);

    let mut state = DeployState::new();
    state.set_record(
        "network".to_string(),
        ResourceRecord::new("net-0a1b", ResourceKind::Network).with_status(RecordStatus::Ready),
    );
    project.write_state_json(&state);

    let assert = project
        .command()
        .args(["outputs", "--json"])
        .assert()
        .success();
    let outputs: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let outputs = outputs.as_array().unwrap();

    let state_of = |name: &str| -> &str {
        outputs
            .iter()
            .find(|output| output["name"] == name)
            .and_then(|output| output["value"]["state"].as_str())
            .unwrap()
    };

    assert_eq!(state_of("network-id"), "resolved");
    assert_eq!(state_of("service-endpoint"), "pending");
    assert_eq!(state_of("service-url"), "pending");
}
