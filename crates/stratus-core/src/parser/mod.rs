//! KDLパーサー
//!
//! Stratusのstack.kdl設定ファイルをパースします。
//! 各セクションのパース処理はモジュールに分離されています。

mod health;
mod logs;
mod network;
mod scaling;
mod service;

use health::parse_healthcheck;
use logs::parse_flow_logs;
use network::{parse_cluster, parse_network};
use scaling::parse_scaling;
use service::parse_service;

use crate::error::{Result, StackError};
use crate::model::{StackSpec, Topology};
use kdl::KdlDocument;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてStackSpecを生成
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackSpec> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_stack_string(&content, name)
}

/// KDL文字列をパース
pub fn parse_stack_string(content: &str, default_name: String) -> Result<StackSpec> {
    let doc: KdlDocument = content.parse()?;

    let mut spec = StackSpec {
        name: default_name,
        ..Default::default()
    };

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                if let Some(stack_name) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    spec.name = stack_name.to_string();
                }
                if let Some(topology) = node.get("topology").and_then(|v| v.as_string()) {
                    spec.topology = Some(
                        Topology::parse(topology)
                            .ok_or_else(|| StackError::UnknownTopology(topology.to_string()))?,
                    );
                }
            }
            "network" => {
                spec.network = parse_network(node)?;
            }
            "cluster" => {
                spec.cluster = parse_cluster(node)?;
            }
            "service" => {
                spec.service = parse_service(node)?;
            }
            "healthcheck" => {
                spec.healthcheck = parse_healthcheck(node)?;
            }
            "scaling" => {
                spec.scaling = parse_scaling(node)?;
            }
            "flow-logs" | "flow_logs" => {
                spec.flow_logs = parse_flow_logs(node)?;
            }
            "variables" => {
                // 変数はテンプレート展開の段階で処理済み
            }
            _ => {
                // 不明なノードはスキップ
            }
        }
    }

    Ok(spec)
}
