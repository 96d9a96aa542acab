//! ネットワークとクラスタのパース

use crate::error::Result;
use crate::model::{ClusterSection, NetworkSection};
use kdl::KdlNode;

/// networkノードをパース
///
/// KDL形式：
/// ```kdl
/// network {
///     cidr "10.1.0.0/16"
///     zones 2
///     nat-gateways 1
/// }
/// ```
pub(super) fn parse_network(node: &KdlNode) -> Result<NetworkSection> {
    let mut section = NetworkSection::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "cidr" => {
                    section.cidr = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(String::from);
                }
                "zones" => {
                    section.zones = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u8);
                }
                "nat-gateways" | "nat_gateways" => {
                    section.nat_gateways = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u8);
                }
                _ => {}
            }
        }
    }

    Ok(section)
}

/// clusterノードをパース
///
/// KDL形式：
/// ```kdl
/// cluster {
///     diagnostics #true
/// }
/// ```
pub(super) fn parse_cluster(node: &KdlNode) -> Result<ClusterSection> {
    let mut section = ClusterSection::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "diagnostics" {
                section.diagnostics = child.entries().first().and_then(|e| e.value().as_bool());
            }
        }
    }

    // cluster diagnostics=#true の短縮形も受け付ける
    if let Some(value) = node.get("diagnostics").and_then(|v| v.as_bool()) {
        section.diagnostics = Some(value);
    }

    Ok(section)
}
