//! フローログセクションのパース

use crate::error::Result;
use crate::model::FlowLogSection;
use kdl::KdlNode;

/// flow-logsノードをパース
///
/// KDL形式：
/// ```kdl
/// flow-logs enabled=#true sink="/network/flow-logs/demo" retention-days=30
/// ```
///
/// `flow-logs #false` のように最初の引数だけで有効・無効を切り替える
/// 書き方も受け付ける。
pub(super) fn parse_flow_logs(node: &KdlNode) -> Result<FlowLogSection> {
    let mut section = FlowLogSection::default();

    section.enabled = node.get("enabled").and_then(|v| v.as_bool()).or_else(|| {
        node.entries()
            .iter()
            .find(|e| e.name().is_none())
            .and_then(|e| e.value().as_bool())
    });

    section.sink = node
        .get("sink")
        .and_then(|v| v.as_string())
        .map(String::from);

    section.retention_days = node
        .get("retention-days")
        .or_else(|| node.get("retention_days"))
        .and_then(|v| v.as_integer())
        .map(|v| v as u32);

    Ok(section)
}
