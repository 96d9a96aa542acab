//! ヘルスチェックセクションのパース

use crate::error::Result;
use crate::model::HealthSection;
use kdl::KdlNode;

/// healthcheckノードをパース
///
/// KDL形式：
/// ```kdl
/// healthcheck "/health" interval=15 timeout=5 codes="200"
/// ```
pub(super) fn parse_healthcheck(node: &KdlNode) -> Result<HealthSection> {
    let mut section = HealthSection::default();

    section.path = node
        .get("path")
        .and_then(|v| v.as_string())
        .map(String::from)
        .or_else(|| {
            node.entries()
                .iter()
                .find(|e| e.name().is_none())
                .and_then(|e| e.value().as_string())
                .map(String::from)
        });

    section.codes = node
        .get("codes")
        .and_then(|v| v.as_string())
        .map(String::from);

    section.interval = node
        .get("interval")
        .and_then(|v| v.as_integer())
        .map(|v| v as u64);

    section.timeout = node
        .get("timeout")
        .and_then(|v| v.as_integer())
        .map(|v| v as u64);

    Ok(section)
}
