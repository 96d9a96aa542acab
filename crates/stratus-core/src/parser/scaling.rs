//! スケーリングセクションのパース

use crate::error::Result;
use crate::model::ScalingSection;
use kdl::KdlNode;

/// scalingノードをパース
///
/// KDL形式：
/// ```kdl
/// scaling min=1 max=2 target-cpu=70 scale-in-cooldown=60 scale-out-cooldown=60
/// ```
pub(super) fn parse_scaling(node: &KdlNode) -> Result<ScalingSection> {
    let mut section = ScalingSection::default();

    section.min = node
        .get("min")
        .and_then(|v| v.as_integer())
        .map(|v| v as u32);

    section.max = node
        .get("max")
        .and_then(|v| v.as_integer())
        .map(|v| v as u32);

    section.target_cpu = node
        .get("target-cpu")
        .or_else(|| node.get("target_cpu"))
        .and_then(|v| v.as_integer())
        .map(|v| v as u32);

    section.scale_in_cooldown = node
        .get("scale-in-cooldown")
        .or_else(|| node.get("scale_in_cooldown"))
        .and_then(|v| v.as_integer())
        .map(|v| v as u64);

    section.scale_out_cooldown = node
        .get("scale-out-cooldown")
        .or_else(|| node.get("scale_out_cooldown"))
        .and_then(|v| v.as_integer())
        .map(|v| v as u64);

    Ok(section)
}
