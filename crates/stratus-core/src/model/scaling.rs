//! スケーリングポリシー定義

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// CPU 使用率に応じたスケーリングポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    /// 対象サービス
    pub service: NodeId,
    /// 実行数の下限
    pub min_count: u32,
    /// 実行数の上限
    pub max_count: u32,
    /// 目標 CPU 使用率 (パーセント、0 より大きく 100 以下)
    pub target_cpu: u32,
    /// 縮小後の再評価待ち (秒)
    pub scale_in_cooldown: u64,
    /// 拡大後の再評価待ち (秒)
    pub scale_out_cooldown: u64,
}

impl ScalingPolicy {
    pub fn new(service: NodeId) -> Self {
        Self {
            service,
            min_count: 1,
            max_count: 2,
            target_cpu: 70,
            scale_in_cooldown: 60,
            scale_out_cooldown: 60,
        }
    }
}
