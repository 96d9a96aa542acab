//! ヘルスチェックポリシー定義

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// ヘルスチェックポリシー
///
/// 負荷分散装置がサービスの各タスクへ定期的に問い合わせ、
/// 応答状態で通信を振り分けるかを判断する。
/// interval は timeout より大きくなければ問い合わせが重なる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckPolicy {
    /// 対象サービス
    pub service: NodeId,
    /// 問い合わせ先パス
    pub path: String,
    /// 正常とみなす HTTP ステータスコード (例: "200", "200-299")
    pub healthy_codes: String,
    /// 問い合わせ間隔 (秒)
    pub interval: u64,
    /// 応答待ちの上限 (秒)
    pub timeout: u64,
}

impl HealthCheckPolicy {
    pub fn new(service: NodeId) -> Self {
        Self {
            service,
            path: "/health".to_string(),
            healthy_codes: "200".to_string(),
            interval: 15,
            timeout: 5,
        }
    }
}
