//! 分離ネットワーク定義

use serde::{Deserialize, Serialize};

/// 分離ネットワーク
///
/// スタック内のリソースを収容する専用のアドレス空間。
/// ゾーンごとに公開サブネットと非公開サブネットが確保される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// アドレス空間 (CIDR 表記)
    pub cidr: String,
    /// 使用する可用性ゾーン数
    pub zones: u8,
    /// NAT ゲートウェイ数 (0 なら非公開サブネットから外部への経路なし)
    pub nat_gateways: u8,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            zones: 2,
            nat_gateways: 0,
        }
    }
}

impl Network {
    /// 非公開サブネットから外部への経路を持つか
    pub fn has_private_egress(&self) -> bool {
        self.nat_gateways > 0
    }
}
