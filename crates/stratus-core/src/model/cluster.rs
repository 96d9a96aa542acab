//! オーケストレーションクラスタ定義

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// オーケストレーションクラスタ
///
/// コンテナサービスの実行基盤。ネットワークひとつにつき一つだけ置ける。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// 所属するネットワーク
    pub network: NodeId,
    /// 詳細診断メトリクスを収集するか
    pub diagnostics: bool,
}

impl Cluster {
    pub fn new(network: NodeId) -> Self {
        Self {
            network,
            diagnostics: false,
        }
    }
}
