//! フローログとログシンクの定義

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// ログシンク
///
/// フローログの書き込み先。名前は環境内で一意で、既に同名のシンクが
/// あれば参照し、なければ新規に作成する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSink {
    /// シンク名
    pub name: String,
    /// 作成するか、既存を参照するか
    pub mode: SinkMode,
}

impl LogSink {
    /// 新規作成するシンク
    pub fn create(name: impl Into<String>, retention_days: u32) -> Self {
        Self {
            name: name.into(),
            mode: SinkMode::Create { retention_days },
        }
    }

    /// 既存シンクへの参照
    pub fn reference(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: SinkMode::Reference { id: id.into() },
        }
    }

    /// 適用時に新規作成されるか
    pub fn creates(&self) -> bool {
        matches!(self.mode, SinkMode::Create { .. })
    }
}

/// ログシンクの扱い
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkMode {
    /// 新規作成する
    Create {
        /// 保持期間 (日)
        retention_days: u32,
    },
    /// 既存シンクを参照する
    Reference {
        /// 既存シンクのリソース ID
        id: String,
    },
}

/// フローログ
///
/// ネットワークを流れる全トラフィックのメタデータをログシンクへ送る。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLog {
    /// 監視対象ネットワーク
    pub network: NodeId,
    /// 書き込み先シンク
    pub sink: NodeId,
}
