//! スタック出力の定義

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// リソース属性の既知キー
pub mod attr {
    /// リソース ID (全リソース共通)
    pub const ID: &str = "id";
    /// 負荷分散装置の DNS 名
    pub const DNS_NAME: &str = "dns_name";
}

/// スタック出力
///
/// 適用が終わってはじめて確定する値を、名前つきで公開する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    /// 出力名
    pub name: String,
    /// 説明
    pub description: String,
    /// 値の式
    pub value: OutputExpr,
}

/// 出力値の式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputExpr {
    /// 固定文字列
    Literal { text: String },
    /// リソース属性への参照 ("id" はリソース ID 自体を指す)
    Attribute { node: NodeId, attribute: String },
    /// 部分式の連結
    Concat { parts: Vec<OutputExpr> },
}

impl OutputExpr {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal { text: text.into() }
    }

    pub fn attribute(node: NodeId, attribute: impl Into<String>) -> Self {
        Self::Attribute {
            node,
            attribute: attribute.into(),
        }
    }

    /// 式が参照するノードの一覧
    pub fn references(&self) -> Vec<NodeId> {
        match self {
            Self::Literal { .. } => Vec::new(),
            Self::Attribute { node, .. } => vec![*node],
            Self::Concat { parts } => parts.iter().flat_map(|p| p.references()).collect(),
        }
    }
}
