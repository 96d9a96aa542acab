//! アクセス制御ポリシー定義

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// アクセス制御ポリシー
///
/// リソースに出入りできる通信を許可ルールの集合で表す。
/// 許可のみを積み上げる加算型で、拒否ルールは表現できない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// 所属するネットワーク
    pub network: NodeId,
    /// ポリシーの説明
    pub description: String,
    /// 全ての外向き通信を暗黙に許可するか
    pub allow_all_outbound: bool,
    /// 内向き許可ルール
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<FlowRule>,
    /// 外向き許可ルール
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<FlowRule>,
}

impl AccessPolicy {
    pub fn new(network: NodeId, description: impl Into<String>) -> Self {
        Self {
            network,
            description: description.into(),
            allow_all_outbound: false,
            ingress: Vec::new(),
            egress: Vec::new(),
        }
    }

    /// 全外向き許可つきで作成
    pub fn with_open_egress(network: NodeId, description: impl Into<String>) -> Self {
        let mut policy = Self::new(network, description);
        policy.allow_all_outbound = true;
        policy
    }

    /// 内向きルールを追加
    pub fn allow_ingress(&mut self, rule: FlowRule) -> &mut Self {
        self.ingress.push(rule);
        self
    }

    /// 外向きルールを追加
    pub fn allow_egress(&mut self, rule: FlowRule) -> &mut Self {
        self.egress.push(rule);
        self
    }

    /// 指定ポートへの内向き通信を許可しているか
    pub fn permits_ingress(&self, port: u16) -> bool {
        self.ingress.iter().any(|rule| rule.ports.contains(port))
    }

    /// ルールが参照する他ポリシーの一覧
    pub fn peer_policies(&self) -> Vec<NodeId> {
        self.ingress
            .iter()
            .chain(self.egress.iter())
            .filter_map(|rule| match rule.peer {
                Peer::Policy { node } => Some(node),
                _ => None,
            })
            .collect()
    }
}

/// 通信許可ルール
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRule {
    /// 通信相手
    pub peer: Peer,
    /// プロトコル
    pub protocol: Protocol,
    /// 対象ポート
    pub ports: PortRange,
    /// ルールの説明
    pub note: String,
}

impl FlowRule {
    /// 単一 TCP ポートの許可ルール
    pub fn tcp(peer: Peer, port: u16, note: impl Into<String>) -> Self {
        Self {
            peer,
            protocol: Protocol::Tcp,
            ports: PortRange::Single { port },
            note: note.into(),
        }
    }

    /// 全プロトコル・全ポートの許可ルール
    pub fn all_traffic(peer: Peer, note: impl Into<String>) -> Self {
        Self {
            peer,
            protocol: Protocol::All,
            ports: PortRange::All,
            note: note.into(),
        }
    }
}

/// 通信相手の指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Peer {
    /// 任意の IPv4 アドレス
    AnyIpv4,
    /// 別のアクセス制御ポリシーが付与されたリソース群
    Policy { node: NodeId },
}

/// プロトコル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    /// 全プロトコル
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::All => "all",
        }
    }
}

/// ポート範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortRange {
    /// 全ポート
    All,
    /// 単一ポート
    Single { port: u16 },
    /// 連続した範囲 (両端を含む)
    Range { from: u16, to: u16 },
}

impl PortRange {
    /// 指定ポートが範囲に含まれるか
    pub fn contains(&self, port: u16) -> bool {
        match self {
            Self::All => true,
            Self::Single { port: p } => *p == port,
            Self::Range { from, to } => (*from..=*to).contains(&port),
        }
    }
}
