//! 望ましい状態グラフ
//!
//! スタックを構成するリソース宣言と、適用順を決める依存辺を持つ
//! 有向非巡回グラフ。適用そのものは外部のリコンサイルエンジンが行い、
//! このグラフはシリアライズした文書として渡される。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

use crate::error::{Result, StackError};
use crate::model::{
    AccessPolicy, Cluster, ComputeService, FlowLog, HealthCheckPolicy, LogSink, Network,
    OutputValue, Peer, ScalingPolicy, Topology,
};

/// グラフ内のノードを指すハンドル
///
/// 発行元のグラフでのみ有効。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// リソース種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    AccessPolicy,
    Cluster,
    Service,
    HealthCheck,
    Scaling,
    LogSink,
    FlowLog,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::AccessPolicy => "access_policy",
            Self::Cluster => "cluster",
            Self::Service => "service",
            Self::HealthCheck => "health_check",
            Self::Scaling => "scaling",
            Self::LogSink => "log_sink",
            Self::FlowLog => "flow_log",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// リソース宣言の中身
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum ResourceSpec {
    Network(Network),
    AccessPolicy(AccessPolicy),
    Cluster(Cluster),
    Service(ComputeService),
    HealthCheck(HealthCheckPolicy),
    Scaling(ScalingPolicy),
    LogSink(LogSink),
    FlowLog(FlowLog),
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Network(_) => ResourceKind::Network,
            Self::AccessPolicy(_) => ResourceKind::AccessPolicy,
            Self::Cluster(_) => ResourceKind::Cluster,
            Self::Service(_) => ResourceKind::Service,
            Self::HealthCheck(_) => ResourceKind::HealthCheck,
            Self::Scaling(_) => ResourceKind::Scaling,
            Self::LogSink(_) => ResourceKind::LogSink,
            Self::FlowLog(_) => ResourceKind::FlowLog,
        }
    }

    /// 宣言が参照する他ノード
    ///
    /// ここで返したノードは追加時に自動で依存辺になる。
    /// ポリシーのルールが挙げる通信相手 (Peer::Policy) は適用順を
    /// 制約しないため含めない。相互参照するポリシー同士が
    /// 循環依存になるのを避けるためで、ルール自体は適用時に
    /// 独立したステップとして解決される。
    pub fn references(&self) -> Vec<NodeId> {
        match self {
            Self::Network(_) | Self::LogSink(_) => Vec::new(),
            Self::AccessPolicy(policy) => vec![policy.network],
            Self::Cluster(cluster) => vec![cluster.network],
            Self::Service(service) => {
                let mut refs = vec![service.cluster];
                refs.extend(service.task_policies.iter().copied());
                refs.extend(service.lb_policies.iter().copied());
                refs
            }
            Self::HealthCheck(health) => vec![health.service],
            Self::Scaling(scaling) => vec![scaling.service],
            Self::FlowLog(flow) => vec![flow.network, flow.sink],
        }
    }
}

/// グラフのノード (名前つきリソース宣言)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// グラフ内で一意な名前
    pub name: String,
    /// 宣言の中身
    #[serde(flatten)]
    pub spec: ResourceSpec,
    /// このノードより先に適用されるべきノード
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<NodeId>,
}

/// 望ましい状態グラフ
///
/// ノードは `add` で宣言順に追加され、宣言内の参照から依存辺が
/// 自動で張られる。参照に現れない順序制約は `depend` で足す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackGraph {
    /// スタック名
    pub name: String,
    /// 構築時のトポロジー
    pub topology: Topology,
    nodes: Vec<ResourceNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<OutputValue>,
}

impl StackGraph {
    pub fn new(name: impl Into<String>, topology: Topology) -> Self {
        Self {
            name: name.into(),
            topology,
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// リソース宣言を追加し、ハンドルを返す
    pub fn add(&mut self, name: impl Into<String>, spec: ResourceSpec) -> NodeId {
        let mut depends_on = spec.references();
        depends_on.sort();
        depends_on.dedup();

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(ResourceNode {
            name: name.into(),
            spec,
            depends_on,
        });
        id
    }

    /// 参照に現れない順序制約を追加する
    pub fn depend(&mut self, node: NodeId, on: NodeId) {
        if let Some(entry) = self.nodes.get_mut(node.0)
            && !entry.depends_on.contains(&on)
        {
            entry.depends_on.push(on);
        }
    }

    /// スタック出力を追加する
    pub fn add_output(&mut self, output: OutputValue) {
        self.outputs.push(output);
    }

    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id.0)
    }

    /// 追加済みノードの宣言を書き換える
    ///
    /// 相互参照するポリシーのように、あとから判明するハンドルを
    /// ルールへ差し込むために使う。
    pub fn spec_mut(&mut self, id: NodeId) -> Option<&mut ResourceSpec> {
        self.nodes.get_mut(id.0).map(|node| &mut node.spec)
    }

    /// 全ノードをハンドルつきで列挙する
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ResourceNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::new(index), node))
    }

    /// 指定種別のノードを列挙する
    pub fn nodes_of_kind(&self, kind: ResourceKind) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.spec.kind() == kind)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn outputs(&self) -> &[OutputValue] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 依存を尊重した適用順を返す
    ///
    /// 同着は宣言順で安定させる。循環があればエラー。
    pub fn apply_order(&self) -> Result<Vec<NodeId>> {
        let mut indegree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];

        for (index, node) in self.nodes.iter().enumerate() {
            for dep in &node.depends_on {
                if dep.0 >= self.nodes.len() {
                    return Err(StackError::InvalidDeclaration(format!(
                        "'{}' の依存先 {} が存在しません",
                        node.name, dep
                    )));
                }
                indegree[index] += 1;
                dependents[dep.0].push(index);
            }
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| index)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed = vec![false; self.nodes.len()];

        while let Some(&index) = ready.iter().next() {
            ready.remove(&index);
            placed[index] = true;
            order.push(NodeId::new(index));

            for &dependent in &dependents[index] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck: Vec<&str> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(index, _)| !placed[*index])
                .map(|(_, node)| node.name.as_str())
                .collect();
            return Err(StackError::CircularDependency(stuck.join(", ")));
        }

        Ok(order)
    }

    /// グラフ全体の整合性を確認する
    ///
    /// 名前の一意性、参照の妥当性、各宣言の不変条件、循環の有無を
    /// 検査する。暗黙の了解にとどまる項目 (interval と timeout の
    /// 大小など) はエラーにせず警告を出す。
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(StackError::InvalidDeclaration(format!(
                    "リソース名が重複しています: {}",
                    node.name
                )));
            }
        }

        for (id, node) in self.nodes() {
            self.validate_node(id, node)?;
        }

        // ネットワークごとにクラスタは一つまで
        let mut clusters_per_network: HashMap<NodeId, usize> = HashMap::new();
        for (_, node) in self.nodes() {
            if let ResourceSpec::Cluster(cluster) = &node.spec {
                *clusters_per_network.entry(cluster.network).or_default() += 1;
            }
        }
        for (network, count) in clusters_per_network {
            if count > 1 {
                let name = self
                    .node(network)
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| network.to_string());
                return Err(StackError::InvalidDeclaration(format!(
                    "ネットワーク '{}' に複数のクラスタが宣言されています",
                    name
                )));
            }
        }

        self.apply_order()?;
        Ok(())
    }

    fn validate_node(&self, id: NodeId, node: &ResourceNode) -> Result<()> {
        for dep in &node.depends_on {
            if self.node(*dep).is_none() {
                return Err(StackError::InvalidDeclaration(format!(
                    "'{}' の依存先 {} が存在しません",
                    node.name, dep
                )));
            }
        }

        match &node.spec {
            ResourceSpec::Network(network) => {
                if network.zones == 0 {
                    return Err(StackError::InvalidDeclaration(format!(
                        "ネットワーク '{}' のゾーン数は 1 以上が必要です",
                        node.name
                    )));
                }
            }
            ResourceSpec::AccessPolicy(policy) => {
                self.expect_kind(node, policy.network, ResourceKind::Network)?;
                for peer in policy.peer_policies() {
                    self.expect_kind(node, peer, ResourceKind::AccessPolicy)?;
                }
            }
            ResourceSpec::Cluster(cluster) => {
                self.expect_kind(node, cluster.network, ResourceKind::Network)?;
            }
            ResourceSpec::Service(service) => {
                self.expect_kind(node, service.cluster, ResourceKind::Cluster)?;
                for policy in service.task_policies.iter().chain(&service.lb_policies) {
                    self.expect_kind(node, *policy, ResourceKind::AccessPolicy)?;
                }
                self.validate_service(id, node, service)?;
            }
            ResourceSpec::HealthCheck(health) => {
                self.expect_kind(node, health.service, ResourceKind::Service)?;
                if health.interval <= health.timeout {
                    warn!(
                        node = %node.name,
                        interval = health.interval,
                        timeout = health.timeout,
                        "ヘルスチェックの interval が timeout 以下です"
                    );
                }
            }
            ResourceSpec::Scaling(scaling) => {
                self.expect_kind(node, scaling.service, ResourceKind::Service)?;
                if scaling.min_count > scaling.max_count {
                    return Err(StackError::InvalidDeclaration(format!(
                        "スケーリング '{}' の下限 {} が上限 {} を超えています",
                        node.name, scaling.min_count, scaling.max_count
                    )));
                }
                if scaling.target_cpu == 0 || scaling.target_cpu > 100 {
                    return Err(StackError::InvalidDeclaration(format!(
                        "スケーリング '{}' の目標 CPU 使用率 {} は 1..=100 の範囲が必要です",
                        node.name, scaling.target_cpu
                    )));
                }
            }
            ResourceSpec::LogSink(_) => {}
            ResourceSpec::FlowLog(flow) => {
                self.expect_kind(node, flow.network, ResourceKind::Network)?;
                self.expect_kind(node, flow.sink, ResourceKind::LogSink)?;
            }
        }

        Ok(())
    }

    fn validate_service(
        &self,
        id: NodeId,
        node: &ResourceNode,
        service: &ComputeService,
    ) -> Result<()> {
        // タスク側ポリシーの内向き許可はコンテナポートと一致しなければならない
        for policy_id in &service.task_policies {
            if let Some(ResourceSpec::AccessPolicy(policy)) = self.node(*policy_id).map(|n| &n.spec)
                && !policy.ingress.is_empty()
                && !policy.permits_ingress(service.container_port)
            {
                return Err(StackError::InvalidDeclaration(format!(
                    "サービス '{}' のポート {} がポリシー '{}' の許可と一致しません",
                    node.name,
                    service.container_port,
                    self.node(*policy_id).map(|n| n.name.as_str()).unwrap_or("?")
                )));
            }
        }

        // スケーリングの下限より少ない希望実行数は適用直後に増やされてしまう
        for (_, other) in self.nodes() {
            if let ResourceSpec::Scaling(scaling) = &other.spec
                && scaling.service == id
                && service.desired_count < scaling.min_count
            {
                return Err(StackError::InvalidDeclaration(format!(
                    "サービス '{}' の希望実行数 {} がスケーリング下限 {} を下回っています",
                    node.name, service.desired_count, scaling.min_count
                )));
            }
        }

        // NAT なしの非公開サブネットからはイメージ取得に失敗する
        if !service.assign_public_ip
            && let Some(network) = self.network_of_service(service)
            && !network.has_private_egress()
        {
            warn!(
                node = %node.name,
                "NAT ゲートウェイがなくパブリック IP も持たないため、タスクが外部へ到達できません"
            );
        }

        Ok(())
    }

    /// サービスからクラスタ経由で所属ネットワークを引く
    fn network_of_service(&self, service: &ComputeService) -> Option<&Network> {
        let cluster = match self.node(service.cluster).map(|n| &n.spec) {
            Some(ResourceSpec::Cluster(cluster)) => cluster,
            _ => return None,
        };
        match self.node(cluster.network).map(|n| &n.spec) {
            Some(ResourceSpec::Network(network)) => Some(network),
            _ => None,
        }
    }

    fn expect_kind(&self, from: &ResourceNode, target: NodeId, kind: ResourceKind) -> Result<()> {
        match self.node(target) {
            Some(node) if node.spec.kind() == kind => Ok(()),
            Some(node) => Err(StackError::InvalidDeclaration(format!(
                "'{}' が参照する '{}' は {} ではなく {} です",
                from.name,
                node.name,
                kind,
                node.spec.kind()
            ))),
            None => Err(StackError::InvalidDeclaration(format!(
                "'{}' の参照先 {} が存在しません",
                from.name, target
            ))),
        }
    }

    /// リコンサイルエンジンへ渡す JSON 文書にシリアライズする
    pub fn to_document(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
