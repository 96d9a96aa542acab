//! ネットワーク防御型トポロジー
//!
//! NAT ゲートウェイを置かないかわりに、専用のアクセス制御ポリシーで
//! 入口と出口の両方を絞る。タスクはパブリック IP を持って公開
//! サブネットで動き、ネットワークの全トラフィックをフローログに残す。

use super::{
    Catalog, ComputeService, OutputExpr, OutputValue, Result, StackGraph, StackSpec, Topology, attr,
};
use crate::graph::ResourceSpec;
use crate::model::{AccessPolicy, Cluster, FlowLog, FlowRule, Peer};

pub(super) fn build(spec: &StackSpec, catalog: &Catalog) -> Result<StackGraph> {
    let mut graph = StackGraph::new(&spec.name, Topology::Hardened);
    let container_port = spec.service.port.unwrap_or(8080);

    let network = graph.add(
        "network",
        ResourceSpec::Network(super::network_from(spec, 0)),
    );

    // 入口は 80/443 だけを受け付け、暗黙の外向き許可は切っておく
    let mut lb_policy = AccessPolicy::new(network, "負荷分散装置の入口ポリシー");
    lb_policy.allow_ingress(FlowRule::tcp(Peer::AnyIpv4, 80, "HTTP を受け付ける"));
    lb_policy.allow_ingress(FlowRule::tcp(Peer::AnyIpv4, 443, "HTTPS を受け付ける"));
    let lb_policy = graph.add("lb-policy", ResourceSpec::AccessPolicy(lb_policy));

    // タスク側は負荷分散装置からの通信だけを受け付ける。
    // 外向きは暗黙許可に加えて明示の全許可ルールも宣言する
    let mut task_policy = AccessPolicy::with_open_egress(network, "タスク側の入口ポリシー");
    task_policy.allow_egress(FlowRule::all_traffic(
        Peer::AnyIpv4,
        "全ての外向き通信を許可する",
    ));
    task_policy.allow_ingress(FlowRule::tcp(
        Peer::Policy { node: lb_policy },
        container_port,
        "負荷分散装置からのみ受け付ける",
    ));
    let task_policy = graph.add("service-policy", ResourceSpec::AccessPolicy(task_policy));

    // 出口ルールは相手のハンドルが要るので、あとから差し込む
    if let Some(ResourceSpec::AccessPolicy(policy)) = graph.spec_mut(lb_policy) {
        policy.allow_egress(FlowRule::tcp(
            Peer::Policy { node: task_policy },
            container_port,
            "タスクのポートへだけ送る",
        ));
    }

    let mut cluster_decl = Cluster::new(network);
    cluster_decl.diagnostics = spec.cluster.diagnostics.unwrap_or(true);
    let cluster = graph.add("cluster", ResourceSpec::Cluster(cluster_decl));

    if spec.flow_logs.enabled.unwrap_or(true) {
        let sink = graph.add(
            "flow-log-sink",
            ResourceSpec::LogSink(super::sink_from(spec, catalog)),
        );
        graph.add("flow-log", ResourceSpec::FlowLog(FlowLog { network, sink }));
    }

    let mut service_decl = ComputeService::new(cluster, super::image_from(&spec.service)?);
    super::apply_service_section(&mut service_decl, &spec.service);
    // NAT がないため、タスクはパブリック IP で直接外部へ出る
    service_decl.assign_public_ip = spec.service.public_ip.unwrap_or(true);
    service_decl.task_policies = vec![task_policy];
    service_decl.lb_policies = vec![lb_policy];
    let service = graph.add("service", ResourceSpec::Service(service_decl));

    super::attach_health_and_scaling(&mut graph, service, spec);

    super::add_common_outputs(&mut graph, service, network);
    graph.add_output(OutputValue {
        name: "service-policy-id".to_string(),
        description: "タスク側ポリシーのリソース ID".to_string(),
        value: OutputExpr::attribute(task_policy, attr::ID),
    });

    Ok(graph)
}
