//! NAT 経由型トポロジー
//!
//! NAT ゲートウェイを一つ置き、タスクは非公開サブネットから NAT を
//! 通って外部へ出る。アクセス制御は実行環境の既定に任せ、専用の
//! ポリシーは宣言しない。

use super::{Catalog, ComputeService, Result, StackGraph, StackSpec, Topology};
use crate::graph::ResourceSpec;
use crate::model::{Cluster, FlowLog};

pub(super) fn build(spec: &StackSpec, catalog: &Catalog) -> Result<StackGraph> {
    let mut graph = StackGraph::new(&spec.name, Topology::Routed);

    let network = graph.add(
        "network",
        ResourceSpec::Network(super::network_from(spec, 1)),
    );

    let mut cluster_decl = Cluster::new(network);
    cluster_decl.diagnostics = spec.cluster.diagnostics.unwrap_or(false);
    let cluster = graph.add("cluster", ResourceSpec::Cluster(cluster_decl));

    let mut service_decl = ComputeService::new(cluster, super::image_from(&spec.service)?);
    super::apply_service_section(&mut service_decl, &spec.service);
    service_decl.assign_public_ip = spec.service.public_ip.unwrap_or(false);
    // コールドスタート中の失敗を数えないよう短い猶予を置く
    if service_decl.health_check_grace.is_none() {
        service_decl.health_check_grace = Some(30);
    }
    let service = graph.add("service", ResourceSpec::Service(service_decl));

    if spec.flow_logs.enabled.unwrap_or(false) {
        let sink = graph.add(
            "flow-log-sink",
            ResourceSpec::LogSink(super::sink_from(spec, catalog)),
        );
        graph.add("flow-log", ResourceSpec::FlowLog(FlowLog { network, sink }));
    }

    super::attach_health_and_scaling(&mut graph, service, spec);
    super::add_common_outputs(&mut graph, service, network);

    Ok(graph)
}
