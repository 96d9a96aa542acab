//! スタックブループリント
//!
//! スタック定義とトポロジーから望ましい状態グラフを組み立てる。
//! 構築は純粋で、クラウドへの副作用を持たない。既存リソースの
//! 有無はカタログへの問い合わせだけで判断する。

mod hardened;
mod routed;

use tracing::info;

use crate::catalog::Catalog;
use crate::error::{Result, StackError};
use crate::graph::{NodeId, ResourceSpec, StackGraph};
use crate::model::{
    ComputeService, HealthCheckPolicy, ImageSource, LogSink, Network, OutputExpr, OutputValue,
    ScalingPolicy, ServiceSection, StackSpec, Topology, attr,
};

/// グラフを組み立てる
pub fn build(spec: &StackSpec, topology: Topology, catalog: &Catalog) -> Result<StackGraph> {
    if spec.name.is_empty() {
        return Err(StackError::InvalidConfig(
            "スタック名が指定されていません".to_string(),
        ));
    }

    info!(stack = %spec.name, topology = %topology, "グラフを構築します");

    match topology {
        Topology::Hardened => hardened::build(spec, catalog),
        Topology::Routed => routed::build(spec, catalog),
    }
}

/// ネットワーク宣言を組み立てる
///
/// NAT ゲートウェイ数の既定値だけがトポロジーで変わる。
fn network_from(spec: &StackSpec, default_nat: u8) -> Network {
    let defaults = Network::default();
    Network {
        cidr: spec
            .network
            .cidr
            .clone()
            .unwrap_or(defaults.cidr),
        zones: spec.network.zones.unwrap_or(defaults.zones),
        nat_gateways: spec.network.nat_gateways.unwrap_or(default_nat),
    }
}

/// イメージの取得元を決める
fn image_from(section: &ServiceSection) -> Result<ImageSource> {
    if let Some(build) = &section.build {
        return Ok(ImageSource::Build {
            context: build.context.clone().into(),
            dockerfile: build.dockerfile.clone().map(Into::into),
        });
    }
    if let Some(image) = &section.image {
        return Ok(ImageSource::Registry {
            image: image.clone(),
        });
    }
    Err(StackError::MissingImage)
}

/// サービス宣言へセクションの上書きを反映する
fn apply_service_section(service: &mut ComputeService, section: &ServiceSection) {
    if let Some(cpu) = section.cpu {
        service.cpu = cpu;
    }
    if let Some(memory) = section.memory {
        service.memory = memory;
    }
    if let Some(count) = section.count {
        service.desired_count = count;
    }
    if let Some(port) = section.port {
        service.container_port = port;
    }
    if let Some(grace) = section.grace_seconds {
        service.health_check_grace = Some(grace);
    }
    service.environment.extend(
        section
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
}

/// ヘルスチェックとスケーリングをサービスへ取り付ける
fn attach_health_and_scaling(graph: &mut StackGraph, service: NodeId, spec: &StackSpec) {
    let mut health = HealthCheckPolicy::new(service);
    if let Some(path) = &spec.healthcheck.path {
        health.path = path.clone();
    }
    if let Some(codes) = &spec.healthcheck.codes {
        health.healthy_codes = codes.clone();
    }
    if let Some(interval) = spec.healthcheck.interval {
        health.interval = interval;
    }
    if let Some(timeout) = spec.healthcheck.timeout {
        health.timeout = timeout;
    }
    graph.add("health-check", ResourceSpec::HealthCheck(health));

    let mut scaling = ScalingPolicy::new(service);
    if let Some(min) = spec.scaling.min {
        scaling.min_count = min;
    }
    if let Some(max) = spec.scaling.max {
        scaling.max_count = max;
    }
    if let Some(target) = spec.scaling.target_cpu {
        scaling.target_cpu = target;
    }
    if let Some(cooldown) = spec.scaling.scale_in_cooldown {
        scaling.scale_in_cooldown = cooldown;
    }
    if let Some(cooldown) = spec.scaling.scale_out_cooldown {
        scaling.scale_out_cooldown = cooldown;
    }
    graph.add("cpu-scaling", ResourceSpec::Scaling(scaling));
}

/// フローログのシンク名を決める
fn sink_name_for(spec: &StackSpec) -> String {
    spec.flow_logs
        .sink
        .clone()
        .unwrap_or_else(|| format!("/network/flow-logs/{}", spec.name))
}

/// ログシンクの宣言を組み立てる
///
/// 同名のシンクが既にあれば参照し、なければ新規作成を宣言する。
/// 同じ定義を繰り返し適用しても重複作成にならない。
fn sink_from(spec: &StackSpec, catalog: &Catalog) -> LogSink {
    let name = sink_name_for(spec);
    match catalog.log_sink(&name) {
        Some(existing) => {
            info!(sink = %name, id = %existing.id, "既存のログシンクを参照します");
            LogSink::reference(name, existing.id.clone())
        }
        None => {
            let retention = spec.flow_logs.retention_days.unwrap_or(30);
            LogSink::create(name, retention)
        }
    }
}

/// 両トポロジー共通のスタック出力を登録する
fn add_common_outputs(graph: &mut StackGraph, service: NodeId, network: NodeId) {
    graph.add_output(OutputValue {
        name: "service-endpoint".to_string(),
        description: "負荷分散装置の DNS 名".to_string(),
        value: OutputExpr::attribute(service, attr::DNS_NAME),
    });
    graph.add_output(OutputValue {
        name: "service-url".to_string(),
        description: "サービスの URL".to_string(),
        value: OutputExpr::Concat {
            parts: vec![
                OutputExpr::literal("http://"),
                OutputExpr::attribute(service, attr::DNS_NAME),
            ],
        },
    });
    graph.add_output(OutputValue {
        name: "network-id".to_string(),
        description: "ネットワークのリソース ID".to_string(),
        value: OutputExpr::attribute(network, attr::ID),
    });
}
