//! スタック定義 (stack.kdl の内容)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// スタックのトポロジー
///
/// 同じサービスをどのネットワーク構成で動かすかを選ぶ。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// 専用のアクセス制御ポリシーで通信を絞り、タスクは公開サブネットに置く。
    /// NAT を使わないぶんフローログで全トラフィックを記録する。
    #[default]
    Hardened,
    /// NAT ゲートウェイ経由の既定構成。タスクは非公開サブネットに置き、
    /// ポリシーは実行環境の既定に任せる。
    Routed,
}

impl Topology {
    /// 文字列からパース
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hardened" => Some(Self::Hardened),
            "routed" => Some(Self::Routed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hardened => "hardened",
            Self::Routed => "routed",
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// スタック定義
///
/// KDL形式：
/// ```kdl
/// stack "hello-web" topology="hardened"
///
/// service {
///     build context="./app"
///     port 8080
///     env {
///         APP_MODE "production"
///     }
/// }
/// ```
///
/// 各セクションは省略可能で、省略された値にはトポロジーごとの
/// 既定値が使われる。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    /// スタック名
    pub name: String,
    /// トポロジー (CLI から上書きできる)
    pub topology: Option<Topology>,
    /// ネットワーク設定
    #[serde(default)]
    pub network: NetworkSection,
    /// クラスタ設定
    #[serde(default)]
    pub cluster: ClusterSection,
    /// サービス設定
    #[serde(default)]
    pub service: ServiceSection,
    /// ヘルスチェック設定
    #[serde(default)]
    pub healthcheck: HealthSection,
    /// スケーリング設定
    #[serde(default)]
    pub scaling: ScalingSection,
    /// フローログ設定
    #[serde(default)]
    pub flow_logs: FlowLogSection,
}

impl StackSpec {
    /// 他のStackSpecをマージする
    ///
    /// otherで定義されたフィールドが優先される（オーバーライド）。
    /// - Option<T>: otherがSomeならそれを使用、Noneなら元の値を維持
    /// - HashMap<K, V>: 元の値にotherの値をマージ（otherが優先）
    pub fn merge(&mut self, other: StackSpec) {
        if !other.name.is_empty() {
            self.name = other.name;
        }
        if other.topology.is_some() {
            self.topology = other.topology;
        }
        self.network.merge(other.network);
        self.cluster.merge(other.cluster);
        self.service.merge(other.service);
        self.healthcheck.merge(other.healthcheck);
        self.scaling.merge(other.scaling);
        self.flow_logs.merge(other.flow_logs);
    }
}

/// ネットワークセクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSection {
    /// アドレス空間 (CIDR 表記)
    pub cidr: Option<String>,
    /// 可用性ゾーン数
    pub zones: Option<u8>,
    /// NAT ゲートウェイ数
    pub nat_gateways: Option<u8>,
}

impl NetworkSection {
    pub fn merge(&mut self, other: NetworkSection) {
        if other.cidr.is_some() {
            self.cidr = other.cidr;
        }
        if other.zones.is_some() {
            self.zones = other.zones;
        }
        if other.nat_gateways.is_some() {
            self.nat_gateways = other.nat_gateways;
        }
    }
}

/// クラスタセクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSection {
    /// 詳細診断メトリクスの収集
    pub diagnostics: Option<bool>,
}

impl ClusterSection {
    pub fn merge(&mut self, other: ClusterSection) {
        if other.diagnostics.is_some() {
            self.diagnostics = other.diagnostics;
        }
    }
}

/// サービスセクション
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    /// レジストリ上のイメージ (build と排他)
    pub image: Option<String>,
    /// ローカルビルド設定 (image と排他)
    pub build: Option<BuildSection>,
    /// CPU ユニット
    pub cpu: Option<u32>,
    /// メモリ上限 (MiB)
    pub memory: Option<u32>,
    /// 希望実行数
    pub count: Option<u32>,
    /// コンテナの待ち受けポート
    pub port: Option<u16>,
    /// コンテナに渡す環境変数
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// タスクへのパブリック IP 割り当て
    pub public_ip: Option<bool>,
    /// ヘルスチェックの起動猶予 (秒)
    pub grace_seconds: Option<u64>,
}

impl ServiceSection {
    pub fn merge(&mut self, other: ServiceSection) {
        if other.image.is_some() {
            self.image = other.image;
        }
        if other.build.is_some() {
            self.build = other.build;
        }
        if other.cpu.is_some() {
            self.cpu = other.cpu;
        }
        if other.memory.is_some() {
            self.memory = other.memory;
        }
        if other.count.is_some() {
            self.count = other.count;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.public_ip.is_some() {
            self.public_ip = other.public_ip;
        }
        if other.grace_seconds.is_some() {
            self.grace_seconds = other.grace_seconds;
        }
        for (key, value) in other.env {
            self.env.insert(key, value);
        }
    }
}

/// ビルド設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSection {
    /// ビルドコンテキストのパス
    pub context: String,
    /// Dockerfile のパス
    pub dockerfile: Option<String>,
}

/// ヘルスチェックセクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSection {
    /// 問い合わせ先パス
    pub path: Option<String>,
    /// 正常とみなすステータスコード
    pub codes: Option<String>,
    /// 問い合わせ間隔 (秒)
    pub interval: Option<u64>,
    /// 応答待ちの上限 (秒)
    pub timeout: Option<u64>,
}

impl HealthSection {
    pub fn merge(&mut self, other: HealthSection) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.codes.is_some() {
            self.codes = other.codes;
        }
        if other.interval.is_some() {
            self.interval = other.interval;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
    }
}

/// スケーリングセクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingSection {
    /// 実行数の下限
    pub min: Option<u32>,
    /// 実行数の上限
    pub max: Option<u32>,
    /// 目標 CPU 使用率 (%)
    pub target_cpu: Option<u32>,
    /// 縮小後の再評価待ち (秒)
    pub scale_in_cooldown: Option<u64>,
    /// 拡大後の再評価待ち (秒)
    pub scale_out_cooldown: Option<u64>,
}

impl ScalingSection {
    pub fn merge(&mut self, other: ScalingSection) {
        if other.min.is_some() {
            self.min = other.min;
        }
        if other.max.is_some() {
            self.max = other.max;
        }
        if other.target_cpu.is_some() {
            self.target_cpu = other.target_cpu;
        }
        if other.scale_in_cooldown.is_some() {
            self.scale_in_cooldown = other.scale_in_cooldown;
        }
        if other.scale_out_cooldown.is_some() {
            self.scale_out_cooldown = other.scale_out_cooldown;
        }
    }
}

/// フローログセクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLogSection {
    /// フローログを有効にするか (トポロジー既定を上書き)
    pub enabled: Option<bool>,
    /// シンク名 (未指定ならスタック名から導出)
    pub sink: Option<String>,
    /// シンクの保持期間 (日)
    pub retention_days: Option<u32>,
}

impl FlowLogSection {
    pub fn merge(&mut self, other: FlowLogSection) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.sink.is_some() {
            self.sink = other.sink;
        }
        if other.retention_days.is_some() {
            self.retention_days = other.retention_days;
        }
    }
}
