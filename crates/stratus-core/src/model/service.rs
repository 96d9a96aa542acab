//! コンテナサービス定義

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::graph::NodeId;

/// 負荷分散つきコンテナサービス
///
/// クラスタ上で動くコンテナ群と、その前段の負荷分散装置をまとめて表す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeService {
    /// 実行先クラスタ
    pub cluster: NodeId,
    /// コンテナイメージの取得元
    pub image: ImageSource,
    /// CPU ユニット (1024 = 1 vCPU)
    pub cpu: u32,
    /// メモリ上限 (MiB)
    pub memory: u32,
    /// 希望実行数
    pub desired_count: u32,
    /// コンテナの待ち受けポート
    pub container_port: u16,
    /// コンテナに渡す環境変数
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
    /// 負荷分散装置を外部公開するか
    pub public_load_balancer: bool,
    /// 各タスクにパブリック IP を割り当てるか
    pub assign_public_ip: bool,
    /// 起動直後のヘルスチェック失敗を無視する猶予 (秒)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_grace: Option<u64>,
    /// タスク側に付与するアクセス制御ポリシー
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_policies: Vec<NodeId>,
    /// 負荷分散装置側に付与するアクセス制御ポリシー
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lb_policies: Vec<NodeId>,
}

impl ComputeService {
    pub fn new(cluster: NodeId, image: ImageSource) -> Self {
        Self {
            cluster,
            image,
            cpu: 256,
            memory: 512,
            desired_count: 1,
            container_port: 8080,
            environment: HashMap::new(),
            public_load_balancer: true,
            assign_public_ip: false,
            health_check_grace: None,
            task_policies: Vec::new(),
            lb_policies: Vec::new(),
        }
    }

    /// カスタムポリシーを一切持たないか
    pub fn uses_default_policies(&self) -> bool {
        self.task_policies.is_empty() && self.lb_policies.is_empty()
    }
}

/// コンテナイメージの取得元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// レジストリ上の公開イメージ
    Registry { image: String },
    /// ローカルソースからのビルド
    Build {
        /// ビルドコンテキストのパス
        context: PathBuf,
        /// Dockerfile のパス (未指定なら context 直下)
        #[serde(skip_serializing_if = "Option::is_none")]
        dockerfile: Option<PathBuf>,
    },
}

impl ImageSource {
    /// 表示用の参照名
    pub fn reference(&self) -> String {
        match self {
            Self::Registry { image } => image.clone(),
            Self::Build { context, .. } => format!("build:{}", context.display()),
        }
    }
}
