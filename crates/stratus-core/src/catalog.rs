//! 既存リソースのカタログ
//!
//! 過去の適用で作られたリソースの索引。グラフ構築時に「同名のシンクは
//! もうあるか」を明確な問い合わせとして引けるようにする。失敗を
//! 握りつぶして存在確認の代わりにするのではなく、カタログにあるか
//! どうかだけで判断する。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::ResourceKind;

/// 既存リソースの記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingResource {
    /// リソース種別
    pub kind: ResourceKind,
    /// 宣言時の名前
    pub name: String,
    /// 実行環境が払い出したリソース ID
    pub id: String,
}

/// 既存リソースの索引
///
/// (種別, 名前) をキーに引く。空のカタログはどの問い合わせにも
/// None を返すだけで、エラーにはならない。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<(ResourceKind, String), ExistingResource>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存リソースを登録する
    pub fn insert(&mut self, resource: ExistingResource) {
        self.entries
            .insert((resource.kind, resource.name.clone()), resource);
    }

    /// 種別と名前で既存リソースを引く
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ExistingResource> {
        self.entries.get(&(kind, name.to_string()))
    }

    /// 指定名のログシンクが既に存在するか
    pub fn log_sink(&self, name: &str) -> Option<&ExistingResource> {
        self.get(ResourceKind::LogSink, name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
