//! モデル定義
//!
//! Stratusで使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod access;
mod cluster;
mod health;
mod logs;
mod network;
mod output;
mod scaling;
mod service;
mod stack;

// Re-exports
pub use access::*;
pub use cluster::*;
pub use health::*;
pub use logs::*;
pub use network::*;
pub use output::*;
pub use scaling::*;
pub use service::*;
pub use stack::*;
