//! Stratus コア機能
//!
//! 宣言的スタック定義のコアを提供します:
//! リソースグラフとその検証、トポロジーブループリント、
//! KDLパーサー、テンプレート展開、プロジェクトファイルの自動発見。

pub mod blueprint;
pub mod catalog;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod template;

// Re-exports
pub use catalog::{Catalog, ExistingResource};
pub use discovery::{DiscoveredFiles, discover_files, find_project_root};
pub use error::{Result, StackError};
pub use graph::{NodeId, ResourceKind, ResourceNode, ResourceSpec, StackGraph};
pub use loader::{load_stack, load_stack_from_root};
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_string};
pub use template::{TemplateProcessor, Variables, extract_variables};
