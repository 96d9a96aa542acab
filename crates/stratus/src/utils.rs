use colored::Colorize;
use stratus_core::{StackError, StackSpec, Topology};

/// 適用するトポロジーを決定する（共通ロジック）
///
/// 優先順位: -t/--topology フラグ (STRATUS_TOPOLOGY 環境変数) >
/// stack.kdl の topology > 既定値 (hardened)
pub fn determine_topology(requested: Option<&str>, spec: &StackSpec) -> anyhow::Result<Topology> {
    match requested {
        Some(s) => {
            Topology::parse(s).ok_or_else(|| StackError::UnknownTopology(s.to_string()).into())
        }
        None => Ok(spec.topology.unwrap_or_default()),
    }
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_discovered_files(project_root: &std::path::Path) {
    let Ok(discovered) = stratus_core::discover_files(project_root) else {
        return;
    };

    println!("📄 読み込んだ設定ファイル:");

    if let Some(path) = &discovered.root {
        println!("  • {}", path.display().to_string().cyan());
    }
    if let Some(path) = &discovered.local_override {
        println!(
            "  • {} (ローカルオーバーライド)",
            path.display().to_string().cyan()
        );
    }
    if let Some(path) = &discovered.env_file {
        println!("  • {} (環境変数)", path.display().to_string().cyan());
    }
}
