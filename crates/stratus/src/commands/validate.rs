use colored::Colorize;
use std::path::Path;

use crate::utils;

pub async fn handle(project_root: &Path, topology: Option<&str>) -> anyhow::Result<()> {
    println!("{}", "スタック定義を検証中...".blue());
    println!(
        "プロジェクトルート: {}",
        project_root.display().to_string().cyan()
    );
    utils::print_discovered_files(project_root);

    let spec = match stratus_core::load_stack_from_root(project_root) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let topology = utils::determine_topology(topology, &spec)?;

    // 検証だけなのでカタログは空でよい（シンクは作成宣言として現れる）
    let build_result = stratus_core::blueprint::build(&spec, topology, &stratus_core::Catalog::new())
        .and_then(|graph| graph.validate().map(|_| graph));
    let graph = match build_result {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ グラフ検証エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ スタック定義は正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!(
        "  スタック: {} (トポロジー: {})",
        spec.name.cyan(),
        topology.to_string().cyan()
    );
    println!("  リソース: {}個", graph.len());
    for (_, node) in graph.nodes() {
        println!("    - {} ({})", node.name.cyan(), node.spec.kind());
    }

    if !graph.outputs().is_empty() {
        println!("  出力: {}個", graph.outputs().len());
        for output in graph.outputs() {
            println!("    - {} ({})", output.name.cyan(), output.description);
        }
    }

    // validate が通っていれば循環はないので、ここで失敗することはない
    let order = graph.apply_order()?;
    println!("  適用順序:");
    for (position, id) in order.iter().enumerate() {
        if let Some(node) = graph.node(*id) {
            println!("    {}. {}", position + 1, node.name.cyan());
        }
    }

    Ok(())
}
