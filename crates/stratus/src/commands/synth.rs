use colored::Colorize;
use std::path::Path;
use tracing::debug;

use crate::utils;

pub async fn handle(
    project_root: &Path,
    topology: Option<&str>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    // 進捗は stderr に出す（stdout は合成した文書に使う）
    eprintln!("{}", "望ましい状態グラフを合成中...".blue());

    let spec = stratus_core::load_stack_from_root(project_root)?;
    let topology = utils::determine_topology(topology, &spec)?;
    eprintln!("トポロジー: {}", topology.to_string().cyan());

    // 適用済みリソースをカタログに写し、参照すべき既存リソースを解決する
    let store = stratus_cloud::StateStore::new(project_root);
    let state = store.load().await?;
    let catalog = stratus_core::Catalog::from(&state);

    let graph = stratus_core::blueprint::build(&spec, topology, &catalog)?;
    graph.validate()?;
    debug!(stack = %graph.name, nodes = graph.len(), "グラフを合成しました");

    let document = graph.to_document()?;
    match out {
        Some(path) => {
            tokio::fs::write(path, &document).await?;
            eprintln!(
                "{} {} ({}リソース)",
                "✓ 書き出しました:".green().bold(),
                path.display().to_string().cyan(),
                graph.len()
            );
        }
        None => {
            println!("{}", document);
        }
    }

    Ok(())
}
