use colored::Colorize;
use std::path::Path;

use crate::utils;

pub async fn handle(project_root: &Path, topology: Option<&str>, json: bool) -> anyhow::Result<()> {
    let spec = stratus_core::load_stack_from_root(project_root)?;
    let topology = utils::determine_topology(topology, &spec)?;

    let store = stratus_cloud::StateStore::new(project_root);
    let state = store.load().await?;
    let catalog = stratus_core::Catalog::from(&state);

    let graph = stratus_core::blueprint::build(&spec, topology, &catalog)?;
    let outputs = stratus_cloud::resolve_outputs(&graph, &state);

    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
        return Ok(());
    }

    if outputs.is_empty() {
        println!("{}", "出力は定義されていません。".yellow());
        return Ok(());
    }

    println!("{} の出力:", spec.name.cyan());
    for output in &outputs {
        match &output.value {
            stratus_cloud::OutputState::Resolved { value } => {
                println!("  {} = {}", output.name.cyan(), value.green());
            }
            stratus_cloud::OutputState::Pending => {
                println!("  {} = {}", output.name.cyan(), "(pending)".yellow());
            }
        }
    }

    Ok(())
}
