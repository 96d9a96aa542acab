//! Output value resolution
//!
//! Output expressions are carried on the graph but only become concrete
//! once the engine has recorded the attributes they reference. Anything
//! not yet recorded resolves to `Pending` rather than an error.

use crate::state::DeployState;
use serde::{Deserialize, Serialize};
use stratus_core::StackGraph;
use stratus_core::model::{OutputExpr, attr};

/// A named output with its resolution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOutput {
    /// Output name
    pub name: String,

    /// Output description
    pub description: String,

    /// Resolution result
    pub value: OutputState,
}

/// Resolution result for one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutputState {
    /// All referenced attributes were recorded
    Resolved { value: String },
    /// At least one referenced attribute is not recorded yet
    Pending,
}

impl OutputState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, OutputState::Resolved { .. })
    }
}

impl std::fmt::Display for OutputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputState::Resolved { value } => write!(f, "{}", value),
            OutputState::Pending => write!(f, "(pending)"),
        }
    }
}

/// Resolve every output the graph declares against recorded state
pub fn resolve_outputs(graph: &StackGraph, state: &DeployState) -> Vec<ResolvedOutput> {
    graph
        .outputs()
        .iter()
        .map(|output| ResolvedOutput {
            name: output.name.clone(),
            description: output.description.clone(),
            value: resolve_expr(&output.value, graph, state),
        })
        .collect()
}

fn resolve_expr(expr: &OutputExpr, graph: &StackGraph, state: &DeployState) -> OutputState {
    match expr {
        OutputExpr::Literal { text } => OutputState::Resolved { value: text.clone() },
        OutputExpr::Attribute { node, attribute } => {
            let Some(resource) = graph.node(*node) else {
                return OutputState::Pending;
            };
            let Some(record) = state.get_record(&resource.name) else {
                return OutputState::Pending;
            };

            // "id" refers to the resource ID itself
            if attribute == attr::ID {
                if record.id.is_empty() {
                    return OutputState::Pending;
                }
                return OutputState::Resolved {
                    value: record.id.clone(),
                };
            }

            match record.attributes.get(attribute) {
                Some(serde_json::Value::String(s)) => OutputState::Resolved { value: s.clone() },
                Some(other) => OutputState::Resolved {
                    value: other.to_string(),
                },
                None => OutputState::Pending,
            }
        }
        OutputExpr::Concat { parts } => {
            let mut value = String::new();
            for part in parts {
                match resolve_expr(part, graph, state) {
                    OutputState::Resolved { value: v } => value.push_str(&v),
                    OutputState::Pending => return OutputState::Pending,
                }
            }
            OutputState::Resolved { value }
        }
    }
}
