//! Reconcile engine seam
//!
//! The deployment engine that diffs, orders, applies, retries and rolls
//! back lives outside this repository. This module defines the trait it
//! is reached through and the report it hands back.

use crate::error::Result;
use crate::state::{DeployState, RecordStatus, ResourceRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stratus_core::{ResourceKind, StackGraph};

/// Reconcile engine abstraction
///
/// The engine consumes a desired-state graph and converges the actual
/// infrastructure towards it. Apply ordering, provider calls, retries
/// and rollback all happen on the engine's side of this seam.
#[async_trait]
pub trait ReconcileEngine: Send + Sync {
    /// Returns the engine name (e.g. "orbit")
    fn name(&self) -> &str;

    /// Returns the engine display name for UI
    fn display_name(&self) -> &str;

    /// Converge infrastructure towards the declared graph
    async fn reconcile(&self, graph: &StackGraph) -> Result<ReconcileReport>;
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Resources the engine converged successfully
    pub succeeded: Vec<ResourceOutcome>,

    /// Resources the engine gave up on
    pub failed: Vec<ResourceOutcome>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, outcome: ResourceOutcome) {
        self.succeeded.push(outcome);
    }

    pub fn add_failure(&mut self, outcome: ResourceOutcome) {
        self.failed.push(outcome);
    }

    /// Fold the report into recorded state.
    ///
    /// Successful outcomes insert or update their record and mark it
    /// `Ready`; failures mark an existing record `Failed` but never
    /// invent a record for a resource that was not provisioned.
    pub fn record_into(&self, state: &mut DeployState) {
        for outcome in &self.succeeded {
            let Some(id) = &outcome.id else { continue };
            match state.resources.get_mut(&outcome.resource) {
                Some(record) => {
                    record.id = id.clone();
                    record.kind = outcome.kind;
                    record.status = RecordStatus::Ready;
                    record.updated_at = Utc::now();
                    record.attributes.extend(outcome.attributes.clone());
                }
                None => {
                    let mut record =
                        ResourceRecord::new(id.clone(), outcome.kind).with_status(RecordStatus::Ready);
                    record.attributes.extend(outcome.attributes.clone());
                    state.resources.insert(outcome.resource.clone(), record);
                }
            }
        }

        for outcome in &self.failed {
            if let Some(record) = state.resources.get_mut(&outcome.resource) {
                record.status = RecordStatus::Failed;
                record.updated_at = Utc::now();
            }
        }

        state.updated_at = Utc::now();
    }
}

impl Default for ReconcileReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome for a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOutcome {
    /// Declared resource name
    pub resource: String,

    /// Resource kind
    pub kind: ResourceKind,

    /// Engine-assigned ID on success
    pub id: Option<String>,

    /// Human-readable outcome message
    pub message: String,

    /// Error message if the resource failed
    pub error: Option<String>,

    /// Attributes the engine observed (dns_name, address, etc.)
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ResourceOutcome {
    pub fn ok(
        resource: impl Into<String>,
        kind: ResourceKind,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            kind,
            id: Some(id.into()),
            message: message.into(),
            error: None,
            attributes: HashMap::new(),
        }
    }

    pub fn failed(resource: impl Into<String>, kind: ResourceKind, error: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            kind,
            id: None,
            message: String::new(),
            error: Some(error.into()),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use stratus_core::model::{SinkMode, StackSpec, Topology};
    use stratus_core::{Catalog, ResourceSpec};

    /// Test double that pretends every declared resource converged.
    ///
    /// IDs are derived from the declaration; a referenced log sink keeps
    /// the ID it was declared with instead of getting a fresh one.
    struct RecordingEngine;

    #[async_trait]
    impl ReconcileEngine for RecordingEngine {
        fn name(&self) -> &str {
            "recording"
        }

        fn display_name(&self) -> &str {
            "Recording engine"
        }

        async fn reconcile(&self, graph: &StackGraph) -> Result<ReconcileReport> {
            let order = graph.apply_order().map_err(|e| CloudError::EngineFailed {
                engine: self.name().to_string(),
                message: e.to_string(),
            })?;

            let mut report = ReconcileReport::new();
            for node_id in order {
                let Some(node) = graph.node(node_id) else {
                    continue;
                };

                let resource_id = match &node.spec {
                    ResourceSpec::LogSink(sink) => match &sink.mode {
                        SinkMode::Reference { id } => id.clone(),
                        SinkMode::Create { .. } => {
                            format!("sim-{}-{}", node.spec.kind(), node_id.index())
                        }
                    },
                    _ => format!("sim-{}-{}", node.spec.kind(), node_id.index()),
                };

                let mut outcome =
                    ResourceOutcome::ok(&node.name, node.spec.kind(), resource_id, "converged");
                match &node.spec {
                    ResourceSpec::LogSink(sink) => {
                        outcome = outcome.with_attribute("name", serde_json::json!(sink.name));
                    }
                    ResourceSpec::Service(_) => {
                        outcome = outcome
                            .with_attribute("dns_name", serde_json::json!("demo-lb.example.net"));
                    }
                    _ => {}
                }
                report.add_success(outcome);
            }

            Ok(report)
        }
    }

    fn demo_spec() -> StackSpec {
        let mut spec = StackSpec {
            name: "demo".to_string(),
            ..Default::default()
        };
        spec.service.image = Some("demo:1".to_string());
        spec
    }

    #[test]
    fn test_report_records_into_state() {
        let spec = demo_spec();
        let graph =
            stratus_core::blueprint::build(&spec, Topology::Hardened, &Catalog::new()).unwrap();

        let engine = RecordingEngine;
        let report = tokio_test::block_on(engine.reconcile(&graph)).unwrap();

        assert!(report.is_success());
        assert_eq!(report.succeeded.len(), graph.len());

        let mut state = DeployState::new();
        report.record_into(&mut state);

        assert_eq!(state.resources.len(), graph.len());
        let service = state.get_record("service").unwrap();
        assert_eq!(service.status, RecordStatus::Ready);
        assert_eq!(
            service.get_attribute::<String>("dns_name").as_deref(),
            Some("demo-lb.example.net")
        );
    }

    #[test]
    fn test_failure_marks_existing_record_only() {
        let mut state = DeployState::new();
        state.set_record(
            "service".to_string(),
            ResourceRecord::new("svc-1", ResourceKind::Service).with_status(RecordStatus::Ready),
        );

        let mut report = ReconcileReport::new();
        report.add_failure(ResourceOutcome::failed(
            "service",
            ResourceKind::Service,
            "quota exceeded",
        ));
        report.add_failure(ResourceOutcome::failed(
            "network",
            ResourceKind::Network,
            "quota exceeded",
        ));
        report.record_into(&mut state);

        assert_eq!(
            state.get_record("service").unwrap().status,
            RecordStatus::Failed
        );
        // A failed resource that was never provisioned gets no record
        assert!(state.get_record("network").is_none());
    }

    #[test]
    fn test_second_declaration_references_recorded_sink() {
        let spec = demo_spec();

        // First declaration: nothing exists yet, the sink is created
        let first =
            stratus_core::blueprint::build(&spec, Topology::Hardened, &Catalog::new()).unwrap();
        let sink_id = first
            .nodes_of_kind(ResourceKind::LogSink)
            .into_iter()
            .next()
            .unwrap();
        let Some(ResourceSpec::LogSink(sink)) = first.node(sink_id).map(|n| &n.spec) else {
            panic!("sink node missing");
        };
        assert!(matches!(sink.mode, SinkMode::Create { .. }));

        // The engine converges and the outcome is recorded
        let engine = RecordingEngine;
        let report = tokio_test::block_on(engine.reconcile(&first)).unwrap();
        let mut state = DeployState::new();
        report.record_into(&mut state);

        // Second declaration resolves the recorded sink instead of creating
        let catalog = Catalog::from(&state);
        let second = stratus_core::blueprint::build(&spec, Topology::Hardened, &catalog).unwrap();
        let sink_id = second
            .nodes_of_kind(ResourceKind::LogSink)
            .into_iter()
            .next()
            .unwrap();
        let Some(ResourceSpec::LogSink(sink)) = second.node(sink_id).map(|n| &n.spec) else {
            panic!("sink node missing");
        };

        match &sink.mode {
            SinkMode::Reference { id } => {
                let recorded = state.get_record("flow-log-sink").unwrap();
                assert_eq!(id, &recorded.id);
            }
            SinkMode::Create { .. } => panic!("sink was created a second time"),
        }

        // A third run keeps resolving to the same sink
        let third_report = tokio_test::block_on(engine.reconcile(&second)).unwrap();
        third_report.record_into(&mut state);
        assert_eq!(
            Catalog::from(&state)
                .log_sink(&sink.name)
                .map(|s| s.id.clone()),
            state.get_record("flow-log-sink").map(|r| r.id.clone())
        );
    }
}
