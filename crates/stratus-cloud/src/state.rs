//! Recorded reconciliation state
//!
//! Manages the `.stratus/state.json` file which tracks what the reconcile
//! engine reported for each declared resource.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stratus_core::{Catalog, ExistingResource, ResourceKind};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".stratus";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// Recorded state of a whole stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Records indexed by the declared resource name
    pub resources: HashMap<String, ResourceRecord>,
}

impl Default for DeployState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }
}

impl DeployState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a record
    pub fn set_record(&mut self, name: String, record: ResourceRecord) {
        self.resources.insert(name, record);
        self.updated_at = Utc::now();
    }

    /// Remove a record
    pub fn remove_record(&mut self, name: &str) -> Option<ResourceRecord> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a record by resource name
    pub fn get_record(&self, name: &str) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    /// Records of a specific kind
    pub fn records_of_kind(&self, kind: ResourceKind) -> Vec<(&String, &ResourceRecord)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.kind == kind)
            .collect()
    }
}

/// Record for a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Engine-assigned resource ID
    pub id: String,

    /// Resource kind
    pub kind: ResourceKind,

    /// Current status
    pub status: RecordStatus,

    /// Resource attributes (dns_name, address, etc.)
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the resource was first recorded
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            status: RecordStatus::Unknown,
            attributes: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a recorded resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// The engine is still converging this resource
    Creating,
    /// The resource exists and matches its declaration
    Ready,
    /// The last reconciliation attempt failed
    Failed,
    /// The resource has been removed
    Deleted,
    /// Status is unknown
    Unknown,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Creating => write!(f, "creating"),
            RecordStatus::Ready => write!(f, "ready"),
            RecordStatus::Failed => write!(f, "failed"),
            RecordStatus::Deleted => write!(f, "deleted"),
            RecordStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Hydrate the existence catalog from recorded state.
///
/// Only `Ready` records count as existing. A failed create never answers
/// an "exists?" query, so the blueprint re-declares the resource instead
/// of silently referencing something that was never provisioned.
///
/// The catalog is keyed by the provisioned name, which engines report
/// under the `name` attribute. Log sinks carry names like
/// `/network/flow-logs/demo` there, distinct from the node name.
impl From<&DeployState> for Catalog {
    fn from(state: &DeployState) -> Self {
        let mut catalog = Catalog::new();
        for (node_name, record) in &state.resources {
            if record.status != RecordStatus::Ready || record.id.is_empty() {
                continue;
            }
            let name = record
                .get_attribute::<String>("name")
                .unwrap_or_else(|| node_name.clone());
            catalog.insert(ExistingResource {
                kind: record.kind,
                name,
                id: record.id.clone(),
            });
        }
        catalog
    }
}

/// Store for reading and writing the state file
pub struct StateStore {
    /// Project root directory
    project_root: PathBuf,
}

impl StateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<DeployState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(DeployState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: DeployState = serde_json::from_str(&content)?;

        // Version check
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state
    pub async fn save(&self, state: &DeployState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        // Create backup if state file exists
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        // Write new state
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        let mut state = DeployState::new();
        state.set_record(
            "network".to_string(),
            ResourceRecord::new("net-0a1b2c", ResourceKind::Network)
                .with_status(RecordStatus::Ready)
                .with_attribute("cidr", serde_json::json!("10.0.0.0/16")),
        );

        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);

        let record = loaded.get_record("network").unwrap();
        assert_eq!(record.id, "net-0a1b2c");
        assert_eq!(record.status, RecordStatus::Ready);
        assert_eq!(
            record.get_attribute::<String>("cidr").as_deref(),
            Some("10.0.0.0/16")
        );
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        let state = store.load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_backup() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        let mut state = DeployState::new();
        store.save(&state).await.unwrap();

        state.set_record(
            "cluster".to_string(),
            ResourceRecord::new("clu-1234", ResourceKind::Cluster)
                .with_status(RecordStatus::Ready),
        );
        store.save(&state).await.unwrap();

        assert!(temp_dir.path().join(".stratus/state.json").exists());
        assert!(temp_dir.path().join(".stratus/state.json.backup").exists());

        // The backup holds the previous (empty) state
        let backup_content =
            std::fs::read_to_string(temp_dir.path().join(".stratus/state.json.backup")).unwrap();
        let backup: DeployState = serde_json::from_str(&backup_content).unwrap();
        assert!(backup.resources.is_empty());
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let temp_dir = tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(".stratus")).unwrap();
        std::fs::write(
            temp_dir.path().join(".stratus/state.json"),
            serde_json::json!({
                "version": 99,
                "updated_at": Utc::now(),
                "resources": {}
            })
            .to_string(),
        )
        .unwrap();

        let store = StateStore::new(temp_dir.path());
        let result = store.load().await;

        assert!(matches!(result, Err(CloudError::StateError(_))));
    }

    #[test]
    fn test_catalog_hydration_prefers_provisioned_name() {
        let mut state = DeployState::new();
        state.set_record(
            "flow-log-sink".to_string(),
            ResourceRecord::new("sink-0042", ResourceKind::LogSink)
                .with_status(RecordStatus::Ready)
                .with_attribute("name", serde_json::json!("/network/flow-logs/demo")),
        );
        state.set_record(
            "cluster".to_string(),
            ResourceRecord::new("clu-7777", ResourceKind::Cluster)
                .with_status(RecordStatus::Ready),
        );

        let catalog = Catalog::from(&state);

        assert_eq!(catalog.len(), 2);
        // The sink is found under its provisioned name, not the node name
        let sink = catalog.log_sink("/network/flow-logs/demo").unwrap();
        assert_eq!(sink.id, "sink-0042");
        assert!(catalog.log_sink("flow-log-sink").is_none());
        // Without a name attribute the node name is the key
        assert!(catalog.get(ResourceKind::Cluster, "cluster").is_some());
    }

    #[test]
    fn test_catalog_hydration_skips_failed_records() {
        let mut state = DeployState::new();
        state.set_record(
            "flow-log-sink".to_string(),
            ResourceRecord::new("sink-0042", ResourceKind::LogSink)
                .with_status(RecordStatus::Failed),
        );
        state.set_record(
            "network".to_string(),
            ResourceRecord::new("", ResourceKind::Network).with_status(RecordStatus::Unknown),
        );

        let catalog = Catalog::from(&state);

        assert!(catalog.is_empty());
    }

    #[test]
    fn test_record_status_display() {
        assert_eq!(RecordStatus::Ready.to_string(), "ready");
        assert_eq!(RecordStatus::Failed.to_string(), "failed");
    }
}
