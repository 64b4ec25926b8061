//! Shared type definitions used across Vigil crates.
//!
//! Resource records are what one poll returns: runtimes, apps, and workspaces
//! reduced to the fields the change detector needs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unique identifier for a remote resource.
pub type ResourceId = String;

/// The kind of remote resource being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute runtime (cloud environment)
    Runtime,
    /// Containerized app (Galaxy, Cromwell, ...)
    App,
    /// Workspace
    Workspace,
}

impl ResourceKind {
    /// Key fragment used when persisting per-kind session state.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Runtime => "Runtime",
            Self::App => "App",
            Self::Workspace => "Workspace",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime => write!(f, "runtime"),
            Self::App => write!(f, "app"),
            Self::Workspace => write!(f, "workspace"),
        }
    }
}

/// Status reported by the backend for a resource.
///
/// Runtimes report `Running`, apps report `RUNNING`, and workspaces report
/// `Deleting`/`DeleteFailed`; parsing is case-insensitive. Anything not listed
/// here is kept as [`ResourceStatus::Unknown`] so that a new backend status
/// never fails a poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    Creating,
    Provisioning,
    Starting,
    Running,
    Updating,
    Stopping,
    Stopped,
    Deleting,
    Deleted,
    DeleteFailed,
    Error,
    Unknown(String),
}

impl ResourceStatus {
    /// Parse a backend status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "creating" => Self::Creating,
            "provisioning" | "precreating" | "precreated" => Self::Provisioning,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "updating" => Self::Updating,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "deleting" | "predeleting" => Self::Deleting,
            "deleted" => Self::Deleted,
            "deletefailed" | "delete_failed" => Self::DeleteFailed,
            "error" => Self::Error,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Returns true while the resource is being torn down (or already gone).
    ///
    /// Such resources never count as the current resource of their role.
    pub fn is_going_away(&self) -> bool {
        matches!(self, Self::Deleting | Self::Deleted)
    }

    /// Returns true if this status is not one Vigil knows about.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Canonical spelling, as runtimes report it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "Creating",
            Self::Provisioning => "Provisioning",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Updating => "Updating",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Deleting => "Deleting",
            Self::Deleted => "Deleted",
            Self::DeleteFailed => "DeleteFailed",
            Self::Error => "Error",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One resource as observed by a single poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Backend identifier (runtime id, app name, workspace id)
    pub id: ResourceId,
    /// Display name
    pub name: String,
    pub kind: ResourceKind,
    /// Records sharing a role compete for "current"; only the newest is diffed
    pub role: String,
    pub status: ResourceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Cloud project the resource lives in
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Bucket holding startup script output for runtimes
    #[serde(default)]
    pub staging_bucket: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ResourceRecord {
    /// Create a record with the required fields; optional fields start empty.
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        role: impl Into<String>,
        status: ResourceStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            role: role.into(),
            status,
            created_at,
            labels: BTreeMap::new(),
            project: None,
            workspace_id: None,
            staging_bucket: None,
            error_message: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_staging_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.staging_bucket = Some(bucket.into());
        self
    }

    /// The `tool` label runtimes carry (e.g. `RStudio`, `Jupyter`).
    pub fn tool(&self) -> Option<&str> {
        self.labels.get("tool").map(String::as_str)
    }
}

/// The full set of records returned by one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<ResourceRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(records: Vec<ResourceRecord>) -> Self {
        Self {
            records,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Merge another snapshot's records into this one (runtimes + apps for one workspace).
    pub fn extend(mut self, other: Snapshot) -> Self {
        self.records.extend(other.records);
        self
    }
}

/// Identifies the scope one observer polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Cloud project the workspace's runtimes are billed to
    #[serde(default)]
    pub project: Option<String>,
}

impl WorkspaceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            workspace_id: None,
            project: None,
        }
    }

    pub fn with_workspace_id(mut self, id: impl Into<String>) -> Self {
        self.workspace_id = Some(id.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Parse `namespace/name`.
    pub fn parse(s: &str) -> Option<Self> {
        let (namespace, name) = s.split_once('/')?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(namespace, name))
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A workspace state as reported by the workspace detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceStateReport {
    pub state: ResourceStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Error details for a runtime or app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDetails {
    #[serde(default)]
    pub error_messages: Vec<String>,
}

/// Step of a workspace bucket migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationStep {
    Unscheduled,
    ScheduledForMigration,
    PreparingTransferToTempBucket,
    TransferringToTempBucket,
    PreparingTransferToFinalBucket,
    TransferringToFinalBucket,
    FinishingUp,
    Finished,
}

/// Final result of a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "reason")]
pub enum MigrationOutcome {
    Success,
    Failure(String),
}

/// Bytes moved by one bucket transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes_to_transfer: u64,
}

/// Migration state of one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub namespace: String,
    pub name: String,
    pub step: MigrationStep,
    #[serde(default)]
    pub outcome: Option<MigrationOutcome>,
    #[serde(default)]
    pub temp_bucket_transfer: Option<TransferProgress>,
    #[serde(default)]
    pub final_bucket_transfer: Option<TransferProgress>,
}

impl MigrationReport {
    /// Stable identifier used for ledger keys.
    pub fn workspace_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}
