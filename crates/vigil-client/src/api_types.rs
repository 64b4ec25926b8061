//! Wire types for the resource, workspace, and migration endpoints.
//!
//! Only the fields Vigil reads are modelled; everything else in the
//! responses is ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use vigil_core::types::{
    MigrationOutcome, MigrationReport, MigrationStep, ResourceKind, ResourceRecord,
    ResourceStatus, TransferProgress, WorkspaceStateReport,
};

/// Role shared by all runtimes of a workspace.
pub const RUNTIME_ROLE: &str = "runtime";

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditInfo {
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AsyncRuntimeFields {
    #[serde(default)]
    pub staging_bucket: Option<String>,
}

/// Entry of the runtime list endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSummary {
    pub id: u64,
    pub runtime_name: String,
    pub status: ResourceStatus,
    pub audit_info: AuditInfo,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub google_project: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub async_runtime_fields: Option<AsyncRuntimeFields>,
}

impl From<RuntimeSummary> for ResourceRecord {
    fn from(runtime: RuntimeSummary) -> Self {
        let mut record = ResourceRecord::new(
            runtime.id.to_string(),
            ResourceKind::Runtime,
            RUNTIME_ROLE,
            runtime.status,
            runtime.audit_info.created_date,
        )
        .with_name(runtime.runtime_name);
        record.labels = runtime.labels;
        record.project = runtime.google_project;
        record.workspace_id = runtime.workspace_id;
        record.staging_bucket = runtime.async_runtime_fields.and_then(|f| f.staging_bucket);
        record
    }
}

/// Entry of the app list endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub app_name: String,
    pub app_type: String,
    pub status: ResourceStatus,
    pub audit_info: AuditInfo,
    #[serde(default)]
    pub google_project: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

impl From<AppSummary> for ResourceRecord {
    fn from(app: AppSummary) -> Self {
        let mut record = ResourceRecord::new(
            app.app_name,
            ResourceKind::App,
            app.app_type,
            app.status,
            app.audit_info.created_date,
        );
        record.project = app.google_project;
        record.workspace_id = app.workspace_id;
        record.error_message = app.errors.into_iter().next().map(|e| e.error_message);
        record
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub error_message: String,
}

/// Runtime or app detail response.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DetailsResponse {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFields {
    pub state: ResourceStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Workspace detail response, restricted to state fields.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceResponse {
    pub workspace: WorkspaceFields,
}

impl From<WorkspaceResponse> for WorkspaceStateReport {
    fn from(response: WorkspaceResponse) -> Self {
        WorkspaceStateReport {
            state: response.workspace.state,
            error_message: response.workspace.error_message,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgressEntry {
    #[serde(default)]
    pub bytes_transferred: u64,
    #[serde(default)]
    pub total_bytes_to_transfer: u64,
}

impl From<TransferProgressEntry> for TransferProgress {
    fn from(entry: TransferProgressEntry) -> Self {
        TransferProgress {
            bytes_transferred: entry.bytes_transferred,
            total_bytes_to_transfer: entry.total_bytes_to_transfer,
        }
    }
}

/// Entry of the bucket migration endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MigrationEntry {
    pub namespace: String,
    pub name: String,
    pub migration_step: MigrationStep,
    /// `success` or `failure`
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub temp_bucket_transfer_progress: Option<TransferProgressEntry>,
    #[serde(default)]
    pub final_bucket_transfer_progress: Option<TransferProgressEntry>,
}

impl From<MigrationEntry> for MigrationReport {
    fn from(entry: MigrationEntry) -> Self {
        let outcome = match entry.outcome.as_deref() {
            Some("success") => Some(MigrationOutcome::Success),
            Some("failure") => Some(MigrationOutcome::Failure(
                entry.failure_reason.unwrap_or_default(),
            )),
            _ => None,
        };
        MigrationReport {
            namespace: entry.namespace,
            name: entry.name,
            step: entry.migration_step,
            outcome,
            temp_bucket_transfer: entry.temp_bucket_transfer_progress.map(Into::into),
            final_bucket_transfer: entry.final_bucket_transfer_progress.map(Into::into),
        }
    }
}
