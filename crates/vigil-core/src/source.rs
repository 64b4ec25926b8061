//! Collaborator traits for the remote backend.
//!
//! Observers only see these traits; `vigil-client` implements them over HTTP
//! and tests implement them in memory. Every method fails with
//! [`VigilError::NotFound`](crate::VigilError::NotFound) when the scope no
//! longer exists, and with a request error otherwise.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    MigrationReport, ResourceDetails, ResourceRecord, Snapshot, WorkspaceRef, WorkspaceStateReport,
};

/// Fetches the current runtimes and apps of a workspace.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch(&self, scope: &WorkspaceRef) -> Result<Snapshot>;
}

/// Fetches error details for a runtime or app, and the artifacts they point to.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_details(&self, record: &ResourceRecord) -> Result<ResourceDetails>;

    /// Fetch a named artifact (e.g. a startup script log) attached to the resource.
    async fn fetch_error_artifact(&self, record: &ResourceRecord, artifact: &str) -> Result<String>;
}

/// Fetches the lifecycle state of a single workspace.
#[async_trait]
pub trait WorkspaceStateSource: Send + Sync {
    async fn workspace_state(&self, workspace: &WorkspaceRef) -> Result<WorkspaceStateReport>;
}

/// Fetches bucket migration progress for the workspaces of a billing project.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    async fn migrations(&self, billing_project: &str) -> Result<Vec<MigrationReport>>;
}
