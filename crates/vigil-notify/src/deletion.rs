//! Workspace deletion tracker.
//!
//! Workspace deletion is asynchronous on the backend. While a workspace is
//! `Deleting`, the tracker polls its state and reports the outcome to the
//! list view: `DeleteFailed` with the backend's message, or `Deleted` once the
//! workspace is gone (the state endpoint answers not-found). Workspaces in
//! any other state are dropped without a report. It never raises a
//! notification and never writes the ledger.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::error::Result;
use vigil_core::poller::Probe;
use vigil_core::source::WorkspaceStateSource;
use vigil_core::types::{ResourceKind, ResourceStatus, WorkspaceRef};

use crate::list::{ListUpdate, ListUpdateSender, publish};

pub struct DeletionTracker {
    source: Arc<dyn WorkspaceStateSource>,
    tracked: Vec<WorkspaceRef>,
    updates: Option<ListUpdateSender>,
}

fn list_id(workspace: &WorkspaceRef) -> String {
    workspace
        .workspace_id
        .clone()
        .unwrap_or_else(|| workspace.to_string())
}

impl DeletionTracker {
    pub fn new(source: Arc<dyn WorkspaceStateSource>) -> Self {
        Self {
            source,
            tracked: Vec::new(),
            updates: None,
        }
    }

    pub fn with_list_updates(mut self, sender: ListUpdateSender) -> Self {
        self.updates = Some(sender);
        self
    }

    /// Start tracking a workspace that is being deleted.
    pub fn track(&mut self, workspace: WorkspaceRef) {
        if !self.tracked.contains(&workspace) {
            debug!(workspace = %workspace, "Tracking workspace deletion");
            self.tracked.push(workspace);
        }
    }

    pub fn tracked(&self) -> &[WorkspaceRef] {
        &self.tracked
    }

    /// Check every tracked workspace once.
    ///
    /// Workspaces that reached a terminal state are reported and dropped from
    /// the tracked set. Nothing is reported if `token` is cancelled by the
    /// time the checks return.
    pub async fn check(&mut self, token: &CancellationToken) -> Vec<ListUpdate> {
        let mut finished = Vec::new();
        let mut untracked = Vec::new();

        for workspace in &self.tracked {
            let update = match self.source.workspace_state(workspace).await {
                Ok(report) => match report.state {
                    ResourceStatus::DeleteFailed => Some(
                        ListUpdate::new(
                            ResourceKind::Workspace,
                            list_id(workspace),
                            ResourceStatus::DeleteFailed,
                        )
                        .with_error(report.error_message),
                    ),
                    ResourceStatus::Deleted => Some(ListUpdate::new(
                        ResourceKind::Workspace,
                        list_id(workspace),
                        ResourceStatus::Deleted,
                    )),
                    ResourceStatus::Deleting => None,
                    other => {
                        debug!(workspace = %workspace, state = %other, "Workspace is not being deleted");
                        untracked.push(workspace.clone());
                        None
                    }
                },
                Err(e) if e.is_not_found() => Some(ListUpdate::new(
                    ResourceKind::Workspace,
                    list_id(workspace),
                    ResourceStatus::Deleted,
                )),
                Err(e) => {
                    warn!(workspace = %workspace, error = %e, "Failed to check workspace deletion");
                    None
                }
            };
            if let Some(update) = update {
                finished.push((workspace.clone(), update));
            }
        }

        if token.is_cancelled() {
            debug!("Deletion tracker torn down, discarding results");
            return Vec::new();
        }

        self.tracked.retain(|w| !untracked.contains(w));

        let mut updates = Vec::with_capacity(finished.len());
        for (workspace, update) in finished {
            info!(workspace = %workspace, state = %update.state, "Workspace deletion finished");
            self.tracked.retain(|w| *w != workspace);
            publish(self.updates.as_ref(), update.clone());
            updates.push(update);
        }
        updates
    }
}

#[async_trait]
impl Probe for DeletionTracker {
    fn name(&self) -> &str {
        "deletions"
    }

    async fn probe(&mut self, token: &CancellationToken) -> Result<()> {
        if !self.tracked.is_empty() {
            self.check(token).await;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionTracker")
            .field("tracked", &self.tracked)
            .finish_non_exhaustive()
    }
}
