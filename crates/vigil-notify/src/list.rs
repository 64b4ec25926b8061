//! List-view updates.
//!
//! Deletions are not alerts. When a resource or workspace leaves the list,
//! observers send a [`ListUpdate`] so the list view can change its row
//! instead of raising a notification.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use vigil_core::ledger::Ledger;
use vigil_core::types::{ResourceKind, ResourceStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListUpdate {
    pub kind: ResourceKind,
    /// Resource id, or workspace id for workspaces
    pub resource_id: String,
    pub state: ResourceStatus,
    pub error_message: Option<String>,
}

impl ListUpdate {
    pub fn new(kind: ResourceKind, resource_id: impl Into<String>, state: ResourceStatus) -> Self {
        Self {
            kind,
            resource_id: resource_id.into(),
            state,
            error_message: None,
        }
    }

    pub fn with_error(mut self, message: Option<String>) -> Self {
        self.error_message = message;
        self
    }

    /// True once the resource is actually gone.
    pub fn is_deletion(&self) -> bool {
        self.state == ResourceStatus::Deleted
    }

    /// Acknowledge a displayed update. A finished deletion drops the
    /// resource's ledger keys; anything else leaves the ledger alone.
    /// Returns the number of keys dropped.
    pub fn acknowledge(&self, ledger: &Ledger) -> usize {
        if !self.is_deletion() {
            return 0;
        }
        let forgotten = ledger.forget_resource(&self.resource_id);
        if forgotten > 0 {
            debug!(resource = %self.resource_id, forgotten, "Deletion acknowledged");
        }
        forgotten
    }
}

pub type ListUpdateSender = mpsc::UnboundedSender<ListUpdate>;
pub type ListUpdateReceiver = mpsc::UnboundedReceiver<ListUpdate>;

pub fn list_channel() -> (ListUpdateSender, ListUpdateReceiver) {
    mpsc::unbounded_channel()
}

/// Send without failing when the list view has gone away.
pub(crate) fn publish(sender: Option<&ListUpdateSender>, update: ListUpdate) {
    let Some(sender) = sender else {
        return;
    };
    if sender.send(update).is_err() {
        debug!("List view closed, dropping update");
    }
}
