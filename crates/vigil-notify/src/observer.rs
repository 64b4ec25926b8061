//! Resource observer.
//!
//! One observer per workspace scope. Each poll fetches a snapshot, diffs it
//! against the snapshot it kept from the previous poll, asks the policy what
//! to say, and emits whatever the ledger and the day gate still allow.
//!
//! The kept snapshot only advances after a successful fetch, so every diff is
//! between two consecutive successful polls of this observer. Nothing is
//! applied once the observer's token is cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vigil_core::diff::{Change, diff};
use vigil_core::error::Result;
use vigil_core::ledger::Ledger;
use vigil_core::poller::Probe;
use vigil_core::session::DayGate;
use vigil_core::source::ResourceSource;
use vigil_core::types::{ResourceStatus, Snapshot, WorkspaceRef};

use crate::emitter::{NotificationCenter, NotificationId};
use crate::list::{ListUpdate, ListUpdateSender, publish};
use crate::policy::{Gate, NotificationPolicy};

/// Outcome of one reconcile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// True if there was no previous snapshot
    pub baseline: bool,
    pub changes: Vec<Change>,
    pub emitted: Vec<NotificationId>,
    pub list_updates: Vec<ListUpdate>,
}

pub struct ResourceObserver {
    scope: WorkspaceRef,
    source: Arc<dyn ResourceSource>,
    policy: NotificationPolicy,
    ledger: Ledger,
    center: NotificationCenter,
    day_gate: DayGate,
    previous: Option<Snapshot>,
    list_updates: Option<ListUpdateSender>,
    name: String,
}

impl ResourceObserver {
    pub fn new(
        scope: WorkspaceRef,
        source: Arc<dyn ResourceSource>,
        policy: NotificationPolicy,
        ledger: Ledger,
        center: NotificationCenter,
        day_gate: DayGate,
    ) -> Self {
        let name = format!("resources:{scope}");
        Self {
            scope,
            source,
            policy,
            ledger,
            center,
            day_gate,
            previous: None,
            list_updates: None,
            name,
        }
    }

    /// Send removals to a list view.
    pub fn with_list_updates(mut self, sender: ListUpdateSender) -> Self {
        self.list_updates = Some(sender);
        self
    }

    pub fn scope(&self) -> &WorkspaceRef {
        &self.scope
    }

    /// Snapshot kept from the last successful poll.
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Diff `snapshot` against the kept one, emit, and keep `snapshot`.
    pub fn reconcile<Tz: TimeZone>(&mut self, snapshot: Snapshot, now: &DateTime<Tz>) -> ReconcileReport {
        let baseline = self.previous.is_none();
        let changes = diff(self.previous.as_ref(), &snapshot);
        let slots = self
            .policy
            .plan(&changes, baseline, &self.scope, now.with_timezone(&Utc));

        let mut emitted = Vec::new();
        for slot in slots {
            for candidate in slot.candidates {
                let open = match &candidate.gate {
                    Gate::Ledger(key) => self.ledger.claim(key.clone()),
                    Gate::Daily(key) => self.day_gate.try_claim(key, now),
                };
                if open {
                    emitted.push(self.center.emit_for(
                        candidate.resource_id,
                        candidate.severity,
                        candidate.title,
                        candidate.body,
                    ));
                    break;
                }
            }
        }

        let list_updates: Vec<ListUpdate> = changes
            .iter()
            .filter_map(|change| match change {
                Change::Removed(record) => match snapshot.get(&record.id) {
                    None => Some(ListUpdate::new(record.kind, &record.id, ResourceStatus::Deleted)),
                    Some(current) if current.status.is_going_away() => {
                        Some(ListUpdate::new(record.kind, &record.id, current.status.clone()))
                    }
                    Some(current) => {
                        // Superseded by a newer sibling but still alive.
                        debug!(resource = %record.id, status = %current.status, "Head superseded");
                        None
                    }
                },
                _ => None,
            })
            .collect();
        for update in &list_updates {
            publish(self.list_updates.as_ref(), update.clone());
        }

        debug!(
            scope = %self.scope,
            baseline,
            changes = changes.len(),
            emitted = emitted.len(),
            "Reconciled snapshot"
        );

        self.previous = Some(snapshot);
        ReconcileReport {
            baseline,
            changes,
            emitted,
            list_updates,
        }
    }

    /// Fetch and reconcile once, unless `token` is cancelled by the time the
    /// fetch returns. Returns `None` when the result was discarded.
    pub async fn poll_once(&mut self, token: &CancellationToken) -> Result<Option<ReconcileReport>> {
        let snapshot = match self.source.fetch(&self.scope).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_not_found() => {
                info!(scope = %self.scope, "Workspace no longer exists");
                Snapshot::new(Vec::new())
            }
            Err(e) => return Err(e),
        };

        if token.is_cancelled() {
            debug!(scope = %self.scope, "Observer torn down, discarding snapshot");
            return Ok(None);
        }

        Ok(Some(self.reconcile(snapshot, &Local::now())))
    }
}

#[async_trait]
impl Probe for ResourceObserver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&mut self, token: &CancellationToken) -> Result<()> {
        self.poll_once(token).await.map(|_| ())
    }
}

impl std::fmt::Debug for ResourceObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceObserver")
            .field("scope", &self.scope)
            .field("has_previous", &self.previous.is_some())
            .finish_non_exhaustive()
    }
}
