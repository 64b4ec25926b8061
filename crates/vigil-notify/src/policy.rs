//! Transition-to-notification policy.
//!
//! Turns the changes of one poll into [`Slot`]s. A slot holds the mutually
//! exclusive notifications for one current resource, highest precedence
//! first. The observer walks each slot and emits the first candidate whose
//! gate is still open; the policy itself never touches the ledger or the
//! session store.
//!
//! Precedence within a slot: error, ready, legacy warning, outdated warning,
//! update complete.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use vigil_core::config::{AgeConfig, NotificationConfig, VigilConfig};
use vigil_core::diff::Change;
use vigil_core::ledger::LedgerKey;
use vigil_core::transition::TransitionKind;
use vigil_core::types::{ResourceKind, ResourceRecord, ResourceStatus, WorkspaceRef};

use crate::emitter::{NotificationAction, NotificationBody, Severity};

pub const TITLE_RUNTIME_ERROR: &str = "Error Creating Cloud Environment";
pub const TITLE_READY: &str = "Your cloud environment is ready.";
pub const TITLE_LEGACY: &str = "Please Update Your Cloud Environment";
pub const TITLE_OUTDATED: &str = "Outdated Cloud Environment";
pub const TITLE_UPDATE_COMPLETE: &str = "Number of workers has updated successfully.";

/// What must be unclaimed for a candidate to be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Once per session, via the dedup ledger
    Ledger(LedgerKey),
    /// Once per calendar day, via the session store
    Daily(String),
}

/// A notification the policy would like to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub gate: Gate,
    pub resource_id: String,
    pub severity: Severity,
    pub title: String,
    pub body: NotificationBody,
}

/// Mutually exclusive candidates for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub resource_id: String,
    pub candidates: Vec<Candidate>,
}

/// Session key for the once-a-day age warning of a resource.
pub fn outdated_key(kind: ResourceKind, resource_id: &str) -> String {
    format!("notifiedOutdated{}{}", kind.label(), resource_id)
}

/// `GALAXY` → `Galaxy`.
/// Ready title. Apps name their type.
pub fn ready_title(record: &ResourceRecord) -> String {
    match record.kind {
        ResourceKind::App => format!(
            "Your cloud environment for {} is ready.",
            display_app_type(&record.role)
        ),
        _ => TITLE_READY.to_string(),
    }
}

pub fn display_app_type(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    notifications: NotificationConfig,
    age: AgeConfig,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self::new(NotificationConfig::default(), AgeConfig::default())
    }
}

impl NotificationPolicy {
    pub fn new(notifications: NotificationConfig, age: AgeConfig) -> Self {
        Self { notifications, age }
    }

    pub fn from_config(config: &VigilConfig) -> Self {
        Self::new(config.notifications.clone(), config.age.clone())
    }

    /// Transition kind a change represents, if any.
    ///
    /// On the baseline cycle new heads are not transitions, except existing
    /// errors when `notify_existing_errors` is set.
    pub fn transition_of(&self, change: &Change, baseline: bool) -> Option<TransitionKind> {
        match change {
            Change::New(record) if baseline => {
                (self.notifications.notify_existing_errors
                    && record.status == ResourceStatus::Error)
                    .then_some(TransitionKind::EnteredError)
            }
            Change::New(record) => TransitionKind::classify(None, &record.status),
            Change::Transitioned { from, record } => TransitionKind::classify(Some(from), &record.status),
            Change::Unchanged(_) | Change::Removed(_) => None,
        }
    }

    /// Plan the notifications for one cycle.
    pub fn plan(
        &self,
        changes: &[Change],
        baseline: bool,
        scope: &WorkspaceRef,
        now: DateTime<Utc>,
    ) -> Vec<Slot> {
        changes
            .iter()
            .filter_map(|change| {
                let record = match change {
                    Change::Removed(_) => return None,
                    other => other.record(),
                };
                if record.status.is_unknown() {
                    debug!(
                        resource_id = %record.id,
                        status = %record.status,
                        "Unrecognized status, no notification"
                    );
                }

                let transition = self.transition_of(change, baseline);
                let candidates = self.candidates(record, transition, scope, now);
                (!candidates.is_empty()).then(|| Slot {
                    resource_id: record.id.clone(),
                    candidates,
                })
            })
            .collect()
    }

    fn candidates(
        &self,
        record: &ResourceRecord,
        transition: Option<TransitionKind>,
        scope: &WorkspaceRef,
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        let mut out = Vec::new();

        match transition {
            Some(TransitionKind::EnteredError) => out.push(self.error(record)),
            Some(TransitionKind::EnteredRunning) if self.is_ready_eligible(record) => {
                out.push(self.ready(record, scope))
            }
            _ => {}
        }

        out.extend(self.age_warning(record, now));

        if transition == Some(TransitionKind::FinishedUpdating)
            && record.kind == ResourceKind::Runtime
        {
            out.push(Candidate {
                gate: Gate::Ledger(LedgerKey::new(&record.id, TransitionKind::FinishedUpdating)),
                resource_id: record.id.clone(),
                severity: Severity::Success,
                title: TITLE_UPDATE_COMPLETE.to_string(),
                body: NotificationBody::Empty,
            });
        }

        out
    }

    fn is_ready_eligible(&self, record: &ResourceRecord) -> bool {
        match record.kind {
            ResourceKind::Runtime => record
                .tool()
                .is_some_and(|tool| self.notifications.ready_tools.iter().any(|t| t == tool)),
            ResourceKind::App => self
                .notifications
                .ready_app_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&record.role)),
            ResourceKind::Workspace => false,
        }
    }

    fn error(&self, record: &ResourceRecord) -> Candidate {
        let title = match record.kind {
            ResourceKind::App => format!("Error Creating {} App", display_app_type(&record.role)),
            _ => TITLE_RUNTIME_ERROR.to_string(),
        };
        Candidate {
            gate: Gate::Ledger(LedgerKey::new(&record.id, TransitionKind::EnteredError)),
            resource_id: record.id.clone(),
            severity: Severity::Error,
            title,
            body: NotificationBody::Action {
                message: record.error_message.clone(),
                action: NotificationAction::ErrorDetails {
                    record: Box::new(record.clone()),
                },
            },
        }
    }

    fn ready(&self, record: &ResourceRecord, scope: &WorkspaceRef) -> Candidate {
        let tool = match record.kind {
            ResourceKind::App => display_app_type(&record.role),
            _ => record.tool().unwrap_or("cloud environment").to_string(),
        };
        let body = match &self.notifications.launch_url_template {
            Some(template) => NotificationBody::action(NotificationAction::Launch {
                label: format!("Open {tool}"),
                url: template
                    .replace("{namespace}", &scope.namespace)
                    .replace("{name}", &scope.name)
                    .replace("{tool}", &tool),
            }),
            None => NotificationBody::text(format!("{tool} is ready to use.")),
        };
        Candidate {
            gate: Gate::Ledger(LedgerKey::new(&record.id, TransitionKind::EnteredRunning)),
            resource_id: record.id.clone(),
            severity: Severity::Info,
            title: ready_title(record),
            body,
        }
    }

    /// Legacy warning, or failing that the outdated warning. At most one.
    fn age_warning(&self, record: &ResourceRecord, now: DateTime<Utc>) -> Option<Candidate> {
        let policy = self.age.for_kind(record.kind)?;
        let gate = Gate::Daily(outdated_key(record.kind, &record.id));

        if let Some(cutoff) = policy.legacy_cutoff {
            if record.created_at.date_naive() < cutoff {
                return Some(Candidate {
                    gate,
                    resource_id: record.id.clone(),
                    severity: Severity::Warning,
                    title: TITLE_LEGACY.to_string(),
                    body: NotificationBody::text(format!(
                        "This cloud environment was created before {cutoff} and is no longer \
                         compatible with saved work. Delete it and create a new one to keep \
                         your changes."
                    )),
                });
            }
        }

        let max_days = policy.max_age_days?;
        if now - record.created_at > Duration::days(i64::from(max_days)) {
            return Some(Candidate {
                gate,
                resource_id: record.id.clone(),
                severity: Severity::Warning,
                title: TITLE_OUTDATED.to_string(),
                body: NotificationBody::text(format!(
                    "This cloud environment is over {max_days} days old. Delete it and create \
                     a new one to get the latest features and security updates."
                )),
            });
        }

        None
    }
}
