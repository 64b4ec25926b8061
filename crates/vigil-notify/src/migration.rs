//! Workspace bucket migration progress.
//!
//! [`progress_label`] renders the status line shown next to a migrating
//! workspace. [`MigrationTracker`] polls the migration reports of one billing
//! project and notifies once per workspace when its migration finishes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vigil_core::error::Result;
use vigil_core::ledger::{Ledger, LedgerKey};
use vigil_core::poller::Probe;
use vigil_core::source::MigrationSource;
use vigil_core::transition::TransitionKind;
use vigil_core::types::{MigrationOutcome, MigrationReport, MigrationStep, TransferProgress};

use crate::emitter::{NotificationBody, NotificationCenter, NotificationId, Severity};

pub const TITLE_MIGRATION_COMPLETE: &str = "Workspace Migration Complete";
pub const TITLE_MIGRATION_FAILED: &str = "Workspace Migration Failed";

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Human-readable byte count in binary units.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn transfer_label(stage: &str, progress: Option<TransferProgress>) -> String {
    let progress = progress.unwrap_or_default();
    if progress.total_bytes_to_transfer == 0 {
        return format!("{stage} Bucket Transfer");
    }
    format!(
        "{stage} Transfer in Progress ({}/{})",
        format_bytes(progress.bytes_transferred),
        format_bytes(progress.total_bytes_to_transfer)
    )
}

/// Status line for a workspace. `None` while the migration is unscheduled.
pub fn progress_label(report: &MigrationReport) -> Option<String> {
    match &report.outcome {
        Some(MigrationOutcome::Failure(_)) => return Some("Migration Failed".to_string()),
        Some(MigrationOutcome::Success) => return Some("Migration Complete".to_string()),
        None => {}
    }

    let label = match report.step {
        MigrationStep::Unscheduled => return None,
        MigrationStep::ScheduledForMigration => "Starting Migration".to_string(),
        MigrationStep::PreparingTransferToTempBucket => "Preparing Original Bucket".to_string(),
        MigrationStep::TransferringToTempBucket => {
            transfer_label("Initial", report.temp_bucket_transfer)
        }
        MigrationStep::PreparingTransferToFinalBucket => "Creating Destination Bucket".to_string(),
        MigrationStep::TransferringToFinalBucket => {
            transfer_label("Final", report.final_bucket_transfer)
        }
        MigrationStep::FinishingUp | MigrationStep::Finished => "Finishing Migration".to_string(),
    };
    Some(label)
}

/// Polls migration reports and notifies on finished migrations.
pub struct MigrationTracker {
    billing_project: String,
    source: Arc<dyn MigrationSource>,
    ledger: Ledger,
    center: NotificationCenter,
    previous: Option<HashMap<String, MigrationReport>>,
    name: String,
}

impl MigrationTracker {
    pub fn new(
        billing_project: impl Into<String>,
        source: Arc<dyn MigrationSource>,
        ledger: Ledger,
        center: NotificationCenter,
    ) -> Self {
        let billing_project = billing_project.into();
        let name = format!("migrations:{billing_project}");
        Self {
            billing_project,
            source,
            ledger,
            center,
            previous: None,
            name,
        }
    }

    /// Reports seen on the last successful check, by `namespace/name`.
    pub fn reports(&self) -> Option<&HashMap<String, MigrationReport>> {
        self.previous.as_ref()
    }

    /// Apply one set of reports. The first set is a baseline and never notifies.
    pub fn reconcile(&mut self, reports: Vec<MigrationReport>) -> Vec<NotificationId> {
        let mut emitted = Vec::new();
        let current: HashMap<String, MigrationReport> = reports
            .into_iter()
            .map(|report| (report.workspace_key(), report))
            .collect();

        if let Some(previous) = &self.previous {
            for (key, report) in &current {
                let before = previous.get(key).and_then(|p| p.outcome.as_ref());
                if report.outcome.as_ref() == before {
                    continue;
                }
                let label = progress_label(report).unwrap_or_default();
                debug!(workspace = %key, label = %label, "Migration progressed");

                let (kind, severity, title, body) = match &report.outcome {
                    Some(MigrationOutcome::Success) => (
                        TransitionKind::MigrationSucceeded,
                        Severity::Success,
                        TITLE_MIGRATION_COMPLETE,
                        NotificationBody::text(format!("Bucket migration of {key} finished.")),
                    ),
                    Some(MigrationOutcome::Failure(reason)) => (
                        TransitionKind::MigrationFailed,
                        Severity::Error,
                        TITLE_MIGRATION_FAILED,
                        NotificationBody::text(format!("{key}: {reason}")),
                    ),
                    None => continue,
                };

                if self.ledger.claim(LedgerKey::new(key, kind)) {
                    emitted.push(self.center.emit_for(key, severity, title, body));
                }
            }
        }

        self.previous = Some(current);
        emitted
    }
}

#[async_trait]
impl Probe for MigrationTracker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&mut self, token: &CancellationToken) -> Result<()> {
        let reports = self.source.migrations(&self.billing_project).await?;
        if token.is_cancelled() {
            return Ok(());
        }
        self.reconcile(reports);
        Ok(())
    }
}

impl std::fmt::Debug for MigrationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationTracker")
            .field("billing_project", &self.billing_project)
            .finish_non_exhaustive()
    }
}
