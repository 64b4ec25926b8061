//! End-to-end tests for the observe → diff → ledger → emit pipeline.
//!
//! These tests drive observers with scripted in-memory sources and check what
//! reaches the notification center, the ledger, and the list view.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use vigil_core::error::{Result, VigilError};
use vigil_core::ledger::{Ledger, LedgerKey};
use vigil_core::poller::Poller;
use vigil_core::session::{DayGate, MemorySessionStore};
use vigil_core::source::{ResourceSource, WorkspaceStateSource};
use vigil_core::transition::TransitionKind;
use vigil_core::types::{
    ResourceKind, ResourceRecord, ResourceStatus, Snapshot, WorkspaceRef, WorkspaceStateReport,
};
use vigil_notify::{
    DeletionTracker, NotificationCenter, NotificationPolicy, ResourceObserver, Severity,
    list_channel,
};

/// One scripted fetch result.
enum Step {
    Records(Vec<ResourceRecord>),
    Stall(Duration, Vec<ResourceRecord>),
    Fail,
    NotFound,
}

/// Source that plays a script, then repeats the last snapshot forever.
struct ScriptedSource {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Vec<ResourceRecord>>,
    calls: Mutex<usize>,
}

impl ScriptedSource {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ResourceSource for ScriptedSource {
    async fn fetch(&self, scope: &WorkspaceRef) -> Result<Snapshot> {
        *self.calls.lock().unwrap() += 1;
        let step = self.script.lock().unwrap().pop_front();
        let records = match step {
            Some(Step::Records(records)) => records,
            Some(Step::Stall(delay, records)) => {
                tokio::time::sleep(delay).await;
                records
            }
            Some(Step::Fail) => return Err(VigilError::request(scope.to_string(), "502 Bad Gateway")),
            Some(Step::NotFound) => return Err(VigilError::not_found(scope.to_string())),
            None => self.last.lock().unwrap().clone(),
        };
        *self.last.lock().unwrap() = records.clone();
        Ok(Snapshot::new(records))
    }
}

fn created() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::hours(2)
}

fn runtime(id: &str, status: ResourceStatus) -> ResourceRecord {
    ResourceRecord::new(id, ResourceKind::Runtime, "runtime", status, created())
        .with_label("tool", "RStudio")
}

struct Harness {
    center: NotificationCenter,
    ledger: Ledger,
    day_gate: DayGate,
}

impl Harness {
    fn new() -> Self {
        Self {
            center: NotificationCenter::default(),
            ledger: Ledger::new(),
            day_gate: DayGate::new(Arc::new(MemorySessionStore::new())),
        }
    }

    fn observer(&self, source: Arc<dyn ResourceSource>) -> ResourceObserver {
        ResourceObserver::new(
            WorkspaceRef::new("billing", "ws"),
            source,
            NotificationPolicy::default(),
            self.ledger.clone(),
            self.center.clone(),
            self.day_gate.clone(),
        )
    }
}

mod transition_notifications {
    use super::*;

    #[tokio::test]
    async fn test_creating_to_error_emits_once() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![
            Step::Records(vec![runtime("r1", ResourceStatus::Creating)]),
            Step::Records(vec![runtime("r1", ResourceStatus::Error)]),
        ]);
        let mut observer = harness.observer(source);
        let token = CancellationToken::new();

        observer.poll_once(&token).await.unwrap();
        assert!(harness.center.is_empty(), "Baseline poll must not notify");

        let report = observer.poll_once(&token).await.unwrap().unwrap();
        assert_eq!(report.emitted.len(), 1);
        assert!(
            harness
                .ledger
                .has(&LedgerKey::new("r1", TransitionKind::EnteredError)),
            "Ledger should record r1:EnteredError"
        );

        for _ in 0..5 {
            let report = observer.poll_once(&token).await.unwrap().unwrap();
            assert!(report.emitted.is_empty(), "Repeat polls must not re-emit");
        }

        let shown = harness.center.for_resource("r1");
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].severity, Severity::Error);
        assert_eq!(shown[0].title, "Error Creating Cloud Environment");
    }

    #[tokio::test]
    async fn test_first_poll_classifies_everything_as_new() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![Step::Records(vec![
            runtime("r1", ResourceStatus::Error),
            ResourceRecord::new("g1", ResourceKind::App, "GALAXY", ResourceStatus::Running, created()),
        ])]);
        let mut observer = harness.observer(source);

        let report = observer
            .poll_once(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert!(report.baseline);
        assert!(report.changes.iter().all(|c| !c.is_transition()));
        assert!(harness.center.is_empty());
        assert!(harness.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_two_observers_share_one_ledger() {
        let harness = Harness::new();
        let script = || {
            vec![
                Step::Records(vec![runtime("r1", ResourceStatus::Starting)]),
                Step::Records(vec![runtime("r1", ResourceStatus::Running)]),
            ]
        };
        let mut first = harness.observer(ScriptedSource::new(script()));
        let mut second = harness.observer(ScriptedSource::new(script()));
        let token = CancellationToken::new();

        for _ in 0..2 {
            first.poll_once(&token).await.unwrap();
            second.poll_once(&token).await.unwrap();
        }

        assert_eq!(harness.center.len(), 1, "Only one observer should win the ledger");
        assert_eq!(harness.center.active()[0].title, "Your cloud environment is ready.");
    }

    #[tokio::test]
    async fn test_only_newest_runtime_is_diffed() {
        let harness = Harness::new();
        let older = |status| {
            ResourceRecord::new(
                "old",
                ResourceKind::Runtime,
                "runtime",
                status,
                Utc::now() - chrono::Duration::days(3),
            )
        };
        let source = ScriptedSource::new(vec![
            Step::Records(vec![older(ResourceStatus::Running), runtime("new", ResourceStatus::Creating)]),
            Step::Records(vec![older(ResourceStatus::Error), runtime("new", ResourceStatus::Creating)]),
            Step::Records(vec![older(ResourceStatus::Error), runtime("new", ResourceStatus::Error)]),
        ]);
        let mut observer = harness.observer(source);
        let token = CancellationToken::new();

        observer.poll_once(&token).await.unwrap();
        observer.poll_once(&token).await.unwrap();
        assert!(
            harness.center.is_empty(),
            "An older sibling entering error must stay silent"
        );

        observer.poll_once(&token).await.unwrap();
        assert_eq!(harness.center.for_resource("new").len(), 1);
        assert!(harness.center.for_resource("old").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_is_a_no_op() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![
            Step::Records(vec![runtime("r1", ResourceStatus::Running)]),
            Step::Records(vec![runtime("r1", ResourceStatus::parse("Hibernating"))]),
        ]);
        let mut observer = harness.observer(source);
        let token = CancellationToken::new();

        observer.poll_once(&token).await.unwrap();
        let report = observer.poll_once(&token).await.unwrap().unwrap();
        assert_eq!(report.changes.len(), 1);
        assert!(report.emitted.is_empty());
    }
}

mod failures_and_cancellation {
    use super::*;

    #[tokio::test]
    async fn test_fetch_error_keeps_previous_snapshot() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![
            Step::Records(vec![runtime("r1", ResourceStatus::Creating)]),
            Step::Fail,
            Step::Records(vec![runtime("r1", ResourceStatus::Error)]),
        ]);
        let mut observer = harness.observer(source);
        let token = CancellationToken::new();

        observer.poll_once(&token).await.unwrap();
        let err = observer.poll_once(&token).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            observer.previous().unwrap().get("r1").unwrap().status,
            ResourceStatus::Creating
        );

        observer.poll_once(&token).await.unwrap();
        assert_eq!(harness.center.count(Severity::Error), 1);
    }

    #[tokio::test]
    async fn test_scope_not_found_removes_everything_silently() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![
            Step::Records(vec![runtime("r1", ResourceStatus::Running)]),
            Step::NotFound,
        ]);
        let (tx, mut rx) = list_channel();
        let mut observer = harness.observer(source).with_list_updates(tx);
        let token = CancellationToken::new();

        observer.poll_once(&token).await.unwrap();
        let report = observer.poll_once(&token).await.unwrap().unwrap();

        assert_eq!(report.list_updates.len(), 1);
        assert_eq!(rx.try_recv().unwrap().state, ResourceStatus::Deleted);
        assert!(harness.center.is_empty(), "Not-found is not an error notification");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_survives_fetch_errors() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![
            Step::Records(vec![runtime("r1", ResourceStatus::Updating)]),
            Step::Fail,
            Step::Fail,
            Step::Records(vec![runtime("r1", ResourceStatus::Running)]),
        ]);
        let handle = Poller::new(Duration::from_secs(10))
            .spawn(harness.observer(source.clone()), CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(source.calls(), 4);
        assert_eq!(handle.stats().failures(), 2);
        let shown = harness.center.active();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Number of workers has updated successfully.");
        assert_eq!(shown[0].severity, Severity::Success);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_ledger_writes() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![
            Step::Records(vec![runtime("r1", ResourceStatus::Creating)]),
            Step::Stall(
                Duration::from_secs(5),
                vec![runtime("r1", ResourceStatus::Error)],
            ),
        ]);
        let token = CancellationToken::new();
        let handle = Poller::new(Duration::from_secs(1))
            .spawn(harness.observer(source.clone()), token.child_token());

        // First probe at t=0, second starts at t=1 and stalls until t=6
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.calls(), 2);

        token.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!handle.is_running());
        assert!(harness.ledger.is_empty(), "No ledger write after teardown");
        assert!(harness.center.is_empty());
    }
}

mod age_gating {
    use super::*;

    fn old_runtime() -> ResourceRecord {
        ResourceRecord::new(
            "r1",
            ResourceKind::Runtime,
            "runtime",
            ResourceStatus::Running,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_outdated_warning_once_per_calendar_day() {
        let harness = Harness::new();
        let mut observer = harness.observer(ScriptedSource::new(Vec::new()));
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let snapshot = || Snapshot::new(vec![old_runtime()]);

        let morning = tz.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let evening = tz.with_ymd_and_hms(2024, 6, 10, 23, 30, 0).unwrap();
        let next_morning = tz.with_ymd_and_hms(2024, 6, 11, 0, 15, 0).unwrap();

        assert_eq!(observer.reconcile(snapshot(), &morning).emitted.len(), 1);
        assert!(
            observer.reconcile(snapshot(), &evening).emitted.is_empty(),
            "Same calendar day must not re-notify"
        );
        assert_eq!(observer.reconcile(snapshot(), &next_morning).emitted.len(), 1);

        assert_eq!(harness.center.count(Severity::Warning), 2);
        assert!(harness.ledger.is_empty(), "Age warnings do not use the ledger");
    }

    #[tokio::test]
    async fn test_error_takes_precedence_over_age() {
        let harness = Harness::new();
        let mut observer = harness.observer(ScriptedSource::new(Vec::new()));
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();

        observer.reconcile(Snapshot::new(vec![old_runtime()]), &now);
        let mut failed = old_runtime();
        failed.status = ResourceStatus::Error;
        let later = now + chrono::Duration::days(1);
        let report = observer.reconcile(Snapshot::new(vec![failed.clone()]), &later);

        assert_eq!(report.emitted.len(), 1);
        let shown = harness.center.get(report.emitted[0]).unwrap();
        assert_eq!(shown.severity, Severity::Error);

        // The error outranked today's age warning, which is still due
        let report = observer.reconcile(
            Snapshot::new(vec![failed.clone()]),
            &(later + chrono::Duration::hours(1)),
        );
        assert_eq!(report.emitted.len(), 1);
        let shown = harness.center.get(report.emitted[0]).unwrap();
        assert_eq!(shown.severity, Severity::Warning);

        let report = observer.reconcile(
            Snapshot::new(vec![failed]),
            &(later + chrono::Duration::hours(2)),
        );
        assert!(report.emitted.is_empty());
    }
}

mod workspace_deletion {
    use super::*;

    struct GoneWorkspace;

    #[async_trait]
    impl WorkspaceStateSource for GoneWorkspace {
        async fn workspace_state(&self, workspace: &WorkspaceRef) -> Result<WorkspaceStateReport> {
            Err(VigilError::not_found(workspace.to_string()))
        }
    }

    #[tokio::test]
    async fn test_deleting_then_not_found_is_deleted() {
        let harness = Harness::new();
        let (tx, mut rx) = list_channel();
        let mut tracker = DeletionTracker::new(Arc::new(GoneWorkspace)).with_list_updates(tx);
        tracker.track(WorkspaceRef::new("billing", "w1").with_workspace_id("w1"));

        let updates = tracker.check(&CancellationToken::new()).await;

        assert_eq!(updates.len(), 1);
        let update = rx.try_recv().unwrap();
        assert_eq!(update.resource_id, "w1");
        assert_eq!(update.state, ResourceStatus::Deleted);
        assert!(harness.center.is_empty(), "Deletion is not an alert");
        assert!(harness.ledger.is_empty(), "Deletion writes no ledger entry");
        assert!(tracker.tracked().is_empty());
    }
}
