//! Snapshot differ.
//!
//! Compares the snapshot from the previous poll with the current one and
//! classifies every tracked resource as new, unchanged, transitioned, or
//! removed. Only the *current* resource of each role takes part: among the
//! records sharing a role, the most recently created one that is not being
//! deleted. Older siblings are ignored, so a user who recreates a runtime only
//! hears about the new one.
//!
//! [`diff`] is a pure function of its two inputs.

use std::collections::HashMap;

use crate::log_transition;
use crate::types::{ResourceRecord, ResourceStatus, Snapshot};

/// Classification of one resource between two polls.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// No counterpart in the previous snapshot (or there was no previous snapshot)
    New(ResourceRecord),
    /// Same status as before
    Unchanged(ResourceRecord),
    /// Status changed from `from` to `record.status`
    Transitioned {
        from: ResourceStatus,
        record: ResourceRecord,
    },
    /// Was current in the previous snapshot, is no longer current
    Removed(ResourceRecord),
}

impl Change {
    /// The record this change refers to (the previous record for removals).
    pub fn record(&self) -> &ResourceRecord {
        match self {
            Self::New(record) | Self::Unchanged(record) | Self::Removed(record) => record,
            Self::Transitioned { record, .. } => record,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transitioned { .. })
    }
}

/// Select the current record of every role, in order of first appearance.
///
/// The newest non-deleting record wins; equal timestamps go to the record
/// listed later. A role whose records are all going away has no current record.
pub fn current_by_role(snapshot: &Snapshot) -> Vec<&ResourceRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut heads: HashMap<&str, &ResourceRecord> = HashMap::new();

    for record in &snapshot.records {
        if record.status.is_going_away() {
            continue;
        }
        let role = record.role.as_str();
        let replace = match heads.get(role) {
            Some(head) => head.created_at <= record.created_at,
            None => {
                order.push(role);
                true
            }
        };
        if replace {
            heads.insert(role, record);
        }
    }

    order.into_iter().filter_map(|role| heads.get(role).copied()).collect()
}

/// The current record of a single role.
pub fn current_for_role<'a>(snapshot: &'a Snapshot, role: &str) -> Option<&'a ResourceRecord> {
    current_by_role(snapshot)
        .into_iter()
        .find(|record| record.role == role)
}

/// Diff two snapshots.
///
/// With no previous snapshot every current record is [`Change::New`].
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Change> {
    let current_heads = current_by_role(current);
    let previous_heads = previous.map(current_by_role).unwrap_or_default();

    let previous_by_id: HashMap<&str, &ResourceRecord> = previous_heads
        .iter()
        .map(|record| (record.id.as_str(), *record))
        .collect();

    let mut changes = Vec::with_capacity(current_heads.len());

    for record in &current_heads {
        let change = match previous_by_id.get(record.id.as_str()) {
            None => Change::New((*record).clone()),
            Some(prev) if prev.status == record.status => Change::Unchanged((*record).clone()),
            Some(prev) => {
                log_transition!(
                    record.id.as_str(),
                    from = %prev.status,
                    to = %record.status
                );
                Change::Transitioned {
                    from: prev.status.clone(),
                    record: (*record).clone(),
                }
            }
        };
        changes.push(change);
    }

    for prev in previous_heads {
        if !current_heads.iter().any(|record| record.id == prev.id) {
            changes.push(Change::Removed(prev.clone()));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;
    use chrono::{Duration, TimeZone, Utc};

    fn runtime(id: &str, status: ResourceStatus, age_days: i64) -> ResourceRecord {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        ResourceRecord::new(
            id,
            ResourceKind::Runtime,
            "runtime",
            status,
            base - Duration::days(age_days),
        )
    }

    fn snapshot(records: Vec<ResourceRecord>) -> Snapshot {
        Snapshot::new(records)
    }

    #[test]
    fn test_first_poll_is_all_new() {
        let current = snapshot(vec![runtime("r1", ResourceStatus::Error, 1)]);
        let changes = diff(None, &current);
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], Change::New(r) if r.id == "r1"));
    }

    #[test]
    fn test_transition_detected() {
        let prev = snapshot(vec![runtime("r1", ResourceStatus::Creating, 1)]);
        let current = snapshot(vec![runtime("r1", ResourceStatus::Error, 1)]);
        let changes = diff(Some(&prev), &current);
        assert_eq!(
            changes,
            vec![Change::Transitioned {
                from: ResourceStatus::Creating,
                record: runtime("r1", ResourceStatus::Error, 1),
            }]
        );
    }

    #[test]
    fn test_same_status_is_unchanged() {
        let prev = snapshot(vec![runtime("r1", ResourceStatus::Running, 1)]);
        let current = prev.clone();
        let changes = diff(Some(&prev), &current);
        assert!(matches!(&changes[0], Change::Unchanged(_)));
        assert!(!changes[0].is_transition());
    }

    #[test]
    fn test_only_newest_of_role_participates() {
        let prev = snapshot(vec![
            runtime("old", ResourceStatus::Running, 30),
            runtime("new", ResourceStatus::Creating, 1),
        ]);
        let current = snapshot(vec![
            runtime("old", ResourceStatus::Error, 30),
            runtime("new", ResourceStatus::Running, 1),
        ]);
        let changes = diff(Some(&prev), &current);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            Change::Transitioned { from, record } => {
                assert_eq!(record.id, "new");
                assert_eq!(*from, ResourceStatus::Creating);
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn test_deleting_records_are_never_current() {
        let current = snapshot(vec![
            runtime("a", ResourceStatus::Stopped, 10),
            runtime("b", ResourceStatus::Deleting, 1),
        ]);
        let heads = current_by_role(&current);
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].id, "a");
    }

    #[test]
    fn test_role_going_away_is_removed() {
        let prev = snapshot(vec![runtime("r1", ResourceStatus::Running, 1)]);
        let current = snapshot(vec![runtime("r1", ResourceStatus::Deleting, 1)]);
        let changes = diff(Some(&prev), &current);
        assert_eq!(changes, vec![Change::Removed(runtime("r1", ResourceStatus::Running, 1))]);
    }

    #[test]
    fn test_replacement_resource_is_new_and_old_removed() {
        let prev = snapshot(vec![runtime("r1", ResourceStatus::Running, 5)]);
        let current = snapshot(vec![runtime("r2", ResourceStatus::Creating, 0)]);
        let changes = diff(Some(&prev), &current);
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::New(r) if r.id == "r2"));
        assert!(matches!(&changes[1], Change::Removed(r) if r.id == "r1"));
    }

    #[test]
    fn test_roles_are_diffed_independently() {
        let app = |id: &str, role: &str, status| {
            ResourceRecord::new(
                id,
                ResourceKind::App,
                role,
                status,
                Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            )
        };
        let prev = snapshot(vec![
            app("galaxy-1", "GALAXY", ResourceStatus::Provisioning),
            app("cromwell-1", "CROMWELL", ResourceStatus::Running),
        ]);
        let current = snapshot(vec![
            app("galaxy-1", "GALAXY", ResourceStatus::Running),
            app("cromwell-1", "CROMWELL", ResourceStatus::Running),
        ]);
        let changes = diff(Some(&prev), &current);
        assert_eq!(changes.len(), 2);
        assert!(changes[0].is_transition());
        assert!(matches!(&changes[1], Change::Unchanged(_)));
    }

    #[test]
    fn test_equal_timestamps_prefer_later_record() {
        let current = snapshot(vec![
            runtime("first", ResourceStatus::Running, 1),
            runtime("second", ResourceStatus::Running, 1),
        ]);
        assert_eq!(current_for_role(&current, "runtime").unwrap().id, "second");
    }

    #[test]
    fn test_unknown_status_change_is_still_total() {
        let prev = snapshot(vec![runtime("r1", ResourceStatus::Running, 1)]);
        let current = snapshot(vec![runtime(
            "r1",
            ResourceStatus::Unknown("Hibernating".into()),
            1,
        )]);
        let changes = diff(Some(&prev), &current);
        assert!(changes[0].is_transition());
    }
}
