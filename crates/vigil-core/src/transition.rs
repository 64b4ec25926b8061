//! Named transition kinds.
//!
//! A transition kind is what a status change *means* to the user. The mapping
//! from a `(from, to)` status pair is an exhaustive match, so a new
//! [`ResourceStatus`] variant has to be considered here before it compiles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ResourceStatus;

/// The user-visible meaning of a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionKind {
    /// The resource failed
    EnteredError,
    /// The resource became usable
    EnteredRunning,
    /// An update (e.g. worker resize) completed
    FinishedUpdating,
    /// The resource no longer exists
    Deleted,
    /// A workspace bucket migration completed
    MigrationSucceeded,
    /// A workspace bucket migration failed
    MigrationFailed,
}

impl TransitionKind {
    /// Classify a status change. `from` is `None` when the resource was not
    /// observed before.
    ///
    /// Returns `None` for changes that carry no meaning, including a change
    /// into a status Vigil does not recognize.
    pub fn classify(from: Option<&ResourceStatus>, to: &ResourceStatus) -> Option<Self> {
        use ResourceStatus as S;

        if from == Some(to) {
            return None;
        }
        match to {
            S::Error => Some(Self::EnteredError),
            S::Running => match from {
                Some(S::Updating) => Some(Self::FinishedUpdating),
                _ => Some(Self::EnteredRunning),
            },
            S::Deleted => Some(Self::Deleted),
            S::Creating
            | S::Provisioning
            | S::Starting
            | S::Updating
            | S::Stopping
            | S::Stopped
            | S::Deleting
            | S::DeleteFailed
            | S::Unknown(_) => None,
        }
    }

    /// Name used in ledger keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnteredError => "EnteredError",
            Self::EnteredRunning => "EnteredRunning",
            Self::FinishedUpdating => "FinishedUpdating",
            Self::Deleted => "Deleted",
            Self::MigrationSucceeded => "MigrationSucceeded",
            Self::MigrationFailed => "MigrationFailed",
        }
    }

    /// Whether this transition produces a user-visible alert.
    ///
    /// Deletions only update list views.
    pub fn alerts(&self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceStatus as S;

    #[test]
    fn test_classify_error() {
        assert_eq!(
            TransitionKind::classify(Some(&S::Creating), &S::Error),
            Some(TransitionKind::EnteredError)
        );
        assert_eq!(
            TransitionKind::classify(None, &S::Error),
            Some(TransitionKind::EnteredError)
        );
        assert_eq!(TransitionKind::classify(Some(&S::Error), &S::Error), None);
    }

    #[test]
    fn test_classify_running() {
        assert_eq!(
            TransitionKind::classify(Some(&S::Starting), &S::Running),
            Some(TransitionKind::EnteredRunning)
        );
        assert_eq!(
            TransitionKind::classify(Some(&S::Updating), &S::Running),
            Some(TransitionKind::FinishedUpdating)
        );
    }

    #[test]
    fn test_classify_deleted() {
        let kind = TransitionKind::classify(Some(&S::Deleting), &S::Deleted).unwrap();
        assert_eq!(kind, TransitionKind::Deleted);
        assert!(!kind.alerts());
    }

    #[test]
    fn test_unknown_target_status_is_no_op() {
        assert_eq!(
            TransitionKind::classify(Some(&S::Running), &S::Unknown("Paused".into())),
            None
        );
        assert_eq!(
            TransitionKind::classify(Some(&S::Unknown("Paused".into())), &S::Error),
            Some(TransitionKind::EnteredError)
        );
    }

    #[test]
    fn test_uninteresting_changes() {
        assert_eq!(TransitionKind::classify(Some(&S::Running), &S::Stopping), None);
        assert_eq!(TransitionKind::classify(Some(&S::Creating), &S::Starting), None);
    }
}
