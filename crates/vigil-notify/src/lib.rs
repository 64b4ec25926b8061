//! # vigil-notify
//!
//! Turns observed resource changes into user-facing notifications.
//!
//! - [`emitter`] - Notification center with independently dismissible entries
//! - [`policy`] - Which changes alert, with what wording and precedence
//! - [`observer`] - Per-workspace poll → diff → ledger → emit pipeline
//! - [`deletion`] - Workspace deletion tracking for list views
//! - [`migration`] - Bucket migration progress and completion notices
//! - [`details`] - Error detail resolution behind the error action
//! - [`list`] - List-view updates for removed resources

pub mod deletion;
pub mod details;
pub mod emitter;
pub mod list;
pub mod migration;
pub mod observer;
pub mod policy;

pub use deletion::DeletionTracker;
pub use details::{ErrorDetailResolver, ErrorReport};
pub use emitter::{
    DisplayEvent, Notification, NotificationAction, NotificationBody, NotificationCenter,
    NotificationId, Severity,
};
pub use list::{ListUpdate, list_channel};
pub use migration::{MigrationTracker, progress_label};
pub use observer::{ReconcileReport, ResourceObserver};
pub use policy::NotificationPolicy;
