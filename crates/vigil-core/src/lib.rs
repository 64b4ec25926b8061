//! # vigil-core
//!
//! Core types and machinery for Vigil's change detection.
//!
//! This crate provides:
//! - [`VigilError`] - Error type shared by all Vigil crates
//! - [`logging`] - Tracing setup
//! - [`config`] - YAML configuration
//! - [`types`] - Resource records, statuses, and snapshots
//! - [`source`] - Traits for the remote backend
//! - [`diff`] - Snapshot differ
//! - [`transition`] - Named transition kinds
//! - [`ledger`] - Dedup ledger of already-notified transitions
//! - [`session`] - Session store and once-per-day gate
//! - [`poller`] - Cancellable interval polling
//!
//! ## Example
//!
//! ```
//! use vigil_core::diff::{diff, Change};
//! use vigil_core::types::{ResourceKind, ResourceRecord, ResourceStatus, Snapshot};
//!
//! let created = chrono::Utc::now();
//! let before = Snapshot::new(vec![ResourceRecord::new(
//!     "r1", ResourceKind::Runtime, "runtime", ResourceStatus::Creating, created,
//! )]);
//! let after = Snapshot::new(vec![ResourceRecord::new(
//!     "r1", ResourceKind::Runtime, "runtime", ResourceStatus::Error, created,
//! )]);
//!
//! let changes = diff(Some(&before), &after);
//! assert!(matches!(&changes[0], Change::Transitioned { .. }));
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod poller;
pub mod session;
pub mod source;
pub mod transition;
pub mod types;

// Re-export main types for convenience
pub use config::VigilConfig;
pub use diff::{Change, diff};
pub use error::{Result, VigilError};
pub use ledger::{Ledger, LedgerKey};
pub use logging::{LogGuard, init_logging};
pub use poller::{PollHandle, Poller, Probe};
pub use session::{DayGate, MemorySessionStore, SessionStore};
pub use transition::TransitionKind;
pub use types::{ResourceKind, ResourceRecord, ResourceStatus, Snapshot, WorkspaceRef};
