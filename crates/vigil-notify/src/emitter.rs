//! Notification center.
//!
//! Process-wide display list of transient notifications. Observers emit into
//! it; a rendering layer subscribes to [`DisplayEvent`]s and shows them.
//! Emitting never blocks and never fails: if nobody is subscribed the event
//! is simply not delivered, and the notification stays in the list.
//!
//! Each notification is dismissed independently by id.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use vigil_core::log_notification;
use vigil_core::types::ResourceRecord;

/// Identifier returned by [`NotificationCenter::emit`].
pub type NotificationId = u64;

/// Default number of notifications kept before the oldest are dropped.
pub const DEFAULT_MAX_NOTIFICATIONS: usize = 100;

const EVENT_BUFFER: usize = 64;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ",
            Severity::Success => "✔",
            Severity::Warning => "⚠",
            Severity::Error => "✖",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Follow-up affordance attached to a notification.
///
/// The center does not interpret actions; the renderer does.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationAction {
    /// Fetch and show error details for the resource
    ErrorDetails { record: Box<ResourceRecord> },
    /// Open a link (e.g. launch an app); the notification is cleared once used
    Launch { label: String, url: String },
}

/// Body of a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationBody {
    Empty,
    Text { message: String },
    Action {
        message: Option<String>,
        action: NotificationAction,
    },
}

impl NotificationBody {
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text {
            message: message.into(),
        }
    }

    pub fn action(action: NotificationAction) -> Self {
        Self::Action {
            message: None,
            action,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Text { message } => Some(message),
            Self::Action { message, .. } => message.as_deref(),
        }
    }
}

/// A displayed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub severity: Severity,
    pub title: String,
    pub body: NotificationBody,
    /// Resource this notification is about, if any
    pub resource_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Format for display in one line.
    pub fn format_compact(&self) -> String {
        let subject = self
            .resource_id
            .as_deref()
            .map(|id| format!(" [{id}]"))
            .unwrap_or_default();
        format!("{}{} {}", self.severity.icon(), subject, self.title)
    }
}

/// Change to the display list, as seen by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Shown(Notification),
    Cleared(NotificationId),
}

#[derive(Debug)]
struct CenterState {
    notifications: BTreeMap<NotificationId, Notification>,
    next_id: NotificationId,
    max_notifications: usize,
}

/// Shared notification display list.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    state: Arc<Mutex<CenterState>>,
    events: broadcast::Sender<DisplayEvent>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTIFICATIONS)
    }
}

impl NotificationCenter {
    /// Create a center keeping at most `max_notifications` entries.
    pub fn new(max_notifications: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Arc::new(Mutex::new(CenterState {
                notifications: BTreeMap::new(),
                next_id: 1,
                max_notifications: max_notifications.max(1),
            })),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, CenterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to display events.
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    /// Show a notification.
    pub fn emit(
        &self,
        severity: Severity,
        title: impl Into<String>,
        body: NotificationBody,
    ) -> NotificationId {
        self.insert(severity, title.into(), body, None)
    }

    /// Show a notification about a specific resource.
    pub fn emit_for(
        &self,
        resource_id: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        body: NotificationBody,
    ) -> NotificationId {
        self.insert(severity, title.into(), body, Some(resource_id.into()))
    }

    fn insert(
        &self,
        severity: Severity,
        title: String,
        body: NotificationBody,
        resource_id: Option<String>,
    ) -> NotificationId {
        let (notification, evicted) = {
            let mut state = self.state();
            let id = state.next_id;
            state.next_id += 1;

            let notification = Notification {
                id,
                severity,
                title,
                body,
                resource_id,
                created_at: Utc::now(),
            };
            state.notifications.insert(id, notification.clone());

            let mut evicted = Vec::new();
            while state.notifications.len() > state.max_notifications {
                match state.notifications.pop_first() {
                    Some((old_id, _)) => evicted.push(old_id),
                    None => break,
                }
            }
            (notification, evicted)
        };

        log_notification!(
            notification.resource_id.as_deref().unwrap_or("-"),
            notification.severity.as_str(),
            id = notification.id,
            title = %notification.title
        );

        for old_id in evicted {
            debug!(id = old_id, "Evicting oldest notification");
            let _ = self.events.send(DisplayEvent::Cleared(old_id));
        }

        let id = notification.id;
        let _ = self.events.send(DisplayEvent::Shown(notification));
        id
    }

    /// Dismiss a notification. Returns false if it was not displayed.
    pub fn clear(&self, id: NotificationId) -> bool {
        let removed = self.state().notifications.remove(&id).is_some();
        if removed {
            let _ = self.events.send(DisplayEvent::Cleared(id));
        }
        removed
    }

    /// Dismiss everything (session reset).
    pub fn clear_all(&self) -> usize {
        let ids: Vec<NotificationId> = {
            let mut state = self.state();
            let ids = state.notifications.keys().copied().collect();
            state.notifications.clear();
            ids
        };
        for id in &ids {
            let _ = self.events.send(DisplayEvent::Cleared(*id));
        }
        ids.len()
    }

    /// Use a notification's action.
    ///
    /// Launch actions clear their notification; error-detail actions leave it
    /// displayed so the user can reopen the details.
    pub fn activate(&self, id: NotificationId) -> Option<NotificationAction> {
        let action = match self.get(id)?.body {
            NotificationBody::Action { action, .. } => action,
            _ => return None,
        };
        if matches!(action, NotificationAction::Launch { .. }) {
            self.clear(id);
        }
        Some(action)
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.state().notifications.get(&id).cloned()
    }

    /// Displayed notifications, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.state().notifications.values().cloned().collect()
    }

    /// Displayed notifications about one resource.
    pub fn for_resource(&self, resource_id: &str) -> Vec<Notification> {
        self.state()
            .notifications
            .values()
            .filter(|n| n.resource_id.as_deref() == Some(resource_id))
            .cloned()
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.state()
            .notifications
            .values()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.state().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().notifications.is_empty()
    }
}
