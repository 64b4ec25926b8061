//! Session-scoped key-value storage and the calendar-day gate.
//!
//! Age warnings ("your runtime is outdated") are repeated at most once per
//! calendar day per resource. The last notification time lives in a
//! [`SessionStore`] keyed by resource; [`DayGate`] compares it to "now" by
//! calendar date in the caller's timezone, never by timestamp equality.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

use crate::error::{Result, VigilError};

/// Scoped key-value store holding timestamps.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<DateTime<Utc>>;
    fn set(&self, key: &str, value: DateTime<Utc>);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// In-memory store that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    values: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.values().get(key).copied()
    }

    fn set(&self, key: &str, value: DateTime<Utc>) {
        self.values().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values().remove(key);
    }

    fn clear(&self) {
        self.values().clear();
    }
}

/// Store persisted as a JSON object on disk, so a CLI session survives restarts.
///
/// Writes are best effort: a failed write is logged and the in-memory value
/// is still used.
#[derive(Debug)]
pub struct JsonFileSessionStore {
    path: PathBuf,
    cache: MemorySessionStore,
}

impl JsonFileSessionStore {
    /// Open (or create on first write) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = MemorySessionStore::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| VigilError::io("reading session store", &path, e))?;
            if !content.trim().is_empty() {
                let values: HashMap<String, DateTime<Utc>> = serde_json::from_str(&content)
                    .map_err(|e| VigilError::json_parse(path.display().to_string(), e))?;
                *cache.values() = values;
            }
        }

        Ok(Self { path, cache })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        let values = self.cache.values().clone();
        let result = serde_json::to_string_pretty(&values)
            .map_err(|e| VigilError::json_parse("serializing session store", e))
            .and_then(|json| {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| VigilError::io("creating session dir", parent, e))?;
                }
                std::fs::write(&self.path, json)
                    .map_err(|e| VigilError::io("writing session store", &self.path, e))
            });
        if let Err(e) = result {
            warn!("Failed to persist session store: {}", e);
        }
    }
}

impl SessionStore for JsonFileSessionStore {
    fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: DateTime<Utc>) {
        self.cache.set(key, value);
        self.persist();
    }

    fn remove(&self, key: &str) {
        self.cache.remove(key);
        self.persist();
    }

    fn clear(&self) {
        self.cache.clear();
        self.persist();
    }
}

/// Once-per-calendar-day gate over a [`SessionStore`].
#[derive(Clone)]
pub struct DayGate {
    store: Arc<dyn SessionStore>,
}

impl DayGate {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Returns true if `key` was already notified on the calendar day of `now`.
    pub fn notified_today<Tz: TimeZone>(&self, key: &str, now: &DateTime<Tz>) -> bool {
        match self.store.get(key) {
            Some(last) => last.with_timezone(&now.timezone()).date_naive() == now.date_naive(),
            None => false,
        }
    }

    /// Claim today's notification for `key`.
    ///
    /// Returns false (and records nothing) if it was already notified today.
    pub fn try_claim<Tz: TimeZone>(&self, key: &str, now: &DateTime<Tz>) -> bool {
        if self.notified_today(key, now) {
            return false;
        }
        self.store.set(key, now.with_timezone(&Utc));
        true
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

impl std::fmt::Debug for DayGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DayGate").finish_non_exhaustive()
    }
}
