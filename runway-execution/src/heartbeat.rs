//! Heartbeat registry
//!
//! Tracks the activity context of every in-flight script so a background
//! ticker can keep the owning workflow alive. Entries are keyed by a
//! registration token, so two concurrent runs of the same script id never
//! remove each other's entry.

use parking_lot::Mutex;
use runway_interfaces::ActivityContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

struct Entry {
    script_id: String,
    context: Arc<dyn ActivityContext>,
}

#[derive(Default)]
pub struct HeartbeatRegistry {
    entries: Mutex<HashMap<u64, Entry>>,
    next_token: AtomicU64,
}

impl HeartbeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `context` until the returned guard is dropped
    pub fn register(
        self: &Arc<Self>,
        script_id: impl Into<String>,
        context: Arc<dyn ActivityContext>,
    ) -> HeartbeatGuard {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let script_id = script_id.into();
        trace!("Registering heartbeat for {}", script_id);
        self.entries.lock().insert(token, Entry { script_id, context });
        HeartbeatGuard {
            registry: Arc::clone(self),
            token,
        }
    }

    fn remove(&self, token: u64) {
        if let Some(entry) = self.entries.lock().remove(&token) {
            trace!("Removed heartbeat for {}", entry.script_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, script_id: &str) -> bool {
        self.entries
            .lock()
            .values()
            .any(|entry| entry.script_id == script_id)
    }

    /// Script ids currently registered, sorted
    pub fn script_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .lock()
            .values()
            .map(|entry| entry.script_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Signal every registered context without waiting on any of them.
    ///
    /// Returns the number of heartbeats sent.
    pub fn beat(&self) -> usize {
        let contexts: Vec<Arc<dyn ActivityContext>> = self
            .entries
            .lock()
            .values()
            .map(|entry| Arc::clone(&entry.context))
            .collect();

        for context in &contexts {
            let context = Arc::clone(context);
            tokio::spawn(async move {
                context.heartbeat().await;
            });
        }

        contexts.len()
    }

    /// Beat every `interval` until the ticker is stopped
    pub fn start_ticker(self: &Arc<Self>, interval: Duration) -> HeartbeatTicker {
        let registry = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let sent = registry.beat();
                if sent > 0 {
                    debug!("Sent {} heartbeats", sent);
                }
            }
        });
        HeartbeatTicker { handle }
    }
}

/// Removes its registry entry when dropped
#[must_use = "the heartbeat entry is removed as soon as the guard is dropped"]
pub struct HeartbeatGuard {
    registry: Arc<HeartbeatRegistry>,
    token: u64,
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.registry.remove(self.token);
    }
}

/// Background task driving [`HeartbeatRegistry::beat`]
pub struct HeartbeatTicker {
    handle: JoinHandle<()>,
}

impl HeartbeatTicker {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for HeartbeatTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
