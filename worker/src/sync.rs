//! Background Sync
//!
//! The durable-queue collaborator, sync events, and the platform-side
//! registration bookkeeping that drives batch retries.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use spin::RwLock;

use crate::events::{EventType, ExtendableEvent};

/// Sync error types.
#[derive(Debug, Clone)]
pub enum SyncError {
    /// Record not found in the queue.
    NotFound,
    /// Queue storage error.
    StorageError(String),
}

/// A record awaiting delivery.
///
/// Produced by the durable queue; the payload is opaque to the worker and
/// forwarded verbatim to the sync endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSyncRecord {
    /// Record identifier.
    pub id: u64,
    /// Opaque payload.
    pub data: serde_json::Value,
}

impl PendingSyncRecord {
    /// Create a new record.
    pub fn new(id: u64, data: serde_json::Value) -> Self {
        Self { id, data }
    }
}

/// Durable sync queue collaborator.
pub trait SyncQueue: Send + Sync {
    /// All records awaiting delivery, in queue order.
    fn list_pending(&self) -> Vec<PendingSyncRecord>;

    /// Delete a delivered record by id.
    fn remove(&self, id: u64) -> Result<(), SyncError>;
}

/// In-memory sync queue.
pub struct MemorySyncQueue {
    records: RwLock<Vec<PendingSyncRecord>>,
}

impl MemorySyncQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Append a record.
    pub fn enqueue(&self, record: PendingSyncRecord) {
        self.records.write().push(record);
    }

    /// Number of records still queued.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemorySyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncQueue for MemorySyncQueue {
    fn list_pending(&self) -> Vec<PendingSyncRecord> {
        self.records.read().clone()
    }

    fn remove(&self, id: u64) -> Result<(), SyncError> {
        let mut records = self.records.write();
        let len_before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == len_before {
            Err(SyncError::NotFound)
        } else {
            Ok(())
        }
    }
}

/// Sync event.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    tag: String,
    last_chance: bool,
    outcome: Option<bool>,
    wait_until: bool,
}

impl SyncEvent {
    /// Create a new sync event.
    pub fn new(tag: impl Into<String>, last_chance: bool) -> Self {
        Self {
            tag: tag.into(),
            last_chance,
            outcome: None,
            wait_until: false,
        }
    }

    /// Get the registration tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Check if this is the platform's final retry.
    pub fn last_chance(&self) -> bool {
        self.last_chance
    }

    /// Record the handler's delivery outcome.
    pub fn complete(&mut self, success: bool) {
        self.outcome = Some(success);
    }

    /// The recorded outcome, if the handler ran.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }
}

impl ExtendableEvent for SyncEvent {
    fn event_type(&self) -> EventType {
        EventType::Sync
    }

    fn wait_until(&mut self) {
        self.wait_until = true;
    }

    fn has_wait_until(&self) -> bool {
        self.wait_until
    }
}

/// Sync registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for connectivity.
    Pending,
    /// Sync event being dispatched.
    Firing,
    /// Failed, will retry.
    Reregistering,
    /// Max retries exceeded.
    Failed,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Platform-side registration of a sync tag.
#[derive(Debug, Clone)]
pub struct SyncRegistration {
    tag: String,
    state: SyncState,
    retry_count: u32,
    max_retries: u32,
    last_chance: bool,
}

impl SyncRegistration {
    /// Create a new registration.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            state: SyncState::Pending,
            retry_count: 0,
            max_retries: 3,
            last_chance: false,
        }
    }

    /// Get the tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Get the state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Check if the next fire is the last chance.
    pub fn last_chance(&self) -> bool {
        self.last_chance
    }

    fn mark_firing(&mut self) {
        self.state = SyncState::Firing;
    }

    /// Record a failed fire. Returns whether the registration will retry.
    fn mark_failed(&mut self) -> bool {
        self.retry_count += 1;
        if self.retry_count >= self.max_retries {
            self.last_chance = true;
            self.state = SyncState::Firing;
            false
        } else {
            self.state = SyncState::Reregistering;
            true
        }
    }
}

/// Platform-side sync bookkeeping.
///
/// Tracks which tags await delivery and applies the retry policy the worker
/// handler defers to: a failed batch is re-fired until the retry cap, then
/// fired one last time and dropped.
pub struct SyncManager {
    registrations: BTreeMap<String, SyncRegistration>,
}

impl SyncManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
        }
    }

    /// Register a tag. Registering an existing tag is a no-op.
    pub fn register(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.registrations.contains_key(&tag) {
            self.registrations.insert(tag.clone(), SyncRegistration::new(tag));
        }
    }

    /// Get a registration by tag.
    pub fn get(&self, tag: &str) -> Option<&SyncRegistration> {
        self.registrations.get(tag)
    }

    /// Get all registered tags.
    pub fn tags(&self) -> Vec<String> {
        self.registrations.keys().cloned().collect()
    }

    /// Unregister a tag.
    pub fn unregister(&mut self, tag: &str) -> bool {
        self.registrations.remove(tag).is_some()
    }

    /// Events for every registration awaiting delivery.
    pub fn fire_pending(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for registration in self.registrations.values_mut() {
            if registration.state == SyncState::Pending
                || registration.state == SyncState::Reregistering
            {
                registration.mark_firing();
                events.push(SyncEvent::new(
                    registration.tag.clone(),
                    registration.last_chance,
                ));
            }
        }
        events
    }

    /// Feed a handler's delivery outcome back in.
    pub fn complete(&mut self, tag: &str, success: bool) {
        let retire = match self.registrations.get_mut(tag) {
            Some(registration) => {
                if success {
                    true
                } else if registration.last_chance {
                    registration.state = SyncState::Failed;
                    log::warn!("[Sync] {} failed permanently", tag);
                    true
                } else {
                    registration.mark_failed();
                    false
                }
            }
            None => false,
        };
        if retire {
            self.registrations.remove(tag);
        }
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_record(id: u64) -> PendingSyncRecord {
        PendingSyncRecord::new(id, json!({ "title": "entry" }))
    }

    #[test]
    fn test_queue_lists_in_order() {
        let queue = MemorySyncQueue::new();
        queue.enqueue(make_record(1));
        queue.enqueue(make_record(2));

        let pending = queue.list_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, 1);
        assert_eq!(pending[1].id, 2);
    }

    #[test]
    fn test_queue_remove() {
        let queue = MemorySyncQueue::new();
        queue.enqueue(make_record(1));
        queue.enqueue(make_record(2));

        queue.remove(1).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.list_pending()[0].id, 2);
    }

    #[test]
    fn test_queue_remove_missing() {
        let queue = MemorySyncQueue::new();
        assert!(matches!(queue.remove(9), Err(SyncError::NotFound)));
    }

    #[test]
    fn test_record_serializes_with_id() {
        let record = make_record(3);
        let body = serde_json::to_vec(&record).unwrap();
        let text = core::str::from_utf8(&body).unwrap();
        assert!(text.contains("\"id\":3"));
        assert!(text.contains("\"title\":\"entry\""));
    }

    #[test]
    fn test_sync_event_outcome() {
        let mut event = SyncEvent::new("sync-data", false);
        assert_eq!(event.tag(), "sync-data");
        assert!(event.outcome().is_none());
        event.complete(false);
        assert_eq!(event.outcome(), Some(false));
    }

    #[test]
    fn test_registration_retry_ladder() {
        let mut registration = SyncRegistration::new("sync-data");
        assert_eq!(registration.state(), SyncState::Pending);

        assert!(registration.mark_failed());
        assert_eq!(registration.state(), SyncState::Reregistering);
        assert!(registration.mark_failed());

        // Third failure exhausts the cap: one last-chance fire.
        assert!(!registration.mark_failed());
        assert!(registration.last_chance());
        assert_eq!(registration.state(), SyncState::Firing);
    }

    #[test]
    fn test_manager_register_dedup() {
        let mut manager = SyncManager::new();
        manager.register("sync-data");
        manager.register("sync-data");
        assert_eq!(manager.tags().len(), 1);
    }

    #[test]
    fn test_manager_fire_pending_marks_firing() {
        let mut manager = SyncManager::new();
        manager.register("a");
        manager.register("b");

        let events = manager.fire_pending();
        assert_eq!(events.len(), 2);
        assert_eq!(manager.get("a").unwrap().state(), SyncState::Firing);

        // Already firing: nothing new fires.
        assert!(manager.fire_pending().is_empty());
    }

    #[test]
    fn test_manager_complete_success_retires() {
        let mut manager = SyncManager::new();
        manager.register("sync-data");
        manager.fire_pending();
        manager.complete("sync-data", true);
        assert!(manager.get("sync-data").is_none());
    }

    #[test]
    fn test_manager_complete_failure_reregisters() {
        let mut manager = SyncManager::new();
        manager.register("sync-data");
        manager.fire_pending();
        manager.complete("sync-data", false);

        let registration = manager.get("sync-data").unwrap();
        assert_eq!(registration.state(), SyncState::Reregistering);

        // The failed tag fires again on the next pass.
        assert_eq!(manager.fire_pending().len(), 1);
    }

    #[test]
    fn test_manager_last_chance_failure_retires() {
        let mut manager = SyncManager::new();
        manager.register("sync-data");

        for _ in 0..3 {
            manager.fire_pending();
            manager.complete("sync-data", false);
        }
        assert!(manager.get("sync-data").unwrap().last_chance());

        // Last-chance fire also fails: the registration is dropped.
        manager.fire_pending();
        manager.complete("sync-data", false);
        assert!(manager.get("sync-data").is_none());
    }
}
