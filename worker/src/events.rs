//! Worker Events
//!
//! Event kinds, lifetime extension, push and notification-click events, and
//! the handler dispatch table.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::fetch::FetchEvent;
use crate::lifecycle::{ActivateEvent, InstallEvent};
use crate::sync::SyncEvent;
use crate::WorkerError;

/// Event type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventType {
    /// Install event.
    Install,
    /// Activate event.
    Activate,
    /// Fetch event.
    Fetch,
    /// Sync event.
    Sync,
    /// Push event.
    Push,
    /// Notification click event.
    NotificationClick,
}

/// Extendable event trait.
///
/// Handlers mark an event as lifetime-extended before performing
/// asynchronous side effects; the host keeps the worker alive while any
/// dispatched event has an extension pending.
pub trait ExtendableEvent {
    /// Get event type.
    fn event_type(&self) -> EventType;

    /// Extend the event's lifetime until the handler's work settles.
    fn wait_until(&mut self);

    /// Check if wait_until was called.
    fn has_wait_until(&self) -> bool;
}

/// Push event data.
#[derive(Debug, Clone)]
pub struct PushEvent {
    data: Option<Vec<u8>>,
    wait_until: bool,
}

impl PushEvent {
    /// Create a new push event.
    pub fn new(data: Option<Vec<u8>>) -> Self {
        Self {
            data,
            wait_until: false,
        }
    }

    /// Get the push payload.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Get the payload as text.
    pub fn text(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| core::str::from_utf8(d).ok().map(|s| s.to_string()))
    }
}

impl ExtendableEvent for PushEvent {
    fn event_type(&self) -> EventType {
        EventType::Push
    }

    fn wait_until(&mut self) {
        self.wait_until = true;
    }

    fn has_wait_until(&self) -> bool {
        self.wait_until
    }
}

/// Notification click event.
#[derive(Debug, Clone)]
pub struct NotificationClickEvent {
    notification_id: u64,
    target_url: Option<String>,
    closed: bool,
    wait_until: bool,
}

impl NotificationClickEvent {
    /// Create a new notification click event.
    pub fn new(notification_id: u64) -> Self {
        Self {
            notification_id,
            target_url: None,
            closed: false,
            wait_until: false,
        }
    }

    /// Set the target URL carried as notification data.
    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    /// Get the activated notification's id.
    pub fn notification_id(&self) -> u64 {
        self.notification_id
    }

    /// Get the target URL.
    pub fn target_url(&self) -> Option<&str> {
        self.target_url.as_deref()
    }

    /// Close the activated notification.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Check if the notification was closed.
    pub fn closed(&self) -> bool {
        self.closed
    }
}

impl ExtendableEvent for NotificationClickEvent {
    fn event_type(&self) -> EventType {
        EventType::NotificationClick
    }

    fn wait_until(&mut self) {
        self.wait_until = true;
    }

    fn has_wait_until(&self) -> bool {
        self.wait_until
    }
}

/// Worker event union dispatched through the handler table.
#[derive(Debug)]
pub enum WorkerEvent {
    /// Install event.
    Install(InstallEvent),
    /// Activate event.
    Activate(ActivateEvent),
    /// Fetch event.
    Fetch(FetchEvent),
    /// Sync event.
    Sync(SyncEvent),
    /// Push event.
    Push(PushEvent),
    /// Notification click event.
    NotificationClick(NotificationClickEvent),
}

impl WorkerEvent {
    /// Get the kind this event dispatches under.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Install(_) => EventType::Install,
            Self::Activate(_) => EventType::Activate,
            Self::Fetch(_) => EventType::Fetch,
            Self::Sync(_) => EventType::Sync,
            Self::Push(_) => EventType::Push,
            Self::NotificationClick(_) => EventType::NotificationClick,
        }
    }
}

/// A registered event handler.
pub type Handler = Box<dyn Fn(&mut WorkerEvent) -> Result<(), WorkerError> + Send + Sync>;

/// Event handler dispatch table.
///
/// Holds exactly one handler per event kind; registering a kind again
/// replaces the previous handler.
pub struct HandlerTable {
    handlers: BTreeMap<EventType, Handler>,
}

impl HandlerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register the handler for an event kind.
    ///
    /// Returns whether a previous handler was replaced.
    pub fn register(&mut self, kind: EventType, handler: Handler) -> bool {
        self.handlers.insert(kind, handler).is_some()
    }

    /// Check if a handler is registered for the kind.
    pub fn has_handler(&self, kind: EventType) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch an event to its registered handler.
    pub fn dispatch(&self, event: &mut WorkerEvent) -> Result<(), WorkerError> {
        match self.handlers.get(&event.event_type()) {
            Some(handler) => handler(event),
            None => Err(WorkerError::NoHandler),
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Request;

    #[test]
    fn test_push_event_data_and_text() {
        let event = PushEvent::new(Some(b"hello".to_vec()));
        assert_eq!(event.data(), Some(&b"hello"[..]));
        assert_eq!(event.text().as_deref(), Some("hello"));

        let empty = PushEvent::new(None);
        assert!(empty.data().is_none());
        assert!(empty.text().is_none());
    }

    #[test]
    fn test_push_event_non_utf8_text() {
        let event = PushEvent::new(Some(alloc::vec![0xff, 0xfe]));
        assert!(event.text().is_none());
    }

    #[test]
    fn test_notification_click_event() {
        let mut event = NotificationClickEvent::new(7).with_target_url("/report");
        assert_eq!(event.notification_id(), 7);
        assert_eq!(event.target_url(), Some("/report"));
        assert!(!event.closed());
        event.close();
        assert!(event.closed());
    }

    #[test]
    fn test_worker_event_kinds() {
        assert_eq!(
            WorkerEvent::Install(InstallEvent::new()).event_type(),
            EventType::Install
        );
        assert_eq!(
            WorkerEvent::Fetch(FetchEvent::new(Request::get("/"))).event_type(),
            EventType::Fetch
        );
        assert_eq!(
            WorkerEvent::Push(PushEvent::new(None)).event_type(),
            EventType::Push
        );
    }

    #[test]
    fn test_table_register_and_dispatch() {
        let mut table = HandlerTable::new();
        assert!(table.is_empty());

        let replaced = table.register(EventType::Push, Box::new(|_| Ok(())));
        assert!(!replaced);
        assert!(table.has_handler(EventType::Push));
        assert_eq!(table.len(), 1);

        let mut event = WorkerEvent::Push(PushEvent::new(None));
        assert!(table.dispatch(&mut event).is_ok());
    }

    #[test]
    fn test_table_register_replaces() {
        let mut table = HandlerTable::new();
        table.register(EventType::Fetch, Box::new(|_| Ok(())));
        let replaced = table.register(
            EventType::Fetch,
            Box::new(|_| Err(WorkerError::NoHandler)),
        );
        assert!(replaced);
        assert_eq!(table.len(), 1);

        // The second registration won.
        let mut event = WorkerEvent::Fetch(FetchEvent::new(Request::get("/")));
        assert!(matches!(
            table.dispatch(&mut event),
            Err(WorkerError::NoHandler)
        ));
    }

    #[test]
    fn test_dispatch_without_handler_fails() {
        let table = HandlerTable::new();
        let mut event = WorkerEvent::Install(InstallEvent::new());
        assert!(matches!(
            table.dispatch(&mut event),
            Err(WorkerError::NoHandler)
        ));
    }

    #[test]
    fn test_dispatch_mutates_event() {
        let mut table = HandlerTable::new();
        table.register(
            EventType::Install,
            Box::new(|event| {
                if let WorkerEvent::Install(install) = event {
                    install.wait_until();
                }
                Ok(())
            }),
        );

        let mut event = WorkerEvent::Install(InstallEvent::new());
        table.dispatch(&mut event).unwrap();
        if let WorkerEvent::Install(install) = &event {
            assert!(install.has_wait_until());
        } else {
            panic!("event kind changed");
        }
    }
}
