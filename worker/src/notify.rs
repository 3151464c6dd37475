//! Notification Platform
//!
//! Notification display, window clients, and the platform collaborator used
//! by push and notification-click handling.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use spin::RwLock;

/// Notify error types.
#[derive(Debug, Clone)]
pub enum NotifyError {
    /// Notification permission was not granted.
    PermissionDenied,
    /// No client with the given id.
    ClientNotFound,
    /// Window could not be opened.
    OpenFailed(String),
}

/// Push payload rendered as a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub body: String,
    /// Target URL attached as notification data.
    pub url: String,
}

/// Notification options.
#[derive(Debug, Clone)]
pub struct NotificationOptions {
    /// Body text.
    pub body: Option<String>,
    /// Icon image.
    pub icon: Option<String>,
    /// Badge image.
    pub badge: Option<String>,
    /// Data attached to the notification (the click target URL).
    pub data: Option<String>,
}

impl NotificationOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self {
            body: None,
            icon: None,
            badge: None,
            data: None,
        }
    }

    /// Set body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set badge.
    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    /// Set data.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// Window client.
    Window,
    /// Worker client.
    Worker,
    /// All types.
    All,
}

impl Default for ClientType {
    fn default() -> Self {
        Self::Window
    }
}

/// Visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    /// Hidden.
    Hidden,
    /// Visible.
    Visible,
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self::Visible
    }
}

/// Client info.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Client ID.
    pub id: String,
    /// Client type.
    pub client_type: ClientType,
    /// URL the client currently shows.
    pub url: String,
    /// Visibility state.
    pub visibility: VisibilityState,
    /// Whether focused.
    pub focused: bool,
}

impl ClientInfo {
    /// Create a visible, unfocused window client.
    pub fn window(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_type: ClientType::Window,
            url: url.into(),
            visibility: VisibilityState::Visible,
            focused: false,
        }
    }
}

/// Options for match_all.
#[derive(Debug, Clone, Default)]
pub struct MatchAllOptions {
    /// Include clients not yet controlled by this worker.
    pub include_uncontrolled: bool,
    /// Client type filter.
    pub client_type: ClientType,
}

/// Notification platform collaborator.
///
/// System notification display plus the window-client surface that click
/// handling navigates.
pub trait NotificationPlatform: Send + Sync {
    /// Render a system notification; returns its id.
    fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<u64, NotifyError>;

    /// Enumerate clients matching the filter.
    fn match_all(&self, options: &MatchAllOptions) -> Vec<ClientInfo>;

    /// Open a new window at the URL; the new client is focused.
    fn open_window(&self, url: &str) -> Result<ClientInfo, NotifyError>;

    /// Focus the client with the given id.
    fn focus(&self, client_id: &str) -> Result<(), NotifyError>;
}

/// A shown notification.
#[derive(Debug, Clone)]
pub struct ShownNotification {
    /// Notification id.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Options it was shown with.
    pub options: NotificationOptions,
}

struct WindowClientsInner {
    clients: Vec<ClientInfo>,
    notifications: Vec<ShownNotification>,
    next_client_id: u64,
    next_notification_id: u64,
}

/// In-memory window-client and notification registry.
pub struct WindowClients {
    inner: RwLock<WindowClientsInner>,
}

impl WindowClients {
    /// Create with no open clients.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(WindowClientsInner {
                clients: Vec::new(),
                notifications: Vec::new(),
                next_client_id: 1,
                next_notification_id: 1,
            }),
        }
    }

    /// Add an open client.
    pub fn add(&self, client: ClientInfo) {
        self.inner.write().clients.push(client);
    }

    /// Remove a client by id. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        let len_before = inner.clients.len();
        inner.clients.retain(|c| c.id != id);
        inner.clients.len() != len_before
    }

    /// Snapshot of all clients.
    pub fn clients(&self) -> Vec<ClientInfo> {
        self.inner.read().clients.clone()
    }

    /// Shown notifications.
    pub fn notifications(&self) -> Vec<ShownNotification> {
        self.inner.read().notifications.clone()
    }

    /// Close a shown notification by id. Returns whether it existed.
    pub fn close_notification(&self, id: u64) -> bool {
        let mut inner = self.inner.write();
        let len_before = inner.notifications.len();
        inner.notifications.retain(|n| n.id != id);
        inner.notifications.len() != len_before
    }
}

impl Default for WindowClients {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPlatform for WindowClients {
    fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<u64, NotifyError> {
        let mut inner = self.inner.write();
        let id = inner.next_notification_id;
        inner.next_notification_id += 1;
        inner.notifications.push(ShownNotification {
            id,
            title: title.to_string(),
            options: options.clone(),
        });
        Ok(id)
    }

    fn match_all(&self, options: &MatchAllOptions) -> Vec<ClientInfo> {
        self.inner
            .read()
            .clients
            .iter()
            .filter(|client| {
                options.client_type == ClientType::All
                    || client.client_type == options.client_type
            })
            .cloned()
            .collect()
    }

    fn open_window(&self, url: &str) -> Result<ClientInfo, NotifyError> {
        let mut inner = self.inner.write();
        let id = inner.next_client_id;
        inner.next_client_id += 1;

        for client in inner.clients.iter_mut() {
            client.focused = false;
        }

        let client = ClientInfo {
            id: format!("client-{}", id),
            client_type: ClientType::Window,
            url: url.to_string(),
            visibility: VisibilityState::Visible,
            focused: true,
        };
        inner.clients.push(client.clone());
        Ok(client)
    }

    fn focus(&self, client_id: &str) -> Result<(), NotifyError> {
        let mut inner = self.inner.write();
        if !inner.clients.iter().any(|c| c.id == client_id) {
            return Err(NotifyError::ClientNotFound);
        }
        for client in inner.clients.iter_mut() {
            client.focused = client.id == client_id;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builders() {
        let options = NotificationOptions::new()
            .with_body("body text")
            .with_icon("/images/icon-192x192.png")
            .with_badge("/images/icon-96x96.png")
            .with_data("/report");
        assert_eq!(options.body.as_deref(), Some("body text"));
        assert_eq!(options.icon.as_deref(), Some("/images/icon-192x192.png"));
        assert_eq!(options.badge.as_deref(), Some("/images/icon-96x96.png"));
        assert_eq!(options.data.as_deref(), Some("/report"));
    }

    #[test]
    fn test_push_payload_roundtrip() {
        let json = br#"{"title":"New report","body":"Ready to view","url":"/report"}"#;
        let payload: PushPayload = serde_json::from_slice(json).unwrap();
        assert_eq!(payload.title, "New report");
        assert_eq!(payload.body, "Ready to view");
        assert_eq!(payload.url, "/report");

        let back = serde_json::to_string(&payload).unwrap();
        assert!(back.contains("\"title\":\"New report\""));
    }

    #[test]
    fn test_show_notification_assigns_ids() {
        let platform = WindowClients::new();
        let first = platform
            .show_notification("one", &NotificationOptions::new())
            .unwrap();
        let second = platform
            .show_notification("two", &NotificationOptions::new())
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(platform.notifications().len(), 2);
    }

    #[test]
    fn test_close_notification() {
        let platform = WindowClients::new();
        let id = platform
            .show_notification("one", &NotificationOptions::new())
            .unwrap();
        assert!(platform.close_notification(id));
        assert!(!platform.close_notification(id));
        assert!(platform.notifications().is_empty());
    }

    #[test]
    fn test_match_all_filters_by_type() {
        let platform = WindowClients::new();
        platform.add(ClientInfo::window("tab-1", "/"));
        let mut worker = ClientInfo::window("bg-1", "/worker");
        worker.client_type = ClientType::Worker;
        platform.add(worker);

        let windows = platform.match_all(&MatchAllOptions {
            include_uncontrolled: true,
            client_type: ClientType::Window,
        });
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].id, "tab-1");

        let all = platform.match_all(&MatchAllOptions {
            include_uncontrolled: true,
            client_type: ClientType::All,
        });
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_open_window_focuses_new_client() {
        let platform = WindowClients::new();
        let mut existing = ClientInfo::window("tab-1", "/");
        existing.focused = true;
        platform.add(existing);

        let opened = platform.open_window("/report").unwrap();
        assert!(opened.focused);
        assert_eq!(opened.url, "/report");

        let clients = platform.clients();
        assert_eq!(clients.len(), 2);
        let old = clients.iter().find(|c| c.id == "tab-1").unwrap();
        assert!(!old.focused);
    }

    #[test]
    fn test_focus_switches_focus() {
        let platform = WindowClients::new();
        platform.add(ClientInfo::window("tab-1", "/"));
        let mut other = ClientInfo::window("tab-2", "/report");
        other.focused = true;
        platform.add(other);

        platform.focus("tab-1").unwrap();
        let clients = platform.clients();
        assert!(clients.iter().find(|c| c.id == "tab-1").unwrap().focused);
        assert!(!clients.iter().find(|c| c.id == "tab-2").unwrap().focused);
    }

    #[test]
    fn test_focus_unknown_client() {
        let platform = WindowClients::new();
        assert!(matches!(
            platform.focus("tab-9"),
            Err(NotifyError::ClientNotFound)
        ));
    }
}
