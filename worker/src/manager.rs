//! Cache Manager
//!
//! The worker component itself: precache the asset manifest at install,
//! evict superseded cache versions at activate, serve intercepted requests
//! cache-first with network fallback, deliver queued sync records, and
//! display push notifications.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::RwLock;

use crate::cache::CacheStore;
use crate::config::WorkerConfig;
use crate::events::{
    EventType, ExtendableEvent, HandlerTable, NotificationClickEvent, PushEvent, WorkerEvent,
};
use crate::fetch::{FetchEvent, Network, Request, Response, ResponseType};
use crate::lifecycle::{is_valid_transition, ActivateEvent, InstallEvent, WorkerState};
use crate::notify::{
    ClientType, MatchAllOptions, NotificationOptions, NotificationPlatform, PushPayload,
};
use crate::sync::{SyncEvent, SyncQueue};
use crate::WorkerError;

/// Check if a runtime response may be stored.
///
/// Only complete same-origin responses are cached; opaque cross-origin and
/// error-proxy responses are returned to the caller but never stored.
fn is_cacheable(response: &Response) -> bool {
    response.status == 200 && response.response_type == ResponseType::Basic
}

/// Check if a sync POST was accepted: any non-error HTTP status.
fn delivered(response: &Response) -> bool {
    response.response_type != ResponseType::Error && response.status < 400
}

/// The offline cache manager.
///
/// Owns the worker configuration and the collaborator handles; the host
/// platform drives it by dispatching lifecycle and resource events, either
/// directly or through the table built by [`CacheManager::handlers`].
pub struct CacheManager {
    config: WorkerConfig,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    queue: Arc<dyn SyncQueue>,
    platform: Arc<dyn NotificationPlatform>,
    state: RwLock<WorkerState>,
    skip_waiting_requested: AtomicBool,
}

impl CacheManager {
    /// Create a manager from configuration and collaborators.
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        queue: Arc<dyn SyncQueue>,
        platform: Arc<dyn NotificationPlatform>,
    ) -> Self {
        Self {
            config,
            store,
            network,
            queue,
            platform,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting_requested: AtomicBool::new(false),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Whether install requested immediate activation.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting_requested.load(Ordering::SeqCst)
    }

    fn transition(&self, to: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.write();
        if !is_valid_transition(*state, to) {
            return Err(WorkerError::InvalidStateTransition);
        }
        log::debug!("[Worker] state {:?} -> {:?}", *state, to);
        *state = to;
        Ok(())
    }

    fn fail_install(&self, reason: String) -> WorkerError {
        let _ = self.transition(WorkerState::Redundant);
        WorkerError::InstallFailed(reason)
    }

    /// Install: precache the asset manifest, all-or-nothing.
    ///
    /// Every manifest URL is fetched before anything is committed, so a
    /// failing entry leaves no partial cache behind and any previous worker
    /// version stays active.
    pub fn handle_install(&self, event: &mut InstallEvent) -> Result<(), WorkerError> {
        self.transition(WorkerState::Installing)?;
        event.wait_until();
        log::info!(
            "[Worker] installing {}: precaching {} assets",
            self.config.cache_name,
            self.config.precache_manifest.len()
        );

        let mut assets = Vec::with_capacity(self.config.precache_manifest.len());
        for url in &self.config.precache_manifest {
            let request = Request::get(url.as_str());
            match self.network.fetch(&request) {
                Ok(response) if response.ok() => assets.push((request, response)),
                Ok(response) => {
                    log::error!("[Worker] precache of {} failed: status {}", url, response.status);
                    return Err(self.fail_install(format!("{}: status {}", url, response.status)));
                }
                Err(err) => {
                    log::error!("[Worker] precache of {} failed: {:?}", url, err);
                    return Err(self.fail_install(format!("{}: {:?}", url, err)));
                }
            }
        }

        self.store
            .open(&self.config.cache_name)
            .map_err(|err| self.fail_install(format!("open: {:?}", err)))?;
        for (request, response) in assets {
            self.store
                .put(&self.config.cache_name, &request, response)
                .map_err(|err| self.fail_install(format!("{}: {:?}", request.url, err)))?;
        }

        self.transition(WorkerState::Installed)?;
        if self.config.skip_waiting {
            self.skip_waiting_requested.store(true, Ordering::SeqCst);
            log::debug!("[Worker] skip waiting requested");
        }
        Ok(())
    }

    /// Activate: evict every cache whose name is not the current version.
    ///
    /// The host must await this before dispatching fetches, so no fetch is
    /// served from a store being deleted.
    pub fn handle_activate(&self, event: &mut ActivateEvent) -> Result<(), WorkerError> {
        self.transition(WorkerState::Activating)?;
        event.wait_until();

        for name in self.store.names() {
            if name != self.config.cache_name {
                match self.store.delete(&name) {
                    Ok(_) => log::info!("[Worker] evicted stale cache {}", name),
                    Err(err) => {
                        log::error!("[Worker] eviction of {} failed: {:?}", name, err);
                        let _ = self.transition(WorkerState::Redundant);
                        return Err(WorkerError::ActivateFailed(format!("{}: {:?}", name, err)));
                    }
                }
            }
        }

        self.transition(WorkerState::Activated)
    }

    /// Fetch interception: cache-first with network fallback.
    ///
    /// The event is always resolved: with the cached response, the fresh
    /// network response, the cached offline fallback, or a network-error
    /// response. In dynamic mode a valid fresh response is also stored.
    pub fn handle_fetch(&self, event: &mut FetchEvent) -> Result<(), WorkerError> {
        event.wait_until();

        if let Some(cached) = self
            .store
            .match_request(&self.config.cache_name, event.request())
        {
            log::debug!("[Worker] cache hit: {}", event.request().url);
            event.respond_with(cached);
            return Ok(());
        }

        log::debug!("[Worker] cache miss, fetching: {}", event.request().url);
        match self.network.fetch(event.request()) {
            Ok(response) => {
                if self.config.dynamic_caching && is_cacheable(&response) {
                    // One copy for the caller, one for the cache.
                    if let Err(err) = self.store.put(
                        &self.config.cache_name,
                        event.request(),
                        response.clone_response(),
                    ) {
                        log::warn!(
                            "[Worker] runtime caching of {} failed: {:?}",
                            event.request().url,
                            err
                        );
                    }
                }
                event.respond_with(response);
            }
            Err(err) => {
                log::warn!("[Worker] fetch of {} failed: {:?}", event.request().url, err);
                event.respond_with(self.offline_fallback());
            }
        }
        Ok(())
    }

    /// Fallback response for a failed fetch with no cache entry.
    fn offline_fallback(&self) -> Response {
        if let Some(url) = &self.config.offline_fallback {
            if let Some(page) = self
                .store
                .match_request(&self.config.cache_name, &Request::get(url.as_str()))
            {
                return page;
            }
        }
        Response::error()
    }

    /// Background sync: deliver queued records to the sync endpoint.
    ///
    /// Records are POSTed one at a time in queue order and removed only
    /// after the endpoint accepts them. The first failure aborts the batch
    /// and reports `false`; records not yet removed stay queued for the
    /// platform's retry.
    pub fn handle_sync(&self, event: &mut SyncEvent) -> bool {
        if event.tag() != self.config.sync_tag {
            log::debug!("[Worker] ignoring sync tag {}", event.tag());
            event.complete(true);
            return true;
        }
        event.wait_until();

        let records = self.queue.list_pending();
        log::info!(
            "[Worker] sync {}: delivering {} records",
            self.config.sync_tag,
            records.len()
        );

        for record in records {
            let body = match serde_json::to_vec(&record) {
                Ok(body) => body,
                Err(err) => {
                    log::error!("[Worker] record {} not serializable: {}", record.id, err);
                    event.complete(false);
                    return false;
                }
            };
            let request = Request::post(self.config.sync_endpoint.as_str(), body)
                .content_type("application/json");

            match self.network.fetch(&request) {
                Ok(response) if delivered(&response) => {
                    if let Err(err) = self.queue.remove(record.id) {
                        log::error!(
                            "[Worker] record {} delivered but not removed: {:?}",
                            record.id,
                            err
                        );
                        event.complete(false);
                        return false;
                    }
                    log::debug!("[Worker] record {} delivered", record.id);
                }
                Ok(response) => {
                    log::warn!(
                        "[Worker] record {} rejected: status {}",
                        record.id,
                        response.status
                    );
                    event.complete(false);
                    return false;
                }
                Err(err) => {
                    log::warn!("[Worker] record {} send failed: {:?}", record.id, err);
                    event.complete(false);
                    return false;
                }
            }
        }

        event.complete(true);
        true
    }

    /// Push: render the payload as a system notification.
    ///
    /// Fire-and-forget: a missing or malformed payload is logged and
    /// dropped, never surfaced.
    pub fn handle_push(&self, event: &mut PushEvent) -> Result<(), WorkerError> {
        event.wait_until();

        let data = match event.data() {
            Some(data) => data,
            None => {
                log::warn!("[Worker] push event without payload");
                return Ok(());
            }
        };
        let payload: PushPayload = match serde_json::from_slice(data) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("[Worker] push payload not valid JSON: {}", err);
                return Ok(());
            }
        };

        let mut options = NotificationOptions::new()
            .with_body(payload.body)
            .with_data(payload.url);
        if let Some(icon) = &self.config.notification_icon {
            options = options.with_icon(icon.clone());
        }
        if let Some(badge) = &self.config.notification_badge {
            options = options.with_badge(badge.clone());
        }

        match self.platform.show_notification(&payload.title, &options) {
            Ok(id) => log::debug!("[Worker] notification {} shown", id),
            Err(err) => log::warn!("[Worker] notification not shown: {:?}", err),
        }
        Ok(())
    }

    /// Notification click: focus the client already showing the target URL,
    /// or open a new window there. Exactly one window is focused or opened.
    pub fn handle_notification_click(
        &self,
        event: &mut NotificationClickEvent,
    ) -> Result<(), WorkerError> {
        event.wait_until();
        event.close();

        let target = match event.target_url() {
            Some(url) => url.to_string(),
            None => {
                log::debug!("[Worker] notification {} has no target", event.notification_id());
                return Ok(());
            }
        };

        let clients = self.platform.match_all(&MatchAllOptions {
            include_uncontrolled: true,
            client_type: ClientType::Window,
        });
        match clients.iter().find(|client| client.url == target) {
            Some(client) => {
                log::debug!("[Worker] focusing client {} at {}", client.id, target);
                if let Err(err) = self.platform.focus(&client.id) {
                    log::warn!("[Worker] focus of {} failed: {:?}", client.id, err);
                }
            }
            None => match self.platform.open_window(&target) {
                Ok(client) => log::debug!("[Worker] opened {} at {}", client.id, target),
                Err(err) => log::warn!("[Worker] open window at {} failed: {:?}", target, err),
            },
        }
        Ok(())
    }

    /// Build the default dispatch table: one handler per event kind, each
    /// delegating to the corresponding operation.
    ///
    /// A sync handler's delivery outcome is reported through the event, not
    /// as a dispatch error; the platform's retry bookkeeping consumes it.
    pub fn handlers(manager: Arc<Self>) -> HandlerTable {
        let mut table = HandlerTable::new();

        let m = Arc::clone(&manager);
        table.register(
            EventType::Install,
            Box::new(move |event| match event {
                WorkerEvent::Install(install) => m.handle_install(install),
                _ => Ok(()),
            }),
        );

        let m = Arc::clone(&manager);
        table.register(
            EventType::Activate,
            Box::new(move |event| match event {
                WorkerEvent::Activate(activate) => m.handle_activate(activate),
                _ => Ok(()),
            }),
        );

        let m = Arc::clone(&manager);
        table.register(
            EventType::Fetch,
            Box::new(move |event| match event {
                WorkerEvent::Fetch(fetch) => m.handle_fetch(fetch),
                _ => Ok(()),
            }),
        );

        let m = Arc::clone(&manager);
        table.register(
            EventType::Sync,
            Box::new(move |event| {
                if let WorkerEvent::Sync(sync) = event {
                    m.handle_sync(sync);
                }
                Ok(())
            }),
        );

        let m = Arc::clone(&manager);
        table.register(
            EventType::Push,
            Box::new(move |event| match event {
                WorkerEvent::Push(push) => m.handle_push(push),
                _ => Ok(()),
            }),
        );

        table.register(
            EventType::NotificationClick,
            Box::new(move |event| match event {
                WorkerEvent::NotificationClick(click) => manager.handle_notification_click(click),
                _ => Ok(()),
            }),
        );

        table
    }
}
