//! Offline Worker Runtime
//!
//! Implements the offline caching lifecycle of a web application worker:
//! precaching a fixed asset manifest at install time, evicting superseded
//! cache versions at activation, and serving intercepted resource requests
//! cache-first with network fallback. Optional background-sync delivery and
//! push-notification handling complete the worker surface.
//!
//! # Architecture
//!
//! - `config`: worker configuration (cache version tag, asset manifest, mode toggles)
//! - `cache`: cache store collaborator + in-memory implementation
//! - `fetch`: request/response model, network collaborator, fetch events
//! - `lifecycle`: worker state machine + install/activate events
//! - `events`: event kinds, lifetime extension, handler dispatch table
//! - `sync`: durable sync queue collaborator + delivery bookkeeping
//! - `notify`: notification platform collaborator + window clients
//! - `manager`: `CacheManager`, the one component wiring it all together
//!
//! The crate is `no_std` + `alloc`; the host platform supplies the
//! collaborators and drives the manager by dispatching events.

#![no_std]

extern crate alloc;

pub mod cache;
pub mod config;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod manager;
pub mod notify;
pub mod sync;

pub use cache::*;
pub use config::*;
pub use events::*;
pub use fetch::*;
pub use lifecycle::*;
pub use manager::*;
pub use notify::*;
pub use sync::*;

use alloc::string::String;

/// Worker error types.
#[derive(Debug, Clone)]
pub enum WorkerError {
    /// Install-time precaching failed; nothing was committed.
    InstallFailed(String),
    /// Stale-cache eviction failed during activation.
    ActivateFailed(String),
    /// State transition invalid.
    InvalidStateTransition,
    /// No handler registered for the event kind.
    NoHandler,
}
