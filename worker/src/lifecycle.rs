//! Worker Lifecycle
//!
//! The worker state machine and its install/activate events. Transitions
//! are driven by the host platform; the manager only validates them and
//! supplies the handlers for each transition's side effects.

use crate::events::{EventType, ExtendableEvent};

/// Worker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Initial state, being parsed.
    Parsed,
    /// Installing (install event fired).
    Installing,
    /// Installed, waiting to activate.
    Installed,
    /// Activating (activate event fired).
    Activating,
    /// Active and serving fetches.
    Activated,
    /// Superseded by a newer version.
    Redundant,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::Parsed
    }
}

/// Check if a state transition is valid.
pub fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)
            | (Installed, Activating)
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant)
    )
}

/// Install event data.
#[derive(Debug, Clone)]
pub struct InstallEvent {
    wait_until: bool,
}

impl InstallEvent {
    /// Create a new install event.
    pub fn new() -> Self {
        Self { wait_until: false }
    }
}

impl Default for InstallEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtendableEvent for InstallEvent {
    fn event_type(&self) -> EventType {
        EventType::Install
    }

    fn wait_until(&mut self) {
        self.wait_until = true;
    }

    fn has_wait_until(&self) -> bool {
        self.wait_until
    }
}

/// Activate event data.
#[derive(Debug, Clone)]
pub struct ActivateEvent {
    wait_until: bool,
}

impl ActivateEvent {
    /// Create a new activate event.
    pub fn new() -> Self {
        Self { wait_until: false }
    }
}

impl Default for ActivateEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtendableEvent for ActivateEvent {
    fn event_type(&self) -> EventType {
        EventType::Activate
    }

    fn wait_until(&mut self) {
        self.wait_until = true;
    }

    fn has_wait_until(&self) -> bool {
        self.wait_until
    }
}
