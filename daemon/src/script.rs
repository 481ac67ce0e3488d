/// The script lifecycle the host drives: defaults, load, update, unload.
///
/// Each hook takes the host facilities it touches as trait objects so the
/// whole lifecycle can be exercised without a running host.
use tracing::info;

use crate::event::FrontendEvent;
use crate::notifier::EventNotifier;
use crate::replay::ReplayBufferControl;
use crate::settings::{SettingsStore, ENABLE_REPLAY_BUFFER};

/// Name under which the event callback is registered with the host.
pub const CALLBACK_NAME: &str = "recording-notifications";

pub const DESCRIPTION: &str = "Recording Notifications: sends a desktop notification when \
recording starts, when it stops (with the total recording duration), and when the replay \
buffer is saved or stopped. Can also start the replay buffer automatically when the host starts.";

/// Host-side registry of front-end event callbacks.
pub trait EventSource {
    fn add_event_callback(&mut self, name: &'static str);
    fn remove_event_callback(&mut self, name: &'static str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Bool,
}

/// One entry of the script's settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub kind: PropertyKind,
    pub key: &'static str,
    pub label: &'static str,
}

/// The settings panel: a single toggle bound to `enableRB`.
pub fn properties() -> Vec<Property> {
    vec![Property {
        kind: PropertyKind::Bool,
        key: ENABLE_REPLAY_BUFFER,
        label: "Start replay buffer automatically.",
    }]
}

pub struct Script {
    notifier: EventNotifier,
}

impl Script {
    pub fn new(notifier: EventNotifier) -> Self {
        Self { notifier }
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut EventNotifier {
        &mut self.notifier
    }

    /// Makes the replay buffer's current state the default for `enableRB`
    /// and returns it. A stored value still takes precedence when read.
    pub fn configure_defaults(
        &self,
        settings: &mut dyn SettingsStore,
        replay: &dyn ReplayBufferControl,
    ) -> bool {
        let active = replay.is_active();
        settings.set_default_bool(ENABLE_REPLAY_BUFFER, active);
        active
    }

    /// Subscribes to front-end events and, if enabled, starts the replay
    /// buffer without checking whether it already runs.
    pub fn load(
        &mut self,
        settings: &dyn SettingsStore,
        source: &mut dyn EventSource,
        replay: &mut dyn ReplayBufferControl,
    ) {
        info!("Configuring callback...");
        source.add_event_callback(CALLBACK_NAME);
        info!("Callback configured successfully");

        if settings.get_bool(ENABLE_REPLAY_BUFFER) {
            info!("Enabling replay buffer...");
            replay.start();
            info!("Replay buffer enabled");
        }
    }

    pub fn unload(&mut self, source: &mut dyn EventSource) {
        info!("Script unloading. Removing callbacks...");
        source.remove_event_callback(CALLBACK_NAME);
    }

    /// Brings the replay buffer in line with `enableRB`. Does nothing when
    /// the two already agree, so repeated calls are harmless.
    pub fn settings_changed(
        &mut self,
        settings: &dyn SettingsStore,
        replay: &mut dyn ReplayBufferControl,
    ) {
        let wanted = settings.get_bool(ENABLE_REPLAY_BUFFER);
        match (wanted, replay.is_active()) {
            (true, false) => {
                info!("Starting replay buffer...");
                replay.start();
                info!("Replay buffer started");
            }
            (false, true) => {
                info!("Stopping replay buffer...");
                replay.stop();
                info!("Replay buffer stopped");
            }
            _ => {}
        }
    }

    pub fn handle_event(&mut self, event: &FrontendEvent) {
        self.notifier.handle(event);
    }
}
