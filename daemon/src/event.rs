use std::fmt;
use std::str::FromStr;

use crate::config::Config;

/// Messages consumed by the daemon's event loop.
#[derive(Debug, PartialEq)]
pub enum DaemonEvent {
    /// A front-end event relayed by the host shim.
    Frontend(FrontendEvent),
    /// The host reported whether its replay buffer is currently running.
    ReplayBufferState(bool),
    /// The host loaded the script.
    Load,
    /// The host unloaded the script.
    Unload,
    /// The host asked for the properties surface.
    Describe,
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C, `quit`, or end of input; the daemon should unload and exit.
    Shutdown,
}

const HOST_PREFIX: &str = "OBS_FRONTEND_EVENT_";

/// Lifecycle notifications emitted by the host's front-end.
///
/// Only a handful are acted upon; the rest are parsed so they can be ignored
/// explicitly. Names the daemon does not know at all end up in [`Other`].
///
/// [`Other`]: FrontendEvent::Other
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendEvent {
    StreamingStarting,
    StreamingStarted,
    StreamingStopping,
    StreamingStopped,
    RecordingStarting,
    RecordingStarted,
    RecordingStopping,
    RecordingStopped,
    RecordingPaused,
    RecordingUnpaused,
    ReplayBufferStarting,
    ReplayBufferStarted,
    ReplayBufferStopping,
    ReplayBufferStopped,
    ReplayBufferSaved,
    VirtualcamStarted,
    VirtualcamStopped,
    SceneChanged,
    FinishedLoading,
    Exit,
    Other(String),
}

const NAMED: &[(&str, FrontendEvent)] = &[
    ("STREAMING_STARTING", FrontendEvent::StreamingStarting),
    ("STREAMING_STARTED", FrontendEvent::StreamingStarted),
    ("STREAMING_STOPPING", FrontendEvent::StreamingStopping),
    ("STREAMING_STOPPED", FrontendEvent::StreamingStopped),
    ("RECORDING_STARTING", FrontendEvent::RecordingStarting),
    ("RECORDING_STARTED", FrontendEvent::RecordingStarted),
    ("RECORDING_STOPPING", FrontendEvent::RecordingStopping),
    ("RECORDING_STOPPED", FrontendEvent::RecordingStopped),
    ("RECORDING_PAUSED", FrontendEvent::RecordingPaused),
    ("RECORDING_UNPAUSED", FrontendEvent::RecordingUnpaused),
    ("REPLAY_BUFFER_STARTING", FrontendEvent::ReplayBufferStarting),
    ("REPLAY_BUFFER_STARTED", FrontendEvent::ReplayBufferStarted),
    ("REPLAY_BUFFER_STOPPING", FrontendEvent::ReplayBufferStopping),
    ("REPLAY_BUFFER_STOPPED", FrontendEvent::ReplayBufferStopped),
    ("REPLAY_BUFFER_SAVED", FrontendEvent::ReplayBufferSaved),
    ("VIRTUALCAM_STARTED", FrontendEvent::VirtualcamStarted),
    ("VIRTUALCAM_STOPPED", FrontendEvent::VirtualcamStopped),
    ("SCENE_CHANGED", FrontendEvent::SceneChanged),
    ("FINISHED_LOADING", FrontendEvent::FinishedLoading),
    ("EXIT", FrontendEvent::Exit),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid event name {0:?}")]
pub struct InvalidEventName(pub String);

impl FromStr for FrontendEvent {
    type Err = InvalidEventName;

    /// Accepts the host's constant name with or without the
    /// `OBS_FRONTEND_EVENT_` prefix, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix(HOST_PREFIX).unwrap_or(&upper);
        let well_formed = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !well_formed {
            return Err(InvalidEventName(s.to_string()));
        }
        Ok(NAMED
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, event)| event.clone())
            .unwrap_or_else(|| FrontendEvent::Other(name.to_string())))
    }
}

impl fmt::Display for FrontendEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let FrontendEvent::Other(name) = self {
            return f.write_str(name);
        }
        let name = NAMED
            .iter()
            .find(|(_, event)| event == self)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN");
        f.write_str(name)
    }
}
