/// Line protocol spoken with the host-side shim.
///
/// Input, one message per line on stdin:
///   event <NAME>                    front-end event (e.g. `RECORDING_STARTED`)
///   replay_buffer active|inactive   live replay buffer state
///   load | unload                   script lifecycle
///   describe                        ask for the settings panel
///   quit                            shut down
///
/// Output on stdout: `replay_buffer start|stop` requests and the answers to
/// `describe`. Blank lines and lines starting with `#` are skipped.
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::event::{DaemonEvent, FrontendEvent, InvalidEventName};
use crate::replay::ReplayBufferControl;
use crate::script::{EventSource, Property, PropertyKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("unexpected argument {0:?}")]
    UnexpectedArgument(String),

    #[error(transparent)]
    Event(#[from] InvalidEventName),

    #[error("replay buffer state must be `active` or `inactive`, got {0:?}")]
    ReplayBufferState(String),
}

/// Parses one input line. `Ok(None)` means the line carries nothing.
pub fn parse_line(line: &str) -> Result<Option<DaemonEvent>, BridgeError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let argument = words.next();
    if let Some(extra) = words.next() {
        return Err(BridgeError::UnexpectedArgument(extra.to_string()));
    }

    let verb = command.to_ascii_lowercase();
    let event = match (verb.as_str(), argument) {
        ("event", Some(name)) => DaemonEvent::Frontend(name.parse()?),
        ("event", None) => return Err(BridgeError::MissingArgument("event")),
        ("replay_buffer", Some(state)) => match state.to_ascii_lowercase().as_str() {
            "active" => DaemonEvent::ReplayBufferState(true),
            "inactive" => DaemonEvent::ReplayBufferState(false),
            _ => return Err(BridgeError::ReplayBufferState(state.to_string())),
        },
        ("replay_buffer", None) => return Err(BridgeError::MissingArgument("replay_buffer")),
        (bare, Some(arg)) if matches!(bare, "load" | "unload" | "describe" | "quit") => {
            return Err(BridgeError::UnexpectedArgument(arg.to_string()))
        }
        ("load", None) => DaemonEvent::Load,
        ("unload", None) => DaemonEvent::Unload,
        ("describe", None) => DaemonEvent::Describe,
        ("quit", None) => DaemonEvent::Shutdown,
        _ => return Err(BridgeError::UnknownCommand(command.to_string())),
    };
    Ok(Some(event))
}

/// Reads protocol lines from `reader` and forwards them to the event loop.
/// Sends [`DaemonEvent::Shutdown`] once the input ends.
pub fn forward_lines<R: BufRead>(reader: R, tx: mpsc::Sender<DaemonEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read bridge input: {e}");
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(event)) => {
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring bridge input {line:?}: {e}"),
        }
    }
    debug!("Bridge input closed");
    let _ = tx.blocking_send(DaemonEvent::Shutdown);
}

/// Reads stdin on a dedicated OS thread. Stdin reads cannot be cancelled, so
/// the thread is left detached and simply dies with the process.
pub fn spawn_stdin_reader(tx: mpsc::Sender<DaemonEvent>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("bridge-stdin".into())
        .spawn(move || forward_lines(std::io::stdin().lock(), tx))
}

/// Front-end callbacks the script has registered. Events are only delivered
/// while a callback is registered.
#[derive(Debug, Default)]
pub struct Subscriptions {
    callbacks: BTreeSet<&'static str>,
}

impl Subscriptions {
    pub fn is_subscribed(&self, name: &str) -> bool {
        self.callbacks.contains(name)
    }
}

impl EventSource for Subscriptions {
    fn add_event_callback(&mut self, name: &'static str) {
        self.callbacks.insert(name);
    }

    fn remove_event_callback(&mut self, name: &'static str) {
        self.callbacks.remove(name);
    }
}

/// The daemon's view of the host's replay buffer, plus the outgoing half of
/// the protocol.
pub struct HostLink<W: Write> {
    out: W,
    replay_active: bool,
}

impl<W: Write> HostLink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            replay_active: false,
        }
    }

    pub fn set_replay_active(&mut self, active: bool) {
        self.replay_active = active;
    }

    /// Tracks replay buffer transitions announced through front-end events.
    pub fn observe(&mut self, event: &FrontendEvent) {
        match event {
            FrontendEvent::ReplayBufferStarting | FrontendEvent::ReplayBufferStarted => {
                self.replay_active = true
            }
            FrontendEvent::ReplayBufferStopped => self.replay_active = false,
            _ => {}
        }
    }

    /// Writes the script description and its settings panel.
    pub fn describe(&mut self, description: &str, properties: &[Property]) {
        self.send(&format!("description {description:?}"));
        for property in properties {
            let kind = match property.kind {
                PropertyKind::Bool => "bool",
            };
            self.send(&format!("property {kind} {} {:?}", property.key, property.label));
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn send(&mut self, line: &str) {
        let result = writeln!(self.out, "{line}").and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to write {line:?} to host: {e}");
        }
    }
}

impl<W: Write> ReplayBufferControl for HostLink<W> {
    fn is_active(&self) -> bool {
        self.replay_active
    }

    /// Requests a start and assumes it succeeds until the host reports otherwise.
    fn start(&mut self) {
        self.send("replay_buffer start");
        self.replay_active = true;
    }

    fn stop(&mut self) {
        self.send("replay_buffer stop");
        self.replay_active = false;
    }
}
