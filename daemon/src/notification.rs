/// Desktop notification backends and the spoken announcement side channel.
///
/// Every backend shells out to a platform tool. Notifications block until the
/// tool exits; announcements are spawned and left to finish on their own.
/// Child stdout is always discarded because the daemon's stdout carries the
/// bridge protocol.
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Status {
        program: &'static str,
        status: ExitStatus,
    },
}

/// Shows a titled desktop notification.
pub trait NotificationSink {
    fn send(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Fire-and-forget channel for a message that should not block the caller.
pub trait Announcer {
    fn announce(&self, message: &str) -> Result<(), NotifyError>;
}

/// Which external tool displays notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// macOS Notification Center via `osascript -e 'display notification ...'`.
    Osascript,
    /// freedesktop notifications via `notify-send`.
    NotifySend,
    /// Log only.
    None,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Backend::Osascript
        } else {
            Backend::NotifySend
        }
    }
}

/// Builds the sink for `backend`.
pub fn sink_for(backend: Backend) -> Box<dyn NotificationSink> {
    match backend {
        Backend::Osascript => Box::new(Osascript),
        Backend::NotifySend => Box::new(NotifySend),
        Backend::None => Box::new(Disabled),
    }
}

// ── Notification sinks ────────────────────────────────────────────────────────

pub struct Osascript;

impl NotificationSink for Osascript {
    fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        run_to_completion("osascript", &["-e", &display_script(title, message)])
    }
}

pub struct NotifySend;

impl NotificationSink for NotifySend {
    fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        run_to_completion("notify-send", &notify_send_args(title, message))
    }
}

pub struct Disabled;

impl NotificationSink for Disabled {
    fn send(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// AppleScript source that posts `message` under `title`.
pub fn display_script(title: &str, message: &str) -> String {
    format!(
        r#"display notification "{}" with title "{}""#,
        escape_applescript(message),
        escape_applescript(title)
    )
}

/// `notify-send` arguments; `--` keeps a title starting with `-` from being
/// read as an option.
pub fn notify_send_args<'a>(title: &'a str, message: &'a str) -> [&'a str; 3] {
    ["--", title, message]
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ── Announcer ─────────────────────────────────────────────────────────────────

/// Reads messages aloud with the platform's speech tool.
pub struct SpeechAnnouncer {
    program: &'static str,
}

impl SpeechAnnouncer {
    pub fn new() -> Self {
        let program = if cfg!(target_os = "macos") { "say" } else { "spd-say" };
        Self { program }
    }

    pub fn program(&self) -> &'static str {
        self.program
    }
}

impl Default for SpeechAnnouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Announcer for SpeechAnnouncer {
    fn announce(&self, message: &str) -> Result<(), NotifyError> {
        let child = spawn(self.program, &[message])?;
        reap_in_background(child);
        Ok(())
    }
}

// ── Process helpers ───────────────────────────────────────────────────────────

fn spawn(program: &'static str, args: &[&str]) -> Result<Child, NotifyError> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|source| NotifyError::Spawn { program, source })
}

fn run_to_completion(program: &'static str, args: &[&str]) -> Result<(), NotifyError> {
    let status = spawn(program, args)?
        .wait()
        .map_err(|source| NotifyError::Spawn { program, source })?;
    if status.success() {
        Ok(())
    } else {
        Err(NotifyError::Status { program, status })
    }
}

/// Waits for `child` on a detached thread so it does not linger as a zombie.
fn reap_in_background(mut child: Child) {
    std::thread::spawn(move || {
        let _ = child.wait();
    });
}
