/// Turns front-end events into log lines and desktop notifications.
///
/// The notifier owns the only piece of runtime state in the daemon: the
/// instant the current (or most recent) recording started. It is driven from
/// a single dispatch loop, so no synchronization is involved.
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use crate::clock::{format_duration, Clock, SystemClock, TimeFormat};
use crate::config::NotifierConfig;
use crate::event::FrontendEvent;
use crate::notification::{sink_for, Announcer, NotificationSink, SpeechAnnouncer};

pub struct EventNotifier {
    title: String,
    time_format: TimeFormat,
    sink: Box<dyn NotificationSink>,
    announcer: Option<Box<dyn Announcer>>,
    clock: Box<dyn Clock>,
    /// Set on every recording start and deliberately left in place on stop.
    session_start: Option<DateTime<FixedOffset>>,
}

impl EventNotifier {
    /// Builds a notifier on the system clock with the backends named in `config`.
    pub fn new(config: &NotifierConfig) -> Self {
        debug!(
            "Notifications titled {:?} via {:?}, times as {}",
            config.title, config.backend, config.time_format
        );
        Self::with_parts(
            config,
            sink_for(config.backend),
            announcer_for(config),
            Box::new(SystemClock),
        )
    }

    pub fn with_parts(
        config: &NotifierConfig,
        sink: Box<dyn NotificationSink>,
        announcer: Option<Box<dyn Announcer>>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            title: config.title.clone(),
            time_format: config.time_format.clone(),
            sink,
            announcer,
            clock,
            session_start: None,
        }
    }

    /// Applies a reloaded config. The recording start time survives.
    pub fn reconfigure(&mut self, config: &NotifierConfig) {
        self.title = config.title.clone();
        self.time_format = config.time_format.clone();
        self.sink = sink_for(config.backend);
        self.announcer = announcer_for(config);
    }

    #[cfg(test)]
    pub fn session_start(&self) -> Option<DateTime<FixedOffset>> {
        self.session_start
    }

    /// Reacts to `event`. Only recording start/stop and replay buffer
    /// save/stop produce a notification; everything else is ignored.
    pub fn handle(&mut self, event: &FrontendEvent) {
        match event {
            FrontendEvent::RecordingStarted => {
                let now = self.clock.now();
                self.session_start = Some(now);
                let message = format!("Recording started at {}", self.time_format.render(&now));
                self.dispatch(&message);
            }
            FrontendEvent::RecordingStopped => {
                let now = self.clock.now();
                let message = format!(
                    "Recording stopped at {}. Duration: {}",
                    self.time_format.render(&now),
                    self.elapsed_since_start(&now)
                );
                info!("{message}");
                if let Some(announcer) = &self.announcer {
                    if let Err(e) = announcer.announce(&message) {
                        warn!("Announcement failed: {e}");
                    }
                }
                self.notify(&message);
            }
            FrontendEvent::ReplayBufferSaved => {
                let now = self.clock.now();
                let message = format!("Replay buffer saved at {}", self.time_format.render(&now));
                self.dispatch(&message);
            }
            FrontendEvent::ReplayBufferStopped => self.dispatch("Replay buffer stopped"),
            _ => {}
        }
    }

    fn elapsed_since_start(&self, now: &DateTime<FixedOffset>) -> String {
        let Some(start) = self.session_start else {
            warn!("Recording stopped without a recorded start");
            return "unknown".to_string();
        };
        let elapsed = now.signed_duration_since(start);
        if elapsed < chrono::TimeDelta::zero() {
            warn!("Clock moved backwards during recording ({elapsed}); reporting zero duration");
        }
        format_duration(elapsed)
    }

    fn dispatch(&self, message: &str) {
        info!("{message}");
        self.notify(message);
    }

    fn notify(&self, message: &str) {
        if let Err(e) = self.sink.send(&self.title, message) {
            warn!("Notification failed: {e}");
        }
    }
}

fn announcer_for(config: &NotifierConfig) -> Option<Box<dyn Announcer>> {
    if config.announce_recording_stopped {
        let announcer = SpeechAnnouncer::new();
        debug!("Recording stops are read aloud with `{}`", announcer.program());
        Some(Box::new(announcer))
    } else {
        None
    }
}
