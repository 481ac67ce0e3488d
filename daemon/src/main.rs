mod bridge;
mod clock;
mod config;
mod event;
mod notification;
mod notifier;
mod paths;
mod replay;
mod script;
mod settings;

use std::io::Write;
use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bridge::{HostLink, Subscriptions};
use crate::event::DaemonEvent;
use crate::notifier::EventNotifier;
use crate::script::{Script, CALLBACK_NAME, DESCRIPTION};
use crate::settings::{Settings, ENABLE_REPLAY_BUFFER};

/// Everything the event loop mutates, kept off the async side so each message
/// is handled start to finish on one thread.
struct Daemon<W: Write> {
    script: Script,
    host: HostLink<W>,
    subscriptions: Subscriptions,
    settings: Settings,
    loaded: bool,
}

impl<W: Write> Daemon<W> {
    fn new(script: Script, host: HostLink<W>, settings: Settings) -> Self {
        Self {
            script,
            host,
            subscriptions: Subscriptions::default(),
            settings,
            loaded: false,
        }
    }

    fn apply(&mut self, event: DaemonEvent) -> ControlFlow<()> {
        match event {
            DaemonEvent::Frontend(frontend) => {
                self.host.observe(&frontend);
                if self.subscriptions.is_subscribed(CALLBACK_NAME) {
                    self.script.handle_event(&frontend);
                } else {
                    debug!("Dropping {frontend}: script not loaded");
                }
            }

            DaemonEvent::ReplayBufferState(active) => self.host.set_replay_active(active),

            DaemonEvent::Load => {
                if self.loaded {
                    warn!("Load requested while already loaded");
                    return ControlFlow::Continue(());
                }
                let live = self.script.configure_defaults(&mut self.settings, &self.host);
                debug!(
                    "{ENABLE_REPLAY_BUFFER}: stored {:?}, default {live}",
                    self.settings.user_value(ENABLE_REPLAY_BUFFER)
                );
                self.script.load(&self.settings, &mut self.subscriptions, &mut self.host);
                // The host follows every load with an update.
                self.script.settings_changed(&self.settings, &mut self.host);
                self.loaded = true;
            }

            DaemonEvent::Unload => self.unload(),

            DaemonEvent::Describe => self.host.describe(DESCRIPTION, &script::properties()),

            DaemonEvent::ConfigReloaded(config) => {
                info!("Config reloaded");
                self.settings.replace_values(config.settings);
                self.script.notifier_mut().reconfigure(&config.notifier);
                if self.loaded {
                    self.script.settings_changed(&self.settings, &mut self.host);
                }
            }

            DaemonEvent::Shutdown => {
                self.unload();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn unload(&mut self) {
        if self.loaded {
            self.script.unload(&mut self.subscriptions);
            self.loaded = false;
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the bridge protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = match paths::app_data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        error!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path(&app_dir);
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        warn!("Using default config: {e:#}");
        config::Config::default()
    });

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path.clone(), event_tx.clone()));

    if let Err(e) = bridge::spawn_stdin_reader(event_tx.clone()) {
        error!("Failed to start bridge reader: {e}");
        std::process::exit(1);
    }

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    info!(
        "obs-notify-daemon v{} started (config: {})",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut daemon = Daemon::new(
        Script::new(EventNotifier::new(&initial_config.notifier)),
        HostLink::new(std::io::stdout()),
        Settings::from_values(initial_config.settings),
    );

    while let Some(event) = event_rx.recv().await {
        // Notifications wait on an external process.
        let flow = tokio::task::block_in_place(|| daemon.apply(event));
        if flow.is_break() {
            break;
        }
    }

    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, NotifierConfig};
    use crate::event::FrontendEvent;
    use crate::notifier::tests::{notifier, ManualClock, RecordingSink};
    use std::collections::BTreeMap;

    fn daemon(enable_rb: Option<bool>) -> (Daemon<Vec<u8>>, RecordingSink, ManualClock) {
        let clock = ManualClock::at(10, 0, 0);
        let sink = RecordingSink::default();
        let values = enable_rb
            .map(|v| BTreeMap::from([(ENABLE_REPLAY_BUFFER.to_string(), v)]))
            .unwrap_or_default();
        let d = Daemon::new(
            Script::new(notifier(&clock, &sink)),
            HostLink::new(Vec::new()),
            Settings::from_values(values),
        );
        (d, sink, clock)
    }

    fn sent_lines(d: Daemon<Vec<u8>>) -> Vec<String> {
        String::from_utf8(d.host.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn frontend(event: FrontendEvent) -> DaemonEvent {
        DaemonEvent::Frontend(event)
    }

    #[test]
    fn events_before_load_are_dropped() {
        let (mut d, sink, _) = daemon(None);

        assert!(d.apply(frontend(FrontendEvent::RecordingStarted)).is_continue());

        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn load_with_flag_requests_a_single_start() {
        let (mut d, _, _) = daemon(Some(true));

        let _ = d.apply(DaemonEvent::ReplayBufferState(false));
        let _ = d.apply(DaemonEvent::Load);

        assert_eq!(sent_lines(d), vec!["replay_buffer start"]);
    }

    #[test]
    fn load_defaults_flag_to_live_state() {
        // Nothing stored: the running buffer becomes the default, so load
        // restarts it unconditionally and the follow-up update is a no-op.
        let (mut d, _, _) = daemon(None);

        let _ = d.apply(DaemonEvent::ReplayBufferState(true));
        let _ = d.apply(DaemonEvent::Load);

        assert_eq!(sent_lines(d), vec!["replay_buffer start"]);
    }

    #[test]
    fn second_load_is_ignored() {
        let (mut d, _, _) = daemon(Some(true));

        let _ = d.apply(DaemonEvent::Load);
        let _ = d.apply(DaemonEvent::ReplayBufferState(false));
        let _ = d.apply(DaemonEvent::Load);

        assert_eq!(sent_lines(d), vec!["replay_buffer start"]);
    }

    #[test]
    fn loaded_daemon_notifies_recording_session() {
        let (mut d, sink, clock) = daemon(Some(false));

        let _ = d.apply(DaemonEvent::Load);
        let _ = d.apply(frontend(FrontendEvent::RecordingStarted));
        clock.set(10, 0, 5);
        let _ = d.apply(frontend(FrontendEvent::RecordingStopped));

        let messages: Vec<String> = sink.sent.borrow().iter().map(|(_, m)| m.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "Recording started at 10:00:00 AM",
                "Recording stopped at 10:00:05 AM. Duration: 0:00:05",
            ]
        );
    }

    #[test]
    fn unload_stops_event_delivery() {
        let (mut d, sink, _) = daemon(None);

        let _ = d.apply(DaemonEvent::Load);
        let _ = d.apply(DaemonEvent::Unload);
        let _ = d.apply(frontend(FrontendEvent::ReplayBufferSaved));

        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn replay_buffer_events_update_tracked_state_even_when_unloaded() {
        let (mut d, _, _) = daemon(None);

        let _ = d.apply(frontend(FrontendEvent::ReplayBufferStarted));

        assert!(crate::replay::ReplayBufferControl::is_active(&d.host));
    }

    #[test]
    fn config_reload_reconciles_replay_buffer_once() {
        let (mut d, _, _) = daemon(Some(false));
        let _ = d.apply(DaemonEvent::ReplayBufferState(true));
        let _ = d.apply(DaemonEvent::Load);

        let reload = || {
            DaemonEvent::ConfigReloaded(Config {
                notifier: NotifierConfig::default(),
                settings: BTreeMap::from([(ENABLE_REPLAY_BUFFER.to_string(), true)]),
            })
        };
        let _ = d.apply(reload());
        let _ = d.apply(reload());

        // Load stopped the running buffer (flag false), the first reload
        // started it again, the second found nothing to do.
        assert_eq!(sent_lines(d), vec!["replay_buffer stop", "replay_buffer start"]);
    }

    #[test]
    fn config_reload_before_load_only_updates_settings() {
        let (mut d, _, _) = daemon(None);

        let _ = d.apply(DaemonEvent::ConfigReloaded(Config {
            notifier: NotifierConfig::default(),
            settings: BTreeMap::from([(ENABLE_REPLAY_BUFFER.to_string(), true)]),
        }));

        assert!(crate::settings::SettingsStore::get_bool(&d.settings, ENABLE_REPLAY_BUFFER));
        assert!(sent_lines(d).is_empty());
    }

    #[test]
    fn describe_writes_properties() {
        let (mut d, _, _) = daemon(None);

        let _ = d.apply(DaemonEvent::Describe);

        let lines = sent_lines(d);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("description "));
        assert_eq!(
            lines[1],
            "property bool enableRB \"Start replay buffer automatically.\""
        );
    }

    #[test]
    fn shutdown_breaks_the_loop_and_unloads() {
        let (mut d, _, _) = daemon(None);

        let _ = d.apply(DaemonEvent::Load);
        assert!(d.apply(DaemonEvent::Shutdown).is_break());
        assert!(!d.loaded);
        assert!(!d.subscriptions.is_subscribed(CALLBACK_NAME));
    }
}
