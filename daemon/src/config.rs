use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::clock::TimeFormat;
use crate::event::DaemonEvent;
use crate::notification::Backend;

pub const DEFAULT_TITLE: &str = "OBS";

/// Root configuration structure. Deserialized from `<app data dir>/config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Script settings, keyed the way the host stores them (e.g. `enableRB`).
    #[serde(default)]
    pub settings: BTreeMap<String, bool>,
}

/// How notifications look and where they go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifierConfig {
    /// Title shown above every notification.
    #[serde(default = "default_title")]
    pub title: String,
    /// strftime pattern for wall-clock times in messages.
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default)]
    pub backend: Backend,
    /// Also read the "recording stopped" message aloud, without waiting.
    #[serde(default)]
    pub announce_recording_stopped: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            time_format: TimeFormat::default(),
            backend: Backend::default(),
            announce_recording_stopped: false,
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
/// A file that fails to parse is reported and otherwise ignored.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create config file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            error!("Config path {} has no parent directory", path.display());
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        error!("Failed to watch config directory {}: {e}", watch_dir.display());
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Keeping previous config: {e:#}"),
            }
        }
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}
