/// Canonical file paths for the daemon's data files.
///
/// Everything lives under `obs-notify/` in the platform config directory
/// (`%APPDATA%` on Windows, `~/Library/Application Support` on macOS,
/// `$XDG_CONFIG_HOME` or `~/.config` elsewhere). `OBS_NOTIFY_DIR` replaces the
/// whole directory.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

const APP_DIR_NAME: &str = "obs-notify";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DIR_OVERRIDE_VAR: &str = "OBS_NOTIFY_DIR";

/// Returns the application data directory for this machine.
pub fn app_data_dir() -> Result<PathBuf> {
    let dir_override = std::env::var(DIR_OVERRIDE_VAR).ok();
    resolve_app_data_dir(dir_override, dirs::config_dir()).ok_or_else(|| {
        anyhow!("Cannot determine an application data directory; set {DIR_OVERRIDE_VAR}")
    })
}

/// Returns the full path to the config file inside `app_dir`.
pub fn config_file_path(app_dir: &Path) -> PathBuf {
    app_dir.join(CONFIG_FILE_NAME)
}

fn resolve_app_data_dir(
    dir_override: Option<String>,
    config_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    match dir_override.filter(|dir| !dir.is_empty()) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => config_dir.map(|dir| dir.join(APP_DIR_NAME)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_config_dir() {
        let dir = resolve_app_data_dir(
            Some("/tmp/custom".to_string()),
            Some(PathBuf::from("/home/me/.config")),
        );
        assert_eq!(dir, Some(PathBuf::from("/tmp/custom")));
    }

    #[test]
    fn empty_override_is_ignored() {
        let dir = resolve_app_data_dir(Some(String::new()), Some(PathBuf::from("/cfg")));
        assert_eq!(dir, Some(PathBuf::from("/cfg/obs-notify")));
    }

    #[test]
    fn nothing_available_resolves_to_none() {
        assert_eq!(resolve_app_data_dir(None, None), None);
    }

    #[test]
    fn app_dir_sits_under_config_dir() {
        let dir = resolve_app_data_dir(None, Some(PathBuf::from("/cfg"))).unwrap();
        assert_eq!(dir.file_name().unwrap(), APP_DIR_NAME);
        assert_eq!(dir.parent(), Some(Path::new("/cfg")));
    }

    #[test]
    fn config_file_lives_in_app_dir() {
        let path = config_file_path(Path::new("/data/obs-notify"));
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE_NAME);
        assert_eq!(path.parent(), Some(Path::new("/data/obs-notify")));
    }
}
