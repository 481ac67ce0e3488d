use std::collections::BTreeMap;

/// Key of the "start replay buffer automatically" toggle.
pub const ENABLE_REPLAY_BUFFER: &str = "enableRB";

/// Boolean key/value store with host-style default semantics: a stored value
/// wins over a default, and an unknown key reads as `false`.
pub trait SettingsStore {
    fn get_bool(&self, key: &str) -> bool;
    fn set_default_bool(&mut self, key: &str, value: bool);
}

/// In-memory settings backed by the `[settings]` table of the config file.
///
/// Defaults are never persisted; they are recomputed each time the script is
/// loaded.
#[derive(Debug, Default, Clone)]
pub struct Settings {
    values: BTreeMap<String, bool>,
    defaults: BTreeMap<String, bool>,
}

impl Settings {
    pub fn from_values(values: BTreeMap<String, bool>) -> Self {
        Self {
            values,
            defaults: BTreeMap::new(),
        }
    }

    /// Replaces the stored values (e.g. after the config file was edited)
    /// while keeping any registered defaults.
    pub fn replace_values(&mut self, values: BTreeMap<String, bool>) {
        self.values = values;
    }

    /// The explicitly stored value, ignoring defaults.
    pub fn user_value(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }
}

impl SettingsStore for Settings {
    fn get_bool(&self, key: &str) -> bool {
        self.values
            .get(key)
            .or_else(|| self.defaults.get(key))
            .copied()
            .unwrap_or(false)
    }

    fn set_default_bool(&mut self, key: &str, value: bool) {
        self.defaults.insert(key.to_string(), value);
    }
}
