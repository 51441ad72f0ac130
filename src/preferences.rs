//! User preferences
//!
//! A small key/value document holding the theme and the lock switches.

use crate::storage::{JsonDocument, PersistenceError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Color theme of the application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Follow the operating system
    #[default]
    System,
    Dark,
    Light,
}

impl Theme {
    /// All themes in display order
    pub const ALL: [Theme; 3] = [Theme::System, Theme::Dark, Theme::Light];

    /// Human readable title
    pub fn title(self) -> &'static str {
        match self {
            Theme::System => "System default",
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown theme '{s}', expected system, dark or light"))
    }
}

/// Anything but a known theme name falls back to the default instead of
/// failing the whole document.
fn theme_or_default<'de, D>(deserializer: D) -> Result<Theme, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|name| name.parse().ok())
        .unwrap_or_default())
}

/// Persisted user preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(deserialize_with = "theme_or_default")]
    pub theme: Theme,
    pub pin_enabled: bool,
    pub biometric_enabled: bool,
}

/// Preferences stored as `preferences.json` in the data directory
#[derive(Clone)]
pub struct PreferencesStore {
    document: JsonDocument<Preferences>,
    // Shared by clones; serializes read-modify-write cycles
    write_lock: Arc<Mutex<()>>,
}

impl PreferencesStore {
    /// Opens the preferences inside the given data directory
    pub fn open(data_dir: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            document: JsonDocument::open(data_dir, "preferences")?,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Current preferences, or an error if the document cannot be read
    ///
    /// A missing document yields the defaults.
    pub fn try_load(&self) -> Result<Preferences, PersistenceError> {
        Ok(self.document.load()?.unwrap_or_default())
    }

    /// Current preferences
    ///
    /// A missing or unreadable document yields the defaults; read errors
    /// are logged.
    pub fn load(&self) -> Preferences {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read preferences, using defaults");
            Preferences::default()
        })
    }

    /// Applies `change` to the current preferences and stores the result
    ///
    /// An unreadable document is left untouched and its error returned.
    pub fn update<F>(&self, change: F) -> Result<Preferences, PersistenceError>
    where
        F: FnOnce(&mut Preferences),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut preferences = self.try_load()?;
        change(&mut preferences);
        self.document.store(&preferences)?;
        Ok(preferences)
    }

    /// Current theme
    pub fn theme(&self) -> Theme {
        self.load().theme
    }

    /// Sets the theme
    pub fn set_theme(&self, theme: Theme) -> Result<(), PersistenceError> {
        self.update(|p| p.theme = theme).map(|_| ())
    }
}
