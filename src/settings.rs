use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Error};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::persist::Persisted;

pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "spanish" | "es" => Ok(Language::Spanish),
            "french" | "fr" => Ok(Language::French),
            "german" | "de" => Ok(Language::German),
            other => bail!("unsupported language {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default = "default_true")]
    pub push_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: Language::default(),
            email_notifications: default_true(),
            push_notifications: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

pub struct SettingsStore {
    persisted: Arc<Persisted>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    pub fn load(persisted: Arc<Persisted>) -> Self {
        let current = persisted.load(SETTINGS_KEY);
        Self {
            persisted,
            current: RwLock::new(current),
        }
    }

    pub fn get(&self) -> Settings {
        self.current.read().clone()
    }

    pub fn toggle_theme(&self) -> Theme {
        self.update(|settings| {
            settings.theme = settings.theme.toggled();
            settings.theme
        })
    }

    pub fn set_language(&self, language: Language) {
        self.update(|settings| settings.language = language);
    }

    pub fn set_email_notifications(&self, enabled: bool) {
        self.update(|settings| settings.email_notifications = enabled);
    }

    pub fn set_push_notifications(&self, enabled: bool) {
        self.update(|settings| settings.push_notifications = enabled);
    }

    fn update<T>(&self, f: impl FnOnce(&mut Settings) -> T) -> T {
        let mut settings = self.current.write();
        let out = f(&mut settings);
        self.persisted.save(SETTINGS_KEY, &*settings);
        out
    }
}
