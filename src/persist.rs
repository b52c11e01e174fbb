use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "globe_transfers";
const CONFIG_FILE: &str = "prefs.json";
const PREFS_VERSION: u32 = 1;

/// The one piece of state that survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
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

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThemePalette {
    pub water: &'static str,
    pub country: &'static str,
    pub border: &'static str,
    pub background: &'static str,
    pub atmosphere: &'static str,
}

pub fn palette(theme: Theme) -> ThemePalette {
    match theme {
        Theme::Light => ThemePalette {
            water: "#E6EEF2",
            country: "#D6D6D6",
            border: "#999999",
            background: "#FFFFFF",
            atmosphere: "#f8f9f9",
        },
        Theme::Dark => ThemePalette {
            water: "#262E36",
            country: "#21262C",
            border: "#AAAAAA",
            background: "#1A1A1A",
            atmosphere: "#2E3A45",
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PrefsFile {
    version: u32,
    theme: Theme,
}

pub fn load_theme() -> Theme {
    let Some(path) = prefs_path() else {
        return Theme::default();
    };
    let Ok(raw) = fs::read_to_string(&path) else {
        return Theme::default();
    };
    let Ok(prefs) = serde_json::from_str::<PrefsFile>(&raw) else {
        return Theme::default();
    };
    if prefs.version != PREFS_VERSION {
        return Theme::default();
    }
    prefs.theme
}

pub fn save_theme(theme: Theme) {
    let Some(path) = prefs_path() else {
        return;
    };
    let Some(dir) = path.parent() else {
        return;
    };
    let _ = fs::create_dir_all(dir);

    let prefs = PrefsFile {
        version: PREFS_VERSION,
        theme,
    };
    if let Ok(json) = serde_json::to_string(&prefs) {
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, &path);
        }
    }
}

fn prefs_path() -> Option<PathBuf> {
    // Prefer XDG config.
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CONFIG_DIR).join(CONFIG_FILE));
        }
    }
    // Fallback to ~/.config on linux-like systems.
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILE),
    )
}
