//! Handler configuration, loaded from an optional JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use mcm_input::RepeatTiming;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config json {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which input source drives the menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    #[default]
    EngineEvents,
    HardwarePoll,
}

/// What thumbstick directions do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickNavigation {
    /// Manipulate the active list directly. The left stick only adjusts
    /// values; its vertical axis is ignored.
    #[default]
    List,
    /// Forward directions as key and user events on both sticks.
    SyntheticKeys,
}

/// LEFT while the help list is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpListLeft {
    #[default]
    GoBack,
    Ignore,
}

/// Paths and names inside the menu movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPaths {
    pub menu: String,
    /// Every other path except the key event fallbacks hangs off this node.
    pub content_root: String,
    /// Invoked on `content_root`, ahead of the fallbacks.
    pub key_event_method: String,
    /// Absolute paths, invoked after the content entry point.
    pub key_event_fallbacks: Vec<String>,
    pub user_event_method: String,
    pub refresh_method: String,
    pub mcm_menu: String,
    pub config_panel: String,
    pub config_list: String,
    pub help_panel: String,
    pub help_list: String,
    pub selected_index: String,
    pub selected_entry: String,
    pub clip_index: String,
    pub num_children: String,
    pub index_field: String,
    pub stage: String,
    pub focus: String,
    pub mode_field: String,
    pub move_up: String,
    pub move_down: String,
    pub enter_submenu: String,
    pub leave_submenu: String,
    pub invalidate: String,
    pub clip_by_index: String,
    pub child_at: String,
    pub increment: String,
    pub decrement: String,
}

impl Default for UiPaths {
    fn default() -> Self {
        Self {
            menu: "PauseMenu".to_string(),
            content_root: "root.mcm_loader.content".to_string(),
            key_event_method: "ProcessKeyEvent".to_string(),
            key_event_fallbacks: vec![
                "root.Menu_mc.ProcessKeyEvent".to_string(),
                "root.ProcessKeyEvent".to_string(),
            ],
            user_event_method: "ProcessUserEvent".to_string(),
            refresh_method: "RefreshMCM".to_string(),
            mcm_menu: "mcmMenu".to_string(),
            config_panel: "configPanel_mc".to_string(),
            config_list: "configList_mc".to_string(),
            help_panel: "HelpPanel_mc".to_string(),
            help_list: "HelpList_mc".to_string(),
            selected_index: "selectedIndex".to_string(),
            selected_entry: "selectedEntry".to_string(),
            clip_index: "clipIndex".to_string(),
            num_children: "numChildren".to_string(),
            index_field: "index".to_string(),
            stage: "stage".to_string(),
            focus: "focus".to_string(),
            mode_field: "iMode".to_string(),
            move_up: "moveSelectionUp".to_string(),
            move_down: "moveSelectionDown".to_string(),
            enter_submenu: "RShoulderPressed".to_string(),
            leave_submenu: "LShoulderPressed".to_string(),
            invalidate: "InvalidateData".to_string(),
            clip_by_index: "GetClipByIndex".to_string(),
            child_at: "getChildAt".to_string(),
            increment: "Increment".to_string(),
            decrement: "Decrement".to_string(),
        }
    }
}

impl UiPaths {
    /// Content entry point first, then the fallbacks.
    pub fn key_event_entry_points(&self) -> Vec<String> {
        std::iter::once(format!("{}.{}", self.content_root, self.key_event_method))
            .chain(self.key_event_fallbacks.iter().cloned())
            .collect()
    }

    pub fn user_event_path(&self) -> String {
        format!("{}.{}", self.content_root, self.user_event_method)
    }

    pub fn refresh_path(&self) -> String {
        format!("{}.{}", self.content_root, self.refresh_method)
    }

    /// `root.mcm_loader.content.mcmMenu`.
    pub fn mcm_menu_path(&self) -> String {
        format!("{}.{}", self.content_root, self.mcm_menu)
    }

    pub fn config_list_path(&self) -> String {
        format!(
            "{}.{}.{}",
            self.mcm_menu_path(),
            self.config_panel,
            self.config_list
        )
    }

    pub fn help_list_path(&self) -> String {
        format!(
            "{}.{}.{}",
            self.mcm_menu_path(),
            self.help_panel,
            self.help_list
        )
    }

    pub fn mode_path(&self) -> String {
        format!("{}.{}", self.mcm_menu_path(), self.mode_field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub source: InputSource,
    pub stick_navigation: StickNavigation,
    pub help_list_left: HelpListLeft,
    pub stick_threshold: f32,
    pub repeat_delay_ms: u64,
    pub repeat_rate_ms: u64,
    pub go_back_debounce_ms: u64,
    pub ui: UiPaths,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: InputSource::default(),
            stick_navigation: StickNavigation::default(),
            help_list_left: HelpListLeft::default(),
            stick_threshold: mcm_input::STICK_THRESHOLD,
            repeat_delay_ms: 400,
            repeat_rate_ms: 80,
            go_back_debounce_ms: 200,
            ui: UiPaths::default(),
        }
    }
}

impl InputConfig {
    /// Reads the config at `path`. No path, or a path that does not exist,
    /// yields the defaults.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            warn!("config {} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: InputConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.stick_threshold > 0.0 && self.stick_threshold < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "stick_threshold must be inside (0, 1), got {}",
                self.stick_threshold
            )));
        }
        if self.repeat_rate_ms == 0 {
            return Err(ConfigError::Invalid(
                "repeat_rate_ms must be positive".to_string(),
            ));
        }
        for (field, value) in [
            ("content_root", &self.ui.content_root),
            ("key_event_method", &self.ui.key_event_method),
            ("user_event_method", &self.ui.user_event_method),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("ui.{field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn repeat_timing(&self) -> RepeatTiming {
        RepeatTiming {
            initial_delay: Duration::from_millis(self.repeat_delay_ms),
            repeat_rate: Duration::from_millis(self.repeat_rate_ms),
        }
    }

    pub fn go_back_interval(&self) -> Duration {
        Duration::from_millis(self.go_back_debounce_ms)
    }
}
