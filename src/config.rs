use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::input::{DEFAULT_SEQUENTIAL_KEYS, DirectionalKeySet, KeyPools};
use crate::renderer::DEFAULT_TILE_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub key_bindings: KeyBindings,
    pub input_cooldown_ms: u64,
    pub frame_interval_ms: u64,
    pub default_tile_size: u32,
    pub key_pools: KeyPoolBindings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub toggle_controls: String,
    pub toggle_variables: String,
    pub quit: String,
    pub fullscreen: String,
}

/// Key pools as binding strings. Both lists are stacks: the last entry is
/// handed out first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPoolBindings {
    pub directional: Vec<DirectionalBindings>,
    pub sequential: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionalBindings {
    pub up: String,
    pub left: String,
    pub down: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("'{binding}' is not a key")]
    InvalidKey { binding: String },
    #[error("pool key '{binding}' is already bound to {purpose}")]
    ReservedKey {
        binding: String,
        purpose: &'static str,
    },
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            key_bindings: KeyBindings::default(),
            input_cooldown_ms: 50,
            frame_interval_ms: 33,
            default_tile_size: DEFAULT_TILE_SIZE,
            key_pools: KeyPoolBindings::default(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            toggle_controls: "p".into(),
            toggle_variables: "i".into(),
            quit: "Esc".into(),
            fullscreen: "F11".into(),
        }
    }
}

impl Default for KeyPoolBindings {
    fn default() -> Self {
        let directional = |up: &str, left: &str, down: &str, right: &str| DirectionalBindings {
            up: up.into(),
            left: left.into(),
            down: down.into(),
            right: right.into(),
        };
        KeyPoolBindings {
            directional: vec![
                directional("Up", "Left", "Down", "Right"),
                directional("w", "a", "s", "d"),
            ],
            sequential: DEFAULT_SEQUENTIAL_KEYS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ViewerConfig {
    /// Read the user's config file; defaults when it is missing or invalid.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid_viewer_config");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("ascii-gridworld");
        path.push("viewer.json");
        path
    }

    pub fn input_cooldown(&self) -> Duration {
        Duration::from_millis(self.input_cooldown_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Parse the configured key pools. Pool keys may not shadow the viewer's
    /// own bindings.
    pub fn key_pools(&self) -> Result<KeyPools, ConfigError> {
        let bindings = &self.key_bindings;
        let mut reserved: Vec<(KeyCode, &'static str)> = Vec::new();
        for (binding, purpose) in [
            (&bindings.toggle_controls, "the controls overlay"),
            (&bindings.toggle_variables, "the variables overlay"),
            (&bindings.quit, "quit"),
            (&bindings.fullscreen, "fullscreen"),
        ] {
            reserved.push((parse_binding(binding)?, purpose));
        }

        let check = |binding: &str| -> Result<KeyCode, ConfigError> {
            let key = parse_binding(binding)?;
            if let Some(&(_, purpose)) = reserved.iter().find(|(k, _)| *k == key) {
                return Err(ConfigError::ReservedKey {
                    binding: binding.to_string(),
                    purpose,
                });
            }
            Ok(key)
        };

        let mut directional = Vec::with_capacity(self.key_pools.directional.len());
        for set in &self.key_pools.directional {
            directional.push(DirectionalKeySet {
                up: check(&set.up)?,
                left: check(&set.left)?,
                down: check(&set.down)?,
                right: check(&set.right)?,
            });
        }
        let mut sequential = Vec::with_capacity(self.key_pools.sequential.len());
        for binding in &self.key_pools.sequential {
            sequential.push(check(binding)?);
        }

        Ok(KeyPools {
            directional,
            sequential,
        })
    }
}

fn parse_binding(binding: &str) -> Result<KeyCode, ConfigError> {
    parse_key(binding).ok_or_else(|| ConfigError::InvalidKey {
        binding: binding.to_string(),
    })
}

/// Convert a binding string (`"Up"`, `"F11"`, `"w"`…) to a key code.
pub fn parse_key(binding: &str) -> Option<KeyCode> {
    let code = match binding {
        "Right" => KeyCode::Right,
        "Left" => KeyCode::Left,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Enter" => KeyCode::Enter,
        "Esc" => KeyCode::Esc,
        "Space" => KeyCode::Char(' '),
        "Tab" => KeyCode::Tab,
        "Backspace" => KeyCode::Backspace,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
                return Some(KeyCode::F(n));
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c.to_ascii_lowercase()),
                _ => return None,
            }
        }
    };
    Some(code)
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
/// Bindings never match while Ctrl or Alt is held.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }
    let code = match event.code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };
    parse_key(binding) == Some(code)
}
