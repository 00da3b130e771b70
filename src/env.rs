//! Environment description — the human-authored grid-world definition.
//!
//! A GDY-style JSON document describing *what exists*: observers (renderers),
//! actions and their input variants, object definitions with per-renderer
//! tiles, variables and levels. The player and the reference simulation both
//! read from it; nothing here knows about terminals.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{ActionInputMapping, ActionSchema, Color, InputMapping, Vector2};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentDescription {
    pub environment: EnvironmentSection,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub objects: Vec<ObjectDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Renderer name → renderer settings.
    #[serde(default)]
    pub observers: BTreeMap<String, ObserverConfig>,
    #[serde(default)]
    pub player: PlayerSection,
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObserverConfig {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_object: Option<String>,
    #[serde(default = "default_player_count")]
    pub count: u32,
}

fn default_player_count() -> u32 {
    1
}

impl Default for PlayerSection {
    fn default() -> Self {
        PlayerSection {
            avatar_object: None,
            count: default_player_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableDefinition {
    pub name: String,
    #[serde(default)]
    pub initial_value: i64,
    #[serde(default)]
    pub per_player: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mapping: Option<InputMappingDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputMappingDefinition {
    #[serde(default)]
    pub inputs: BTreeMap<u32, InputDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputDefinition {
    #[serde(default)]
    pub vector_to_dest: Vector2,
    #[serde(default)]
    pub orientation_vector: Vector2,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_character: Option<char>,
    #[serde(default)]
    pub z: i32,
    /// Renderer name → tiles, indexed by render tile id.
    #[serde(default)]
    pub observers: BTreeMap<String, Vec<TileDefinition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TileDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<BlockShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockShape {
    Square,
    Triangle,
    Circle,
    Pentagon,
    Hexagon,
}

impl EnvironmentDescription {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn avatar_object(&self) -> Option<&str> {
        self.environment.player.avatar_object.as_deref()
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.name.clone()).collect()
    }

    /// Action schema in the form the input mapper consumes. Actions that
    /// declare no inputs get the default four directional inputs.
    pub fn action_schema(&self) -> ActionSchema {
        self.actions
            .iter()
            .map(|action| {
                let declared = action
                    .input_mapping
                    .as_ref()
                    .map(|m| &m.inputs)
                    .filter(|inputs| !inputs.is_empty());
                let input_mappings = match declared {
                    Some(inputs) => inputs
                        .iter()
                        .map(|(id, input)| {
                            (
                                *id,
                                InputMapping {
                                    vector_to_dest: input.vector_to_dest,
                                    orientation_vector: input.orientation_vector,
                                    description: input.description.clone(),
                                },
                            )
                        })
                        .collect(),
                    None => default_directional_inputs(),
                };
                (
                    action.name.clone(),
                    ActionInputMapping {
                        internal: action.internal,
                        input_mappings,
                    },
                )
            })
            .collect()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDefinition> {
        self.objects.iter().find(|o| o.name == name)
    }
}

fn default_directional_inputs() -> BTreeMap<u32, InputMapping> {
    [
        (1, Vector2::new(-1, 0), "Left"),
        (2, Vector2::new(0, -1), "Up"),
        (3, Vector2::new(1, 0), "Right"),
        (4, Vector2::new(0, 1), "Down"),
    ]
    .into_iter()
    .map(|(id, vector, description)| {
        (
            id,
            InputMapping {
                vector_to_dest: vector,
                orientation_vector: vector,
                description: description.to_string(),
            },
        )
    })
    .collect()
}
