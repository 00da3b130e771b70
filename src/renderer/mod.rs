//! Renderer — the display side of the player scene.
//!
//! `RenderAdapter` is the capability set the state reconciler drives. The
//! concrete renderer kind is chosen once, from the environment's observer
//! configuration, by `resolve_renderer_config`.

mod terminal;

pub use terminal::{RenderError, SpriteId, TerminalRenderer};

use thiserror::Error;

use crate::env::{EnvironmentDescription, ObjectDefinition};
use crate::types::{ObjectRecord, Orientation, Vector2};

pub const DEFAULT_TILE_SIZE: u32 = 24;

/// Operations the reconciler and scene driver need from a renderer.
///
/// Sprite handles are opaque to callers. `destroy` takes the handle by value
/// so a handle can only be released once.
pub trait RenderAdapter {
    type Sprite;
    type Error: std::error::Error + Send + Sync + 'static;

    fn init(&mut self, width: u32, height: u32) -> Result<(), Self::Error>;

    fn load_templates(&mut self, objects: &[ObjectDefinition]) -> Result<(), Self::Error>;

    /// Called with the full incoming object list before any per-object call.
    fn begin_update(&mut self, objects: &[ObjectRecord]);

    fn add_object(
        &mut self,
        name: &str,
        template_key: &str,
        location: Vector2,
        orientation: Orientation,
    ) -> Result<Self::Sprite, Self::Error>;

    fn update_object(
        &mut self,
        sprite: &Self::Sprite,
        name: &str,
        template_key: &str,
        location: Vector2,
        orientation: Orientation,
    ) -> Result<(), Self::Error>;

    fn destroy(&mut self, sprite: Self::Sprite) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Block2D,
    Sprite2D,
}

impl RendererKind {
    /// Kind implied by a renderer's name when its config has no explicit type.
    pub fn from_renderer_name(name: &str) -> Option<Self> {
        match name {
            "SPRITE_2D" | "Sprite2D" => Some(RendererKind::Sprite2D),
            "BLOCK_2D" | "Block2D" => Some(RendererKind::Block2D),
            _ => None,
        }
    }

    pub fn from_type_name(kind: &str) -> Option<Self> {
        match kind {
            "SPRITE_2D" => Some(RendererKind::Sprite2D),
            "BLOCK_2D" => Some(RendererKind::Block2D),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Observer name, also the key of per-object tile definitions.
    pub name: String,
    pub kind: RendererKind,
    pub tile_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Only Block2D and Sprite2D renderers can be used to view grid-world environments (got '{name}')")]
    UnsupportedRenderer { name: String },
    #[error("renderer '{name}' has unknown type '{kind}'")]
    UnknownType { name: String, kind: String },
}

/// Resolve the settings of the renderer called `renderer_name`.
///
/// A renderer missing from the environment's observers is still accepted
/// when its name identifies a known kind.
pub fn resolve_renderer_config(
    env: &EnvironmentDescription,
    renderer_name: &str,
    default_tile_size: u32,
) -> Result<RendererConfig, SchemaError> {
    let observer = env
        .environment
        .observers
        .get(renderer_name)
        .cloned()
        .unwrap_or_default();

    let kind = match observer.kind.as_deref() {
        Some(kind) => RendererKind::from_type_name(kind).ok_or_else(|| SchemaError::UnknownType {
            name: renderer_name.to_string(),
            kind: kind.to_string(),
        })?,
        None => RendererKind::from_renderer_name(renderer_name).ok_or_else(|| {
            SchemaError::UnsupportedRenderer {
                name: renderer_name.to_string(),
            }
        })?,
    };

    Ok(RendererConfig {
        name: renderer_name.to_string(),
        kind,
        tile_size: observer.tile_size.unwrap_or(default_tile_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvironmentDescription {
        EnvironmentDescription::from_json(
            r#"{
                "Environment": {
                    "Name": "test",
                    "Observers": {
                        "Block2D": { "TileSize": 10 },
                        "Fancy": { "Type": "SPRITE_2D" },
                        "Broken": { "Type": "ISOMETRIC" }
                    }
                }
            }"#,
        )
        .expect("parse")
    }

    #[test]
    fn infers_kind_from_renderer_name() {
        let config = resolve_renderer_config(&env(), "Block2D", DEFAULT_TILE_SIZE).expect("config");
        assert_eq!(config.kind, RendererKind::Block2D);
        assert_eq!(config.tile_size, 10);

        let config =
            resolve_renderer_config(&env(), "SPRITE_2D", DEFAULT_TILE_SIZE).expect("config");
        assert_eq!(config.kind, RendererKind::Sprite2D);
        assert_eq!(config.tile_size, DEFAULT_TILE_SIZE);
    }

    #[test]
    fn explicit_type_wins_over_name() {
        let config = resolve_renderer_config(&env(), "Fancy", 16).expect("config");
        assert_eq!(config.kind, RendererKind::Sprite2D);
        assert_eq!(config.tile_size, 16);
    }

    #[test]
    fn unknown_renderers_are_schema_errors() {
        assert_eq!(
            resolve_renderer_config(&env(), "Vector", DEFAULT_TILE_SIZE),
            Err(SchemaError::UnsupportedRenderer {
                name: "Vector".into()
            })
        );
        assert!(matches!(
            resolve_renderer_config(&env(), "Broken", DEFAULT_TILE_SIZE),
            Err(SchemaError::UnknownType { .. })
        ));
    }
}
