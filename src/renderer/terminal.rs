//! Terminal renderer — sprites on a character-cell grid.
//!
//! Sprites are kept in a slot table keyed by `SpriteId`. Each presentation
//! rasterizes every live sprite into a cell grid; the first frame is written
//! in full, later frames only write the cells that changed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Write};

use crossterm::{cursor, queue, style};
use thiserror::Error;

use super::{RenderAdapter, RendererConfig, RendererKind};
use crate::env::{BlockShape, ObjectDefinition, TileDefinition};
use crate::types::{
    Cell, CellChange, Color, DrawOp, NamedColor, ObjectRecord, Orientation, Style, Vector2,
};

/// Tile sizes at or above this are drawn two columns wide to keep cells square-ish.
const WIDE_TILE_THRESHOLD: u32 = 16;

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SpriteId(u32);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer '{renderer}' has no template '{key}'")]
    UnknownTemplate { renderer: String, key: String },
    #[error("sprite {0} does not exist")]
    UnknownSprite(u32),
    #[error("renderer used before init")]
    NotInitialized,
    #[error("a {width}x{height} grid does not fit on a terminal canvas")]
    GridTooLarge { width: u32, height: u32 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
struct Template {
    ch: char,
    style: Style,
    shape: Option<BlockShape>,
}

#[derive(Debug, Clone)]
struct SpriteState {
    name: String,
    template_key: String,
    location: Vector2,
    orientation: Orientation,
}

pub struct TerminalRenderer {
    config: RendererConfig,
    avatar_object: Option<String>,
    templates: HashMap<String, Template>,
    /// Object name → z from its definition.
    depth: HashMap<String, i32>,
    /// Object name → z used for the current update, set by `begin_update`.
    z_order: HashMap<String, i32>,
    sprites: BTreeMap<u32, SpriteState>,
    next_sprite: u32,
    /// Canvas size in terminal cells, set by `init`.
    canvas: Option<(u16, u16)>,
    presented: Option<Vec<Vec<Cell>>>,
}

impl TerminalRenderer {
    pub fn new(config: RendererConfig, avatar_object: Option<String>) -> Self {
        Self {
            config,
            avatar_object,
            templates: HashMap::new(),
            depth: HashMap::new(),
            z_order: HashMap::new(),
            sprites: BTreeMap::new(),
            next_sprite: 0,
            canvas: None,
            presented: None,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Terminal columns used by one grid tile.
    pub fn tile_columns(&self) -> u16 {
        if self.config.tile_size >= WIDE_TILE_THRESHOLD {
            2
        } else {
            1
        }
    }

    /// Canvas size in terminal cells, once initialized.
    pub fn canvas_size(&self) -> Option<(u16, u16)> {
        self.canvas
    }

    /// Force the next `present` to write a full frame (e.g. after a resize).
    pub fn invalidate(&mut self) {
        self.presented = None;
    }

    /// Rasterize every live sprite into a cell grid.
    pub fn compose(&self) -> Result<Vec<Vec<Cell>>, RenderError> {
        let (width, height) = self.canvas_size().ok_or(RenderError::NotInitialized)?;
        let columns = self.tile_columns();
        let mut ops = Vec::with_capacity(self.sprites.len() * columns as usize);

        for sprite in self.sprites.values() {
            let Some(template) = self.templates.get(&sprite.template_key) else {
                continue;
            };
            let (Ok(tile_x), Ok(y)) = (
                u16::try_from(sprite.location.x),
                u16::try_from(sprite.location.y),
            ) else {
                continue;
            };
            let Some(x) = tile_x.checked_mul(columns) else {
                continue;
            };
            let z_order = self.z_for(&sprite.name);
            let ch = oriented_glyph(template, sprite.orientation);
            let fill = matches!(template.shape, Some(BlockShape::Square));
            for column in 0..columns {
                if column > 0 && !fill {
                    break;
                }
                ops.push(DrawOp {
                    x: x.saturating_add(column),
                    y,
                    ch,
                    style: template.style.clone(),
                    z_order,
                });
            }
        }

        Ok(rasterize(&ops, width, height))
    }

    /// Write the current frame to `out`, `row_offset` rows below the top.
    ///
    /// The first frame after `init` or `invalidate` is written in full; later
    /// frames only write changed cells.
    pub fn present<W: Write>(&mut self, out: &mut W, row_offset: u16) -> Result<(), RenderError> {
        let grid = self.compose()?;
        match &self.presented {
            None => {
                for (y, row) in grid.iter().enumerate() {
                    queue!(out, cursor::MoveTo(0, (y as u16).saturating_add(row_offset)))?;
                    for cell in row {
                        let cs = to_content_style(&cell.style);
                        queue!(
                            out,
                            style::PrintStyledContent(style::StyledContent::new(cs, cell.ch))
                        )?;
                    }
                }
            }
            Some(prev) => {
                for change in diff(prev, &grid) {
                    let cs = to_content_style(&change.cell.style);
                    queue!(
                        out,
                        cursor::MoveTo(change.x, change.y.saturating_add(row_offset)),
                        style::PrintStyledContent(style::StyledContent::new(cs, change.cell.ch)),
                    )?;
                }
            }
        }
        out.flush()?;
        self.presented = Some(grid);
        Ok(())
    }

    fn z_for(&self, name: &str) -> i32 {
        self.z_order
            .get(name)
            .or_else(|| self.depth.get(name))
            .copied()
            .unwrap_or(0)
    }

    fn template(&self, template_key: &str) -> Result<&Template, RenderError> {
        self.templates
            .get(template_key)
            .ok_or_else(|| RenderError::UnknownTemplate {
                renderer: self.config.name.clone(),
                key: template_key.to_string(),
            })
    }

    fn build_template(&self, def: &ObjectDefinition, tile: &TileDefinition) -> Template {
        let style = Style {
            fg: tile.color.clone(),
            ..Style::default()
        };
        match self.config.kind {
            RendererKind::Block2D => {
                let shape = tile.shape.unwrap_or(BlockShape::Square);
                Template {
                    ch: shape_glyph(shape),
                    style,
                    shape: Some(shape),
                }
            }
            RendererKind::Sprite2D => Template {
                ch: tile
                    .glyph
                    .or(def.map_character)
                    .or_else(|| def.name.chars().next())
                    .unwrap_or('?'),
                style,
                shape: None,
            },
        }
    }
}

impl RenderAdapter for TerminalRenderer {
    type Sprite = SpriteId;
    type Error = RenderError;

    fn init(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let canvas_w = u16::try_from(width)
            .ok()
            .and_then(|w| w.checked_mul(self.tile_columns()));
        let canvas_h = u16::try_from(height).ok();
        let (Some(canvas_w), Some(canvas_h)) = (canvas_w, canvas_h) else {
            return Err(RenderError::GridTooLarge { width, height });
        };
        self.canvas = Some((canvas_w, canvas_h));
        self.presented = None;
        Ok(())
    }

    fn load_templates(&mut self, objects: &[ObjectDefinition]) -> Result<(), RenderError> {
        for def in objects {
            self.depth.insert(def.name.clone(), def.z);
            let tiles = def
                .observers
                .get(&self.config.name)
                .filter(|tiles| !tiles.is_empty())
                .cloned()
                .unwrap_or_else(|| vec![TileDefinition::default()]);
            for (tile_id, tile) in tiles.iter().enumerate() {
                let template = self.build_template(def, tile);
                self.templates
                    .insert(format!("{}{}", def.name, tile_id), template);
            }
        }
        Ok(())
    }

    fn begin_update(&mut self, objects: &[ObjectRecord]) {
        let names: HashSet<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        let mut z_order: HashMap<String, i32> = names
            .iter()
            .map(|name| (name.to_string(), self.depth.get(*name).copied().unwrap_or(0)))
            .collect();
        if let Some(avatar) = &self.avatar_object {
            let top = z_order.values().copied().max().unwrap_or(0);
            if let Some(z) = z_order.get_mut(avatar) {
                *z = top + 1;
            }
        }
        self.z_order = z_order;
    }

    fn add_object(
        &mut self,
        name: &str,
        template_key: &str,
        location: Vector2,
        orientation: Orientation,
    ) -> Result<SpriteId, RenderError> {
        if self.canvas.is_none() {
            return Err(RenderError::NotInitialized);
        }
        self.template(template_key)?;
        let id = self.next_sprite;
        self.next_sprite += 1;
        self.sprites.insert(
            id,
            SpriteState {
                name: name.to_string(),
                template_key: template_key.to_string(),
                location,
                orientation,
            },
        );
        Ok(SpriteId(id))
    }

    fn update_object(
        &mut self,
        sprite: &SpriteId,
        name: &str,
        template_key: &str,
        location: Vector2,
        orientation: Orientation,
    ) -> Result<(), RenderError> {
        self.template(template_key)?;
        let state = self
            .sprites
            .get_mut(&sprite.0)
            .ok_or(RenderError::UnknownSprite(sprite.0))?;
        state.name = name.to_string();
        state.template_key = template_key.to_string();
        state.location = location;
        state.orientation = orientation;
        Ok(())
    }

    fn destroy(&mut self, sprite: SpriteId) -> Result<(), RenderError> {
        self.sprites
            .remove(&sprite.0)
            .map(|_| ())
            .ok_or(RenderError::UnknownSprite(sprite.0))
    }
}

// ---------------------------------------------------------------------------
// Rasterization
// ---------------------------------------------------------------------------

/// Paint draw ops onto a fixed-size grid; higher z values paint over lower ones.
fn rasterize(ops: &[DrawOp], width: u16, height: u16) -> Vec<Vec<Cell>> {
    let w = width as usize;
    let h = height as usize;
    let mut grid = vec![vec![Cell::default(); w]; h];

    let mut ops: Vec<_> = ops.iter().collect();
    ops.sort_by_key(|op| op.z_order);

    for op in ops {
        let x = op.x as usize;
        let y = op.y as usize;
        if x < w && y < h {
            grid[y][x] = Cell {
                ch: op.ch,
                style: op.style.clone(),
            };
        }
    }

    grid
}

fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
    let mut changes = Vec::new();
    for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
        for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
            if prev_cell != next_cell {
                changes.push(CellChange {
                    x: x as u16,
                    y: y as u16,
                    cell: next_cell.clone(),
                });
            }
        }
    }
    changes
}

fn shape_glyph(shape: BlockShape) -> char {
    match shape {
        BlockShape::Square => '█',
        BlockShape::Triangle => '▲',
        BlockShape::Circle => '●',
        BlockShape::Pentagon => '⬟',
        BlockShape::Hexagon => '⬢',
    }
}

/// Triangles point the way the object faces; other glyphs do not rotate.
fn oriented_glyph(template: &Template, orientation: Orientation) -> char {
    if template.shape != Some(BlockShape::Triangle) {
        return template.ch;
    }
    match orientation {
        Orientation::None | Orientation::Up => '▲',
        Orientation::Down => '▼',
        Orientation::Left => '◀',
        Orientation::Right => '▶',
    }
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(s: &Style) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(fg) = &s.fg {
        cs.foreground_color = Some(to_ct_color(fg));
    }
    if let Some(bg) = &s.bg {
        cs.background_color = Some(to_ct_color(bg));
    }
    if s.bold {
        cs.attributes.set(style::Attribute::Bold);
    }
    if s.dim {
        cs.attributes.set(style::Attribute::Dim);
    }
    cs
}

pub fn to_ct_color(c: &Color) -> style::Color {
    match c {
        Color::Named(n) => match n {
            NamedColor::Black => style::Color::Black,
            NamedColor::Red => style::Color::Red,
            NamedColor::Green => style::Color::Green,
            NamedColor::Yellow => style::Color::Yellow,
            NamedColor::Blue => style::Color::Blue,
            NamedColor::Magenta => style::Color::Magenta,
            NamedColor::Cyan => style::Color::Cyan,
            NamedColor::White => style::Color::White,
        },
        Color::Rgb { r, g, b } => style::Color::Rgb {
            r: *r,
            g: *g,
            b: *b,
        },
    }
}
