//! Shared boundary types for the grid-world viewer.
//!
//! This module defines the data contracts between the collaborators:
//! - Simulation → Reconciler: `Snapshot` containing `ObjectRecord`s
//! - Simulation → Input mapper: `ActionSchema` of named actions and their input variants
//! - Input mapper → Simulation: `ActionPair`s
//! - Renderer → Terminal: `DrawOp`s rasterized into `Cell`s

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Integer grid vector. Serialized as `[x, y]`, the way environment files write it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Vector2 {
    pub x: i32,
    pub y: i32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl From<[i32; 2]> for Vector2 {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Vector2> for [i32; 2] {
    fn from(v: Vector2) -> Self {
        [v.x, v.y]
    }
}

impl std::ops::Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Orientation {
    /// Orientation a unit vector points at. Anything that is not one of the
    /// four unit vectors has no orientation.
    pub fn from_vector(v: Vector2) -> Self {
        match (v.x, v.y) {
            (0, -1) => Orientation::Up,
            (0, 1) => Orientation::Down,
            (-1, 0) => Orientation::Left,
            (1, 0) => Orientation::Right,
            _ => Orientation::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation → Reconciler boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub name: String,
    pub render_tile_id: u32,
    pub location: Vector2,
    pub orientation: Orientation,
}

impl ObjectRecord {
    /// Key of the renderer template for this object: its name followed by its tile id.
    pub fn template_key(&self) -> String {
        format!("{}{}", self.name, self.render_tile_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub objects: Vec<ObjectRecord>,
    pub hash: u64,
}

// ---------------------------------------------------------------------------
// Action schema and the input mapper → simulation boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMapping {
    pub vector_to_dest: Vector2,
    pub orientation_vector: Vector2,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInputMapping {
    #[serde(default)]
    pub internal: bool,
    /// Variants keyed by action id; iteration is in ascending id order.
    pub input_mappings: BTreeMap<u32, InputMapping>,
}

pub type ActionSchema = BTreeMap<String, ActionInputMapping>;

/// One `[action_type_id, action_id]` entry of an action vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionPair {
    pub action_type_id: usize,
    pub action_id: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepResult {
    pub reward: f64,
    pub terminated: bool,
}

/// Variable name → (player id → value). Player id 0 holds the global value.
pub type GlobalVariables = BTreeMap<String, BTreeMap<u32, i64>>;

// ---------------------------------------------------------------------------
// Shared style primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(NamedColor),
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
}

// ---------------------------------------------------------------------------
// Renderer → Terminal boundary (in-memory only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DrawOp {
    pub x: u16,
    pub y: u16,
    pub ch: char,
    pub style: Style,
    pub z_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}
