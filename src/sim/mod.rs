//! Simulation — the environment the player drives.
//!
//! The viewer treats a simulation as a black box that accepts action vectors
//! and hands back state snapshots. `GridSimulation` is a small reference
//! implementation over an environment description's levels.

mod grid;

pub use grid::GridSimulation;

use thiserror::Error;

use crate::types::{ActionPair, ActionSchema, GlobalVariables, Snapshot, StepResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("environment has no level {0}")]
    MissingLevel(usize),
    #[error("level row {row} has unknown map character '{ch}'")]
    UnknownMapCharacter { row: usize, ch: char },
    #[error("level has no avatar object '{0}'")]
    MissingAvatar(String),
    #[error("action type {0} does not exist")]
    UnknownActionType(usize),
    #[error("action '{action}' has no variant {action_id}")]
    UnknownActionId { action: String, action_id: u32 },
}

pub trait Simulation {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn player_count(&self) -> u32;

    /// Action names in declaration order; an action's index is its type id.
    fn action_names(&self) -> Vec<String>;

    fn action_input_mappings(&self) -> ActionSchema;

    fn global_variables(&self) -> GlobalVariables;

    fn step(&mut self, actions: &[ActionPair]) -> Result<StepResult, SimulationError>;

    fn state(&self) -> Snapshot;

    fn reset(&mut self) -> Result<(), SimulationError>;
}
