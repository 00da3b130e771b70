use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use tracing::debug;

use super::{Simulation, SimulationError};
use crate::env::EnvironmentDescription;
use crate::types::{
    ActionPair, ActionSchema, GlobalVariables, ObjectId, ObjectRecord, Orientation, Snapshot,
    StepResult, Vector2,
};

const EMPTY_CELL: char = '.';
const STEPS_VARIABLE: &str = "_steps";

/// Reference simulation over one level of an environment description.
///
/// Level strings are whitespace-separated tokens, one row per line. A token's
/// first character is an object's `MapCharacter` (`.` is empty); trailing
/// digits are player ids and are ignored. Each action moves the avatar by
/// its `vector_to_dest` when the destination is inside the grid and free,
/// and turns it towards a non-zero `orientation_vector`.
#[derive(Debug, Clone)]
pub struct GridSimulation {
    env: EnvironmentDescription,
    level: usize,
    action_names: Vec<String>,
    schema: ActionSchema,
    width: u32,
    height: u32,
    objects: Vec<ObjectRecord>,
    avatar: Option<ObjectId>,
    variables: GlobalVariables,
    steps: u64,
}

impl GridSimulation {
    pub fn new(env: EnvironmentDescription, level: usize) -> Result<Self, SimulationError> {
        let mut sim = Self {
            action_names: env.action_names(),
            schema: env.action_schema(),
            env,
            level,
            width: 0,
            height: 0,
            objects: Vec::new(),
            avatar: None,
            variables: GlobalVariables::new(),
            steps: 0,
        };
        sim.reset()?;
        Ok(sim)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn load_level(&mut self) -> Result<(), SimulationError> {
        let level = self
            .env
            .environment
            .levels
            .get(self.level)
            .ok_or(SimulationError::MissingLevel(self.level))?;

        let rows: Vec<&str> = level
            .lines()
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .collect();

        let mut objects = Vec::new();
        let mut width = 0;
        for (y, row) in rows.iter().enumerate() {
            let tokens: Vec<&str> = row.split_whitespace().collect();
            width = width.max(tokens.len());
            for (x, token) in tokens.iter().enumerate() {
                let Some(ch) = token.chars().next() else {
                    continue;
                };
                if ch == EMPTY_CELL {
                    continue;
                }
                let def = self
                    .env
                    .objects
                    .iter()
                    .find(|o| o.map_character == Some(ch))
                    .ok_or(SimulationError::UnknownMapCharacter { row: y, ch })?;
                objects.push(ObjectRecord {
                    id: ObjectId(objects.len() as u32 + 1),
                    name: def.name.clone(),
                    render_tile_id: 0,
                    location: Vector2::new(x as i32, y as i32),
                    orientation: Orientation::None,
                });
            }
        }

        let avatar = match self.env.avatar_object() {
            Some(name) => Some(
                objects
                    .iter()
                    .find(|o| o.name == name)
                    .map(|o| o.id)
                    .ok_or_else(|| SimulationError::MissingAvatar(name.to_string()))?,
            ),
            None => None,
        };

        self.width = width as u32;
        self.height = rows.len() as u32;
        self.objects = objects;
        self.avatar = avatar;
        Ok(())
    }

    fn initial_variables(&self) -> GlobalVariables {
        let players = self.env.environment.player.count;
        let mut variables = GlobalVariables::new();
        variables.insert(STEPS_VARIABLE.to_string(), BTreeMap::from([(0, 0)]));
        for def in &self.env.environment.variables {
            // Per-player variables keep the player-0 slot next to each player's.
            let values = if def.per_player {
                (0..=players).map(|p| (p, def.initial_value)).collect()
            } else {
                BTreeMap::from([(0, def.initial_value)])
            };
            variables.insert(def.name.clone(), values);
        }
        variables
    }

    fn apply(&mut self, action: ActionPair) -> Result<(), SimulationError> {
        let name = self
            .action_names
            .get(action.action_type_id)
            .ok_or(SimulationError::UnknownActionType(action.action_type_id))?;
        let mapping = self
            .schema
            .get(name)
            .and_then(|m| m.input_mappings.get(&action.action_id))
            .ok_or_else(|| SimulationError::UnknownActionId {
                action: name.clone(),
                action_id: action.action_id,
            })?;

        let Some(avatar) = self.avatar else {
            return Ok(());
        };
        let Some(index) = self.objects.iter().position(|o| o.id == avatar) else {
            return Ok(());
        };

        let dest = self.objects[index].location + mapping.vector_to_dest;
        let in_bounds = dest.x >= 0
            && dest.y >= 0
            && (dest.x as u32) < self.width
            && (dest.y as u32) < self.height;
        let blocked = self
            .objects
            .iter()
            .any(|o| o.id != avatar && o.location == dest);
        if in_bounds && !blocked {
            self.objects[index].location = dest;
        }
        if !mapping.orientation_vector.is_zero() {
            self.objects[index].orientation = Orientation::from_vector(mapping.orientation_vector);
        }
        Ok(())
    }
}

impl Simulation for GridSimulation {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn player_count(&self) -> u32 {
        self.env.environment.player.count
    }

    fn action_names(&self) -> Vec<String> {
        self.action_names.clone()
    }

    fn action_input_mappings(&self) -> ActionSchema {
        self.schema.clone()
    }

    fn global_variables(&self) -> GlobalVariables {
        self.variables.clone()
    }

    fn step(&mut self, actions: &[ActionPair]) -> Result<StepResult, SimulationError> {
        for action in actions {
            self.apply(*action)?;
        }
        self.steps += 1;
        if let Some(values) = self.variables.get_mut(STEPS_VARIABLE) {
            values.insert(0, self.steps as i64);
        }

        let terminated = self
            .env
            .environment
            .max_steps
            .is_some_and(|max| self.steps >= max);
        debug!(steps = self.steps, actions = actions.len(), terminated, "simulation_stepped");
        Ok(StepResult {
            reward: 0.0,
            terminated,
        })
    }

    fn state(&self) -> Snapshot {
        let mut hasher = DefaultHasher::new();
        self.objects.hash(&mut hasher);
        Snapshot {
            objects: self.objects.clone(),
            hash: hasher.finish(),
        }
    }

    fn reset(&mut self) -> Result<(), SimulationError> {
        self.load_level()?;
        self.variables = self.initial_variables();
        self.steps = 0;
        Ok(())
    }
}
