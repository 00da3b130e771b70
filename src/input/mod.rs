//! Input mapper — binds physical keys to the simulation's actions.
//!
//! The key map is built once per scene from the action schema. Actions whose
//! variants point in more than one direction take a whole directional key
//! set (WASD or arrows); every other action takes one sequential key per
//! variant. Both pools are stacks consumed from the end.

mod cooldown;
mod keyboard;

pub use cooldown::{Cooldown, DEFAULT_INPUT_COOLDOWN};
pub use keyboard::KeyboardState;

use std::collections::HashSet;

use crossterm::event::KeyCode;
use thiserror::Error;

use crate::types::{ActionPair, ActionSchema, Vector2};

/// Four keys laid out as a direction pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionalKeySet {
    pub up: KeyCode,
    pub left: KeyCode,
    pub down: KeyCode,
    pub right: KeyCode,
}

impl DirectionalKeySet {
    pub const ARROWS: DirectionalKeySet = DirectionalKeySet {
        up: KeyCode::Up,
        left: KeyCode::Left,
        down: KeyCode::Down,
        right: KeyCode::Right,
    };

    pub const WASD: DirectionalKeySet = DirectionalKeySet {
        up: KeyCode::Char('w'),
        left: KeyCode::Char('a'),
        down: KeyCode::Char('s'),
        right: KeyCode::Char('d'),
    };

    /// Key for a unit direction; `None` for any other vector.
    pub fn key_for(&self, direction: Vector2) -> Option<KeyCode> {
        match (direction.x, direction.y) {
            (0, -1) => Some(self.up),
            (-1, 0) => Some(self.left),
            (0, 1) => Some(self.down),
            (1, 0) => Some(self.right),
            _ => None,
        }
    }

    pub fn keys(&self) -> [KeyCode; 4] {
        [self.up, self.left, self.down, self.right]
    }
}

/// Keys available to the mapper. Both vectors are stacks: the last element
/// is handed out first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPools {
    pub directional: Vec<DirectionalKeySet>,
    pub sequential: Vec<KeyCode>,
}

/// Sequential keys in stack order; `e` is handed out first, then `q`, `r`, `f`…
pub const DEFAULT_SEQUENTIAL_KEYS: [char; 21] = [
    '3', '2', '1', 'l', 'o', 'm', 'k', 'n', 'j', 'u', 'b', 'h', 'y', 'v', 'g', 't', 'c', 'f',
    'r', 'q', 'e',
];

impl Default for KeyPools {
    /// WASD is handed out before the arrow keys.
    fn default() -> Self {
        KeyPools {
            directional: vec![DirectionalKeySet::ARROWS, DirectionalKeySet::WASD],
            sequential: DEFAULT_SEQUENTIAL_KEYS
                .iter()
                .map(|c| KeyCode::Char(*c))
                .collect(),
        }
    }
}

impl KeyPools {
    pub fn all_keys(&self) -> Vec<KeyCode> {
        self.directional
            .iter()
            .flat_map(|set| set.keys())
            .chain(self.sequential.iter().copied())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyMapError {
    #[error("action '{action}' has no input mapping in the action schema")]
    MissingSchema { action: String },
    #[error("no directional key set left for action '{action}'")]
    DirectionalPoolExhausted { action: String },
    #[error("no sequential key left for action '{action}' (variant {action_id})")]
    SequentialPoolExhausted { action: String, action_id: u32 },
    #[error(
        "action '{action}' variant {action_id} points at {vector:?}, which no directional key covers"
    )]
    UnresolvedDirection {
        action: String,
        action_id: u32,
        vector: Vector2,
    },
    #[error("key {key} for action '{action}' is already bound to '{existing}'")]
    KeyConflict {
        key: String,
        action: String,
        existing: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub action_name: String,
    /// Index of the action in the simulation's ordered action names.
    pub action_type_id: usize,
    pub action_id: u32,
    pub description: String,
}

/// Physical key → action variant, in construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    bindings: Vec<(KeyCode, KeyBinding)>,
}

impl KeyMap {
    /// Assign keys to every non-internal action in `action_names` order.
    pub fn build(
        action_names: &[String],
        schema: &ActionSchema,
        mut pools: KeyPools,
    ) -> Result<Self, KeyMapError> {
        let mut map = KeyMap::default();

        for (action_type_id, action_name) in action_names.iter().enumerate() {
            let mapping = schema
                .get(action_name)
                .ok_or_else(|| KeyMapError::MissingSchema {
                    action: action_name.clone(),
                })?;
            if mapping.internal {
                continue;
            }

            let directions: HashSet<Vector2> = mapping
                .input_mappings
                .values()
                .map(|m| m.vector_to_dest)
                .collect();
            let directional = directions.len() != 1;

            if directional {
                let keys =
                    pools
                        .directional
                        .pop()
                        .ok_or_else(|| KeyMapError::DirectionalPoolExhausted {
                            action: action_name.clone(),
                        })?;
                for (action_id, input) in &mapping.input_mappings {
                    let key = keys
                        .key_for(input.vector_to_dest)
                        .or_else(|| keys.key_for(input.orientation_vector))
                        .ok_or_else(|| KeyMapError::UnresolvedDirection {
                            action: action_name.clone(),
                            action_id: *action_id,
                            vector: input.vector_to_dest,
                        })?;
                    map.insert(
                        key,
                        KeyBinding {
                            action_name: action_name.clone(),
                            action_type_id,
                            action_id: *action_id,
                            description: input.description.clone(),
                        },
                    )?;
                }
            } else {
                for (action_id, input) in &mapping.input_mappings {
                    let key = pools.sequential.pop().ok_or_else(|| {
                        KeyMapError::SequentialPoolExhausted {
                            action: action_name.clone(),
                            action_id: *action_id,
                        }
                    })?;
                    map.insert(
                        key,
                        KeyBinding {
                            action_name: action_name.clone(),
                            action_type_id,
                            action_id: *action_id,
                            description: input.description.clone(),
                        },
                    )?;
                }
            }
        }

        Ok(map)
    }

    fn insert(&mut self, key: KeyCode, binding: KeyBinding) -> Result<(), KeyMapError> {
        if let Some((_, existing)) = self.bindings.iter().find(|(k, _)| *k == key) {
            return Err(KeyMapError::KeyConflict {
                key: key_label(key),
                action: binding.action_name,
                existing: existing.action_name.clone(),
            });
        }
        self.bindings.push((key, binding));
        Ok(())
    }

    /// Action vector for the keys currently down. Reads `is_down` afresh on
    /// every call; an empty result means there is no input this tick.
    pub fn poll(&self, is_down: impl Fn(KeyCode) -> bool) -> Vec<ActionPair> {
        self.bindings
            .iter()
            .filter(|(key, _)| is_down(*key))
            .map(|(_, binding)| ActionPair {
                action_type_id: binding.action_type_id,
                action_id: binding.action_id,
            })
            .collect()
    }

    pub fn get(&self, key: KeyCode) -> Option<&KeyBinding> {
        self.bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, binding)| binding)
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyCode, &KeyBinding)> {
        self.bindings.iter().map(|(key, binding)| (*key, binding))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Human-readable key name for help text and diagnostics.
pub fn key_label(key: KeyCode) -> String {
    match key {
        KeyCode::Up => "Up".into(),
        KeyCode::Down => "Down".into(),
        KeyCode::Left => "Left".into(),
        KeyCode::Right => "Right".into(),
        KeyCode::Enter => "Enter".into(),
        KeyCode::Esc => "Esc".into(),
        KeyCode::Tab => "Tab".into(),
        KeyCode::Backspace => "Backspace".into(),
        KeyCode::Home => "Home".into(),
        KeyCode::End => "End".into(),
        KeyCode::Char(' ') => "Space".into(),
        KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
        KeyCode::F(n) => format!("F{n}"),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::types::{ActionInputMapping, InputMapping};

    fn variant(x: i32, y: i32, description: &str) -> InputMapping {
        InputMapping {
            vector_to_dest: Vector2::new(x, y),
            orientation_vector: Vector2::ZERO,
            description: description.into(),
        }
    }

    fn action(variants: Vec<(u32, InputMapping)>) -> ActionInputMapping {
        ActionInputMapping {
            internal: false,
            input_mappings: variants.into_iter().collect::<BTreeMap<_, _>>(),
        }
    }

    fn moves() -> ActionInputMapping {
        action(vec![
            (1, variant(0, -1, "North")),
            (2, variant(0, 1, "South")),
            (3, variant(1, 0, "East")),
            (4, variant(-1, 0, "West")),
        ])
    }

    fn interacts() -> ActionInputMapping {
        action(vec![(1, variant(0, 0, "A")), (2, variant(0, 0, "B"))])
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn directional_action_takes_wasd_spatially() {
        let schema: ActionSchema = [("move".to_string(), moves())].into_iter().collect();
        let map = KeyMap::build(&names(&["move"]), &schema, KeyPools::default()).expect("build");

        assert_eq!(map.len(), 4);
        assert_eq!(map.get(KeyCode::Char('w')).map(|b| b.action_id), Some(1));
        assert_eq!(map.get(KeyCode::Char('s')).map(|b| b.action_id), Some(2));
        assert_eq!(map.get(KeyCode::Char('d')).map(|b| b.action_id), Some(3));
        assert_eq!(map.get(KeyCode::Char('a')).map(|b| b.action_id), Some(4));
        assert_eq!(map.get(KeyCode::Char('w')).map(|b| b.description.as_str()), Some("North"));
    }

    #[test]
    fn second_directional_action_takes_arrows() {
        let schema: ActionSchema = [("move".to_string(), moves()), ("look".to_string(), moves())]
            .into_iter()
            .collect();
        let map =
            KeyMap::build(&names(&["move", "look"]), &schema, KeyPools::default()).expect("build");

        let look = map.get(KeyCode::Up).expect("up bound");
        assert_eq!(look.action_name, "look");
        assert_eq!(look.action_type_id, 1);
        assert_eq!(look.action_id, 1);
        assert_eq!(map.get(KeyCode::Down).map(|b| b.action_id), Some(2));
        assert_eq!(map.get(KeyCode::Right).map(|b| b.action_id), Some(3));
        assert_eq!(map.get(KeyCode::Left).map(|b| b.action_id), Some(4));
        assert_eq!(
            map.get(KeyCode::Char('w')).map(|b| b.action_name.as_str()),
            Some("move")
        );
        assert!(
            map.iter()
                .filter(|(_, b)| b.action_name == "look")
                .all(|(k, _)| DirectionalKeySet::ARROWS.keys().contains(&k))
        );
    }

    #[test]
    fn non_directional_variants_take_sequential_keys_in_order() {
        let schema: ActionSchema = [("interact".to_string(), interacts())].into_iter().collect();
        let map =
            KeyMap::build(&names(&["interact"]), &schema, KeyPools::default()).expect("build");

        let keys: Vec<(KeyCode, u32)> = map.iter().map(|(k, b)| (k, b.action_id)).collect();
        assert_eq!(
            keys,
            vec![(KeyCode::Char('e'), 1), (KeyCode::Char('q'), 2)]
        );
    }

    #[test]
    fn single_variant_action_is_non_directional() {
        let schema: ActionSchema = [(
            "turn".to_string(),
            action(vec![(1, variant(0, -1, "Turn"))]),
        )]
        .into_iter()
        .collect();
        let map = KeyMap::build(&names(&["turn"]), &schema, KeyPools::default()).expect("build");

        assert_eq!(map.get(KeyCode::Char('e')).map(|b| b.action_id), Some(1));
        assert!(map.get(KeyCode::Char('w')).is_none());
    }

    #[test]
    fn orientation_vector_resolves_stationary_variants() {
        let rotate = action(vec![
            (
                1,
                InputMapping {
                    vector_to_dest: Vector2::ZERO,
                    orientation_vector: Vector2::new(-1, 0),
                    description: "Rotate left".into(),
                },
            ),
            (2, variant(0, -1, "Forward")),
        ]);
        let schema: ActionSchema = [("move".to_string(), rotate)].into_iter().collect();
        let map = KeyMap::build(&names(&["move"]), &schema, KeyPools::default()).expect("build");

        assert_eq!(map.get(KeyCode::Char('a')).map(|b| b.action_id), Some(1));
        assert_eq!(map.get(KeyCode::Char('w')).map(|b| b.action_id), Some(2));
    }

    #[test]
    fn internal_actions_are_skipped_but_keep_their_index() {
        let mut hidden = interacts();
        hidden.internal = true;
        let schema: ActionSchema = [
            ("spawn".to_string(), hidden),
            ("interact".to_string(), interacts()),
        ]
        .into_iter()
        .collect();
        let map = KeyMap::build(&names(&["spawn", "interact"]), &schema, KeyPools::default())
            .expect("build");

        assert_eq!(map.len(), 2);
        assert!(map.iter().all(|(_, b)| b.action_type_id == 1));
    }

    #[test]
    fn exhausted_pools_name_the_action() {
        let schema: ActionSchema = [("move".to_string(), moves()), ("look".to_string(), moves())]
            .into_iter()
            .collect();
        let pools = KeyPools {
            directional: vec![DirectionalKeySet::WASD],
            sequential: vec![],
        };
        assert_eq!(
            KeyMap::build(&names(&["move", "look"]), &schema, pools.clone()),
            Err(KeyMapError::DirectionalPoolExhausted {
                action: "look".into()
            })
        );

        let schema: ActionSchema = [("interact".to_string(), interacts())].into_iter().collect();
        let pools = KeyPools {
            directional: vec![],
            sequential: vec![KeyCode::Char('e')],
        };
        assert_eq!(
            KeyMap::build(&names(&["interact"]), &schema, pools),
            Err(KeyMapError::SequentialPoolExhausted {
                action: "interact".into(),
                action_id: 2
            })
        );
    }

    #[test]
    fn diagonal_variants_cannot_be_resolved() {
        let schema: ActionSchema = [(
            "jump".to_string(),
            action(vec![(1, variant(1, 1, "Diagonal")), (2, variant(0, 1, "Down"))]),
        )]
        .into_iter()
        .collect();
        assert!(matches!(
            KeyMap::build(&names(&["jump"]), &schema, KeyPools::default()),
            Err(KeyMapError::UnresolvedDirection { action_id: 1, .. })
        ));
    }

    #[test]
    fn variants_sharing_a_direction_conflict() {
        let schema: ActionSchema = [(
            "move".to_string(),
            action(vec![
                (1, variant(0, -1, "Up")),
                (
                    2,
                    InputMapping {
                        vector_to_dest: Vector2::new(0, 0),
                        orientation_vector: Vector2::new(0, -1),
                        description: "Face up".into(),
                    },
                ),
            ]),
        )]
        .into_iter()
        .collect();
        assert!(matches!(
            KeyMap::build(&names(&["move"]), &schema, KeyPools::default()),
            Err(KeyMapError::KeyConflict { .. })
        ));
    }

    #[test]
    fn missing_schema_is_an_error() {
        let schema = ActionSchema::new();
        assert_eq!(
            KeyMap::build(&names(&["move"]), &schema, KeyPools::default()),
            Err(KeyMapError::MissingSchema {
                action: "move".into()
            })
        );
    }

    #[test]
    fn poll_reports_held_keys_in_binding_order() {
        let schema: ActionSchema = [
            ("move".to_string(), moves()),
            ("interact".to_string(), interacts()),
        ]
        .into_iter()
        .collect();
        let map = KeyMap::build(&names(&["move", "interact"]), &schema, KeyPools::default())
            .expect("build");

        assert!(map.poll(|_| false).is_empty());
        assert_eq!(
            map.poll(|k| k == KeyCode::Char('q')),
            vec![ActionPair {
                action_type_id: 1,
                action_id: 2
            }]
        );
        assert_eq!(
            map.poll(|k| k == KeyCode::Char('e') || k == KeyCode::Char('w')),
            vec![
                ActionPair {
                    action_type_id: 0,
                    action_id: 1
                },
                ActionPair {
                    action_type_id: 1,
                    action_id: 1
                },
            ]
        );
    }

    #[test]
    fn labels_are_readable() {
        assert_eq!(key_label(KeyCode::Char('w')), "W");
        assert_eq!(key_label(KeyCode::Left), "Left");
        assert_eq!(key_label(KeyCode::F(11)), "F11");
    }
}
