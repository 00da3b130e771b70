//! Text for the player's two overlays: controls and variables.

use crate::input::{KeyMap, key_label};
use crate::types::GlobalVariables;

/// Environment name and description followed by every action's key bindings.
pub fn controls_text(
    name: &str,
    description: &str,
    action_names: &[String],
    key_map: &KeyMap,
) -> Vec<String> {
    let mut lines = vec![
        format!("Name: {name}"),
        format!("Description: {description}"),
        String::new(),
        "Actions:".to_string(),
        String::new(),
    ];
    for action_name in action_names {
        lines.push(format!("{action_name}: "));
        for (key, binding) in key_map.iter() {
            if &binding.action_name == action_name {
                lines.push(format!("  {}: {}", key_label(key), binding.description));
            }
        }
        lines.push(String::new());
    }
    lines
}

/// Global variables, then per-player variables.
///
/// A variable with a single value is global. With one player, per-player
/// variables show that player's value; otherwise every player's value is
/// listed.
pub fn variables_text(variables: &GlobalVariables, player_count: u32) -> Vec<String> {
    let mut globals = Vec::new();
    let mut per_player = Vec::new();

    for (name, values) in variables {
        if values.len() == 1 {
            if let Some(value) = values.values().next() {
                globals.push(format!("{name}: {value}"));
            }
        } else if player_count == 1 {
            let value = values.get(&1).copied().unwrap_or_default();
            per_player.push(format!("{name}: {value}"));
        } else {
            let listed: String = (1..=player_count)
                .map(|p| {
                    let value = values.get(&p).copied().unwrap_or_default();
                    format!("\t{p}: {value}")
                })
                .collect();
            per_player.push(format!("{name}:{listed}"));
        }
    }

    let mut lines = vec!["Global Variables:".to_string()];
    lines.extend(globals);
    lines.push(String::new());
    lines.push("Player Variables:".to_string());
    lines.extend(per_player);
    lines
}
