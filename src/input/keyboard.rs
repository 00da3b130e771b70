use std::collections::HashSet;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

/// Which keys are currently held, as seen through terminal events.
///
/// Terminals that report key releases give true held-key state. Others only
/// send presses (and auto-repeat), so a press stays visible until the next
/// `end_poll`. While the terminal has lost focus no key reads as down.
#[derive(Debug, Clone)]
pub struct KeyboardState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    reports_release: bool,
    enabled: bool,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            reports_release: false,
            enabled: true,
        }
    }
}

impl KeyboardState {
    pub fn new(reports_release: bool) -> Self {
        Self {
            reports_release,
            ..Self::default()
        }
    }

    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::FocusLost => {
                self.enabled = false;
                self.held.clear();
                self.pressed.clear();
            }
            Event::FocusGained => self.enabled = true,
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) {
        if !self.enabled {
            return;
        }
        let code = normalize(key.code);
        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                self.held.insert(code);
                self.pressed.insert(code);
            }
            KeyEventKind::Release => {
                self.reports_release = true;
                self.held.remove(&code);
            }
        }
    }

    pub fn is_down(&self, key: KeyCode) -> bool {
        if !self.enabled {
            return false;
        }
        self.pressed.contains(&key) || (self.reports_release && self.held.contains(&key))
    }

    /// Forget presses seen since the last poll.
    pub fn end_poll(&mut self) {
        self.pressed.clear();
        if !self.reports_release {
            self.held.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Shifted letters count as the same physical key.
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}
