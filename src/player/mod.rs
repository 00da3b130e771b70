//! Player — the interactive terminal front end.
//!
//! Owns the terminal for the lifetime of a scene: raw mode, alternate
//! screen, focus and key-release reporting. Every frame it feeds terminal
//! events into the keyboard state, ticks the scene, and presents the
//! renderer's canvas below the menu bar.

mod modals;
mod scene;

pub use modals::{controls_text, variables_text};
pub use scene::{PlayerScene, TickOutcome};

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use crossterm::event::{
    self, Event, KeyEvent, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::{cursor, execute, queue, style, terminal};
use tracing::info;

use crate::config::{ViewerConfig, matches_binding};
use crate::input::KeyboardState;
use crate::menubar::print_menu_item;
use crate::renderer::TerminalRenderer;
use crate::sim::Simulation;

/// Rows reserved above the canvas for the menu bar.
const CANVAS_OFFSET: u16 = 1;
/// Columns between the canvas and an overlay panel.
const PANEL_GAP: u16 = 2;

pub struct Player<S: Simulation> {
    scene: PlayerScene<S, TerminalRenderer>,
    config: ViewerConfig,
    show_controls: bool,
    show_variables: bool,
    fullscreen: bool,
}

impl<S: Simulation> Player<S> {
    pub fn new(scene: PlayerScene<S, TerminalRenderer>, config: ViewerConfig) -> Self {
        Self {
            scene,
            config,
            show_controls: false,
            show_variables: false,
            fullscreen: false,
        }
    }

    /// Play the scene in the terminal until the quit key is pressed.
    ///
    /// Sets up the terminal, enters the event loop, and restores the terminal
    /// on exit (even on error).
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        let (need_w, need_h) = self.canvas_size();
        // +2: one row for menu bar, one row for status bar
        if term_w < need_w || term_h < need_h + 2 {
            bail!(
                "Terminal too small: need {}x{}, have {}x{}",
                need_w,
                need_h + 2,
                term_w,
                term_h,
            );
        }

        let mut stdout = io::stdout();
        let reports_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            event::EnableFocusChange,
            terminal::Clear(terminal::ClearType::All),
        )?;
        if reports_release {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let result = self.run_loop(&mut stdout, reports_release);
        let released = self.scene.teardown();

        // Always restore terminal state.
        if reports_release {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(
            stdout,
            event::DisableFocusChange,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();

        info!(
            steps = self.scene.steps(),
            total_reward = self.scene.total_reward(),
            "shutdown"
        );
        result?;
        released.map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    fn run_loop(&mut self, stdout: &mut io::Stdout, reports_release: bool) -> Result<()> {
        let mut keyboard = KeyboardState::new(reports_release);
        let frame = self.config.frame_interval();
        self.render_all(stdout)?;

        loop {
            let mut redraw = false;
            if event::poll(frame)? {
                loop {
                    let ev = event::read()?;
                    let consumed = match &ev {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if matches_binding(&self.config.key_bindings.quit, key) {
                                return Ok(());
                            }
                            self.handle_viewer_key(stdout, key)?
                        }
                        Event::Resize(_, _) => true,
                        _ => false,
                    };
                    if consumed {
                        redraw = true;
                    } else {
                        keyboard.handle_event(&ev);
                    }
                    if !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }

            let outcome = self.scene.tick(Instant::now(), &mut keyboard)?;
            if redraw {
                self.render_all(stdout)?;
            } else if outcome.rendered || outcome.stepped {
                self.scene.renderer_mut().present(stdout, CANVAS_OFFSET)?;
                self.render_status(stdout)?;
                if self.show_variables {
                    self.render_panels(stdout)?;
                }
            }
        }
    }

    /// Overlay and fullscreen toggles. Returns whether the key was consumed.
    fn handle_viewer_key(&mut self, stdout: &mut io::Stdout, key: &KeyEvent) -> Result<bool> {
        let bindings = &self.config.key_bindings;
        if matches_binding(&bindings.toggle_controls, key) {
            self.show_controls = !self.show_controls;
        } else if matches_binding(&bindings.toggle_variables, key) {
            self.show_variables = !self.show_variables;
        } else if matches_binding(&bindings.fullscreen, key) {
            self.fullscreen = !self.fullscreen;
            if self.fullscreen {
                stdout.write_all(b"\x1b[10;1t")?;
            } else {
                stdout.write_all(b"\x1b[10;0t")?;
            }
            stdout.flush()?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    fn canvas_size(&self) -> (u16, u16) {
        self.scene.renderer().canvas_size().unwrap_or((0, 0))
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render_all(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        queue!(stdout, terminal::Clear(terminal::ClearType::All))?;
        self.render_menubar(stdout)?;
        self.scene.renderer_mut().invalidate();
        self.scene.renderer_mut().present(stdout, CANVAS_OFFSET)?;
        self.render_panels(stdout)?;
        self.render_status(stdout)?;
        Ok(())
    }

    fn render_menubar(&self, stdout: &mut io::Stdout) -> Result<()> {
        let bindings = &self.config.key_bindings;
        let items = [
            format!("[{}] controls", bindings.toggle_controls),
            format!("[{}] variables", bindings.toggle_variables),
            format!("[{}] quit", bindings.quit),
            format!("[{}] full", bindings.fullscreen),
        ];

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(" "),
        )?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                queue!(stdout, style::Print("  "))?;
            }
            print_menu_item(stdout, item)?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Controls and variables panels, stacked to the right of the canvas.
    fn render_panels(&self, stdout: &mut io::Stdout) -> Result<()> {
        let (canvas_w, _) = self.canvas_size();
        let (term_w, term_h) = terminal::size()?;
        let x = canvas_w + PANEL_GAP;
        if x >= term_w {
            return Ok(());
        }
        let width = (term_w - x) as usize;

        let mut lines: Vec<&str> = Vec::new();
        if self.show_controls {
            lines.extend(self.scene.controls_text().iter().map(String::as_str));
        }
        if self.show_variables {
            if !lines.is_empty() {
                lines.push("");
            }
            lines.extend(self.scene.variables_text().iter().map(String::as_str));
        }

        let rows = term_h.saturating_sub(CANVAS_OFFSET + 1);
        for row in 0..rows {
            let text = lines.get(row as usize).copied().unwrap_or("");
            let text: String = text.replace('\t', "  ").chars().take(width).collect();
            queue!(
                stdout,
                cursor::MoveTo(x, row + CANVAS_OFFSET),
                style::Print(format!("{text:<width$}")),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let (_, canvas_h) = self.canvas_size();
        let status_y = canvas_h + CANVAS_OFFSET;
        let (_, term_h) = terminal::size()?;
        if status_y >= term_h {
            return Ok(()); // No room for status bar.
        }

        let renderer = self.scene.renderer().config();
        let status = format!(
            " {} | steps {} | reward {} | {} keys ",
            renderer.name,
            self.scene.steps(),
            self.scene.total_reward(),
            self.scene.key_map().len(),
        );

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        stdout.flush()?;
        Ok(())
    }
}
