//! Player scene — one simulation bound to one renderer.
//!
//! Each tick polls the key map (rate-limited by the input cooldown), steps the
//! simulation with whatever actions are held, and re-reconciles the renderer
//! when the state hash moved.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::modals::{controls_text, variables_text};
use crate::env::EnvironmentDescription;
use crate::input::{Cooldown, KeyMap, KeyPools, KeyboardState};
use crate::reconcile::StateReconciler;
use crate::renderer::RenderAdapter;
use crate::sim::Simulation;

/// What one `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub polled: bool,
    pub stepped: bool,
    pub rendered: bool,
}

pub struct PlayerScene<S: Simulation, R: RenderAdapter> {
    sim: S,
    renderer: R,
    key_map: KeyMap,
    reconciler: StateReconciler<R::Sprite>,
    cooldown: Cooldown,
    state_hash: Option<u64>,
    steps: u64,
    total_reward: f64,
    controls: Vec<String>,
    variables: Vec<String>,
}

impl<S: Simulation, R: RenderAdapter> PlayerScene<S, R> {
    /// Load templates, build the key map, and draw the initial state.
    ///
    /// A key map that cannot be built is fatal: the scene is never shown.
    pub fn create(
        env: &EnvironmentDescription,
        sim: S,
        mut renderer: R,
        pools: KeyPools,
        input_cooldown: Duration,
    ) -> Result<Self> {
        renderer
            .load_templates(&env.objects)
            .context("Failed to load object templates")?;

        let action_names = sim.action_names();
        let key_map = KeyMap::build(&action_names, &sim.action_input_mappings(), pools)
            .context("Failed to bind keys to actions")?;

        renderer
            .init(sim.width(), sim.height())
            .context("Failed to initialise renderer")?;

        let controls = controls_text(
            &env.environment.name,
            &env.environment.description,
            &action_names,
            &key_map,
        );
        let variables = variables_text(&sim.global_variables(), sim.player_count());

        let mut scene = Self {
            sim,
            renderer,
            key_map,
            reconciler: StateReconciler::new(),
            cooldown: Cooldown::new(input_cooldown),
            state_hash: None,
            steps: 0,
            total_reward: 0.0,
            controls,
            variables,
        };

        let state = scene.sim.state();
        scene
            .reconciler
            .reconcile(&mut scene.renderer, &state.objects)?;
        scene.state_hash = Some(state.hash);

        info!(
            env = %env.environment.name,
            width = scene.sim.width(),
            height = scene.sim.height(),
            keys = scene.key_map.len(),
            objects = scene.reconciler.len(),
            "scene_created"
        );
        Ok(scene)
    }

    pub fn tick(&mut self, now: Instant, keyboard: &mut KeyboardState) -> Result<TickOutcome> {
        let mut outcome = TickOutcome::default();
        if !self.cooldown.try_begin(now) {
            return Ok(outcome);
        }
        outcome.polled = true;

        let actions = self.key_map.poll(|key| keyboard.is_down(key));
        keyboard.end_poll();
        if actions.is_empty() {
            return Ok(outcome);
        }

        let result = self.sim.step(&actions)?;
        outcome.stepped = true;
        self.steps += 1;
        self.total_reward += result.reward;
        if result.reward > 0.0 {
            info!(reward = result.reward, total = self.total_reward, "reward_received");
        }
        if result.terminated {
            info!(steps = self.steps, total_reward = self.total_reward, "episode_terminated");
            self.sim.reset()?;
        }
        self.variables = variables_text(&self.sim.global_variables(), self.sim.player_count());

        let state = self.sim.state();
        if self.state_hash != Some(state.hash) {
            let stats = self.reconciler.reconcile(&mut self.renderer, &state.objects)?;
            self.state_hash = Some(state.hash);
            outcome.rendered = true;
            debug!(
                hash = state.hash,
                created = stats.created,
                destroyed = stats.destroyed,
                "state_rendered"
            );
        }
        Ok(outcome)
    }

    /// Release every sprite the scene still holds.
    pub fn teardown(&mut self) -> Result<usize> {
        let destroyed = self.reconciler.teardown(&mut self.renderer)?;
        self.state_hash = None;
        Ok(destroyed)
    }

    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn reconciler(&self) -> &StateReconciler<R::Sprite> {
        &self.reconciler
    }

    pub fn simulation(&self) -> &S {
        &self.sim
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn controls_text(&self) -> &[String] {
        &self.controls
    }

    pub fn variables_text(&self) -> &[String] {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

    use super::*;
    use crate::reconcile::tests::{Call, RecordingRenderer, object};
    use crate::sim::SimulationError;
    use crate::types::{
        ActionInputMapping, ActionPair, ActionSchema, GlobalVariables, InputMapping, ObjectRecord,
        Snapshot, StepResult, Vector2,
    };

    /// Scripted simulation: each step applies the next queued snapshot.
    #[derive(Default)]
    struct ScriptedSim {
        current: Vec<ObjectRecord>,
        hash: u64,
        queued: Vec<(Vec<ObjectRecord>, u64, StepResult)>,
        received: Vec<Vec<ActionPair>>,
        resets: usize,
    }

    impl Simulation for ScriptedSim {
        fn width(&self) -> u32 {
            4
        }

        fn height(&self) -> u32 {
            4
        }

        fn player_count(&self) -> u32 {
            1
        }

        fn action_names(&self) -> Vec<String> {
            vec!["move".into()]
        }

        fn action_input_mappings(&self) -> ActionSchema {
            let variant = |x, y, d: &str| InputMapping {
                vector_to_dest: Vector2::new(x, y),
                orientation_vector: Vector2::ZERO,
                description: d.into(),
            };
            let mapping = ActionInputMapping {
                internal: false,
                input_mappings: BTreeMap::from([
                    (1, variant(-1, 0, "Left")),
                    (2, variant(0, -1, "Up")),
                    (3, variant(1, 0, "Right")),
                    (4, variant(0, 1, "Down")),
                ]),
            };
            [("move".to_string(), mapping)].into_iter().collect()
        }

        fn global_variables(&self) -> GlobalVariables {
            [("_steps".to_string(), BTreeMap::from([(0, self.received.len() as i64)]))]
                .into_iter()
                .collect()
        }

        fn step(&mut self, actions: &[ActionPair]) -> Result<StepResult, SimulationError> {
            self.received.push(actions.to_vec());
            if self.queued.is_empty() {
                return Ok(StepResult::default());
            }
            let (objects, hash, result) = self.queued.remove(0);
            self.current = objects;
            self.hash = hash;
            Ok(result)
        }

        fn state(&self) -> Snapshot {
            Snapshot {
                objects: self.current.clone(),
                hash: self.hash,
            }
        }

        fn reset(&mut self) -> Result<(), SimulationError> {
            self.resets += 1;
            Ok(())
        }
    }

    fn env() -> EnvironmentDescription {
        EnvironmentDescription::from_json(
            r#"{ "Environment": { "Name": "scripted", "Description": "test" } }"#,
        )
        .expect("env")
    }

    fn scene(sim: ScriptedSim) -> PlayerScene<ScriptedSim, RecordingRenderer> {
        PlayerScene::create(
            &env(),
            sim,
            RecordingRenderer::default(),
            KeyPools::default(),
            Duration::from_millis(50),
        )
        .expect("scene")
    }

    fn press(keyboard: &mut KeyboardState, c: char) {
        keyboard.handle_key(&KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
    }

    #[test]
    fn create_draws_the_initial_state() {
        let sim = ScriptedSim {
            current: vec![object(1, "wall", 0, 0), object(2, "avatar", 1, 1)],
            hash: 10,
            ..ScriptedSim::default()
        };
        let scene = scene(sim);

        assert_eq!(scene.reconciler().len(), 2);
        assert_eq!(scene.key_map().len(), 4);
        assert_eq!(scene.renderer().calls[0], Call::Begin(2));
        assert_eq!(scene.controls_text()[0], "Name: scripted");
    }

    #[test]
    fn no_held_keys_means_no_step() {
        let mut scene = scene(ScriptedSim::default());
        let mut keyboard = KeyboardState::default();

        let outcome = scene.tick(Instant::now(), &mut keyboard).expect("tick");
        assert!(outcome.polled);
        assert!(!outcome.stepped);
        assert!(scene.simulation().received.is_empty());
    }

    #[test]
    fn held_key_steps_and_renders_changed_state() {
        let sim = ScriptedSim {
            current: vec![object(1, "avatar", 1, 1)],
            hash: 1,
            queued: vec![(vec![object(1, "avatar", 2, 1)], 2, StepResult::default())],
            ..ScriptedSim::default()
        };
        let mut scene = scene(sim);
        let mut keyboard = KeyboardState::default();
        press(&mut keyboard, 'd');

        let outcome = scene.tick(Instant::now(), &mut keyboard).expect("tick");
        assert_eq!(
            outcome,
            TickOutcome {
                polled: true,
                stepped: true,
                rendered: true
            }
        );
        assert_eq!(
            scene.simulation().received,
            vec![vec![ActionPair {
                action_type_id: 0,
                action_id: 3
            }]]
        );
        assert_eq!(
            scene.reconciler().get(crate::types::ObjectId(1)).map(|e| e.object.location),
            Some(Vector2::new(2, 1))
        );
        assert_eq!(scene.variables_text()[1], "_steps: 1");
    }

    #[test]
    fn unchanged_hash_skips_reconciliation() {
        let sim = ScriptedSim {
            current: vec![object(1, "avatar", 1, 1)],
            hash: 1,
            ..ScriptedSim::default()
        };
        let mut scene = scene(sim);
        let calls_after_create = scene.renderer().calls.len();
        let mut keyboard = KeyboardState::default();
        press(&mut keyboard, 'w');

        let outcome = scene.tick(Instant::now(), &mut keyboard).expect("tick");
        assert!(outcome.stepped);
        assert!(!outcome.rendered);
        assert_eq!(scene.renderer().calls.len(), calls_after_create);
    }

    #[test]
    fn cooldown_limits_polling() {
        let mut scene = scene(ScriptedSim::default());
        let mut keyboard = KeyboardState::default();
        let start = Instant::now();

        press(&mut keyboard, 'w');
        assert!(scene.tick(start, &mut keyboard).expect("tick").stepped);

        press(&mut keyboard, 'w');
        let blocked = scene
            .tick(start + Duration::from_millis(20), &mut keyboard)
            .expect("tick");
        assert_eq!(blocked, TickOutcome::default());

        let reopened = scene
            .tick(start + Duration::from_millis(50), &mut keyboard)
            .expect("tick");
        assert!(reopened.stepped);
        assert_eq!(scene.simulation().received.len(), 2);
    }

    #[test]
    fn termination_resets_the_simulation() {
        let sim = ScriptedSim {
            queued: vec![(
                Vec::new(),
                0,
                StepResult {
                    reward: 1.0,
                    terminated: true,
                },
            )],
            ..ScriptedSim::default()
        };
        let mut scene = scene(sim);
        let mut keyboard = KeyboardState::default();
        press(&mut keyboard, 'a');

        scene.tick(Instant::now(), &mut keyboard).expect("tick");
        assert_eq!(scene.simulation().resets, 1);
        assert_eq!(scene.total_reward(), 1.0);
        assert_eq!(scene.steps(), 1);
    }

    #[test]
    fn teardown_releases_all_sprites() {
        let sim = ScriptedSim {
            current: vec![object(1, "a", 0, 0), object(2, "b", 1, 0)],
            hash: 5,
            ..ScriptedSim::default()
        };
        let mut scene = scene(sim);

        assert_eq!(scene.teardown().expect("teardown"), 2);
        assert!(scene.reconciler().is_empty());
        assert!(scene.renderer().live.is_empty());
    }
}
