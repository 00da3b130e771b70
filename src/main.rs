use std::fs::File;
use std::process;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ascii_gridworld::{
    config::ViewerConfig,
    env::EnvironmentDescription,
    input::KeyMap,
    player::{Player, PlayerScene, controls_text},
    renderer::{TerminalRenderer, resolve_renderer_config},
    sim::GridSimulation,
};

const LOG_FILE_ENV_VAR: &str = "ASCII_GRIDWORLD_LOG";
const DEFAULT_RENDERER: &str = "Block2D";

fn main() {
    if let Err(e) = run() {
        error!(error = %format!("{e:#}"), "run_failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const PLAY_USAGE: &str = "ascii-gridworld play <env.json> [renderer] [level]";
const CONTROLS_USAGE: &str = "ascii-gridworld controls <env.json>";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("play") => {
            let path = args.next().context(PLAY_USAGE)?;
            let renderer = args.next().unwrap_or_else(|| DEFAULT_RENDERER.to_string());
            let level = match args.next() {
                Some(level) => level
                    .parse()
                    .with_context(|| format!("Invalid level '{level}'\n\nUsage:\n  {PLAY_USAGE}"))?,
                None => 0,
            };
            init_tracing_to_file()?;
            play(&path, &renderer, level)
        }
        Some("controls") => {
            let path = args.next().context(CONTROLS_USAGE)?;
            init_tracing_to_stderr();
            controls(&path)
        }
        _ => bail!(
            "ASCII Gridworld — terminal viewer for grid-world environments\n\nUsage:\n  {PLAY_USAGE}\n  {CONTROLS_USAGE}"
        ),
    }
}

fn play(path: &str, renderer_name: &str, level: usize) -> Result<()> {
    let env = EnvironmentDescription::load(path)?;
    let config = ViewerConfig::load();

    let renderer_config =
        match resolve_renderer_config(&env, renderer_name, config.default_tile_size) {
            Ok(renderer_config) => renderer_config,
            Err(e) => {
                // Nothing is displayed for an environment the viewer cannot draw.
                eprintln!("Display Error: {e}");
                return Ok(());
            }
        };
    info!(
        renderer = %renderer_config.name,
        kind = ?renderer_config.kind,
        level,
        "renderer_selected"
    );

    let pools = config.key_pools().context("Invalid key pools in viewer config")?;
    let renderer = TerminalRenderer::new(renderer_config, env.avatar_object().map(str::to_string));
    let sim = GridSimulation::new(env.clone(), level)
        .with_context(|| format!("Failed to start level {level} of {path}"))?;
    let scene = PlayerScene::create(&env, sim, renderer, pools, config.input_cooldown())?;

    let mut player = Player::new(scene, config);
    player.play()
}

fn controls(path: &str) -> Result<()> {
    let env = EnvironmentDescription::load(path)?;
    let config = ViewerConfig::load();
    let pools = config.key_pools().context("Invalid key pools in viewer config")?;

    let action_names = env.action_names();
    let key_map = KeyMap::build(&action_names, &env.action_schema(), pools)
        .context("Failed to bind keys to actions")?;
    info!(env = %env.environment.name, keys = key_map.len(), "key_map_built");

    for line in controls_text(
        &env.environment.name,
        &env.environment.description,
        &action_names,
        &key_map,
    ) {
        println!("{line}");
    }
    Ok(())
}

/// The player owns the terminal, so logs only go to a file, and only when
/// `ASCII_GRIDWORLD_LOG` names one.
fn init_tracing_to_file() -> Result<()> {
    let Ok(path) = std::env::var(LOG_FILE_ENV_VAR) else {
        return Ok(());
    };
    let file = File::create(&path).with_context(|| format!("Failed to create log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}

fn init_tracing_to_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
