/// Entry point and game loop.
///
/// Per frame: collect input, render the state the previous frame left
/// behind, apply meta commands (quit, pause, upgrade choice, restart)
/// against what was just drawn, then advance the simulation one step.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::entity::{FrameInput, Upgrade};
use sim::event::GameEvent;
use sim::progression::{self, Trigger};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;

fn main() {
    let config = GameConfig::load();

    let logging = logging::init(&config.general);
    for warning in &config.warnings {
        if logging {
            log::warn!("config: {warning}");
        } else {
            eprintln!("Warning: {warning}");
        }
    }
    log::info!(
        "starting: play area {}x{}, seed {:?}",
        config.play.width, config.play.height, config.general.seed
    );

    let mut world = WorldState::new(config.play.clone(), config.general.seed);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    log::info!("exit: score {} at level {}", world.score, world.level);
    println!();
    println!("Thanks for playing Starstrike!");
    println!("Final Score: {}", world.score);
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let frame = Duration::from_millis(config.speed.frame_ms);

    // Simulation clock: stands still while paused.
    let mut sim_us: u64 = 0;
    let mut last_frame = Instant::now();

    loop {
        let frame_start = Instant::now();
        if !world.paused {
            sim_us += frame_start.duration_since(last_frame).as_micros() as u64;
        }
        last_frame = frame_start;
        let now_ms = sim_us / 1000;

        kb.drain_events();
        gp.update();
        if kb.ctrl_c_pressed() {
            break;
        }

        renderer.set_gamepad_connected(gp.connected);
        renderer.render(world, kb.pointer)?;

        // Clicks land on the buttons that are on screen right now.
        let clicked = kb.take_click_action(renderer.buttons());
        let commands = read_commands(&kb, &gp, clicked, world.phase);
        match update(world, &commands, frame_input(&kb, &gp, now_ms)) {
            Some(events) => log_events(&events),
            None => break,
        }

        let spent = frame_start.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_FIRE: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_UP_SPEED: &[KeyCode] = &[KeyCode::Char('1'), KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_UP_GUN: &[KeyCode] = &[KeyCode::Char('2'), KeyCode::Char('g'), KeyCode::Char('G')];
const KEYS_UP_GRAPHICS: &[KeyCode] = &[KeyCode::Char('3'), KeyCode::Char('v'), KeyCode::Char('V')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Enter];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1)];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc];

fn frame_input(kb: &InputState, gp: &GamepadState, now_ms: u64) -> FrameInput {
    FrameInput {
        left: kb.any_held(KEYS_LEFT) || gp.left_held(),
        right: kb.any_held(KEYS_RIGHT) || gp.right_held(),
        fire: kb.any_held(KEYS_FIRE) || gp.fire_held(),
        now_ms,
    }
}

fn detect_upgrade(kb: &InputState, gp: &GamepadState) -> Option<Upgrade> {
    if kb.any_pressed(KEYS_UP_SPEED) {
        Some(Upgrade::Speed)
    } else if kb.any_pressed(KEYS_UP_GUN) {
        Some(Upgrade::Gun)
    } else if kb.any_pressed(KEYS_UP_GRAPHICS) {
        Some(Upgrade::Graphics)
    } else {
        gp.upgrade_pressed()
    }
}

/// Meta commands decoded from one frame of keyboard, pad and mouse input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Commands {
    quit: bool,
    pause: bool,
    upgrade: Option<Upgrade>,
    restart: bool,
}

fn read_commands(
    kb: &InputState,
    gp: &GamepadState,
    clicked: Option<Upgrade>,
    phase: Phase,
) -> Commands {
    Commands {
        quit: kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed(),
        // Start doubles as pause while playing and as restart on the score screen
        pause: kb.any_pressed(KEYS_PAUSE)
            || (gp.confirm_pressed() && matches!(phase, Phase::Playing | Phase::GameOverSequence)),
        upgrade: detect_upgrade(kb, gp).or(clicked),
        restart: kb.any_pressed(KEYS_RESTART) || gp.confirm_pressed(),
    }
}

/// Apply meta commands, then step the simulation unless paused.
/// Returns None to quit.
fn update(world: &mut WorldState, cmds: &Commands, input: FrameInput) -> Option<Vec<GameEvent>> {
    if handle_meta(world, cmds, input.now_ms) {
        return None;
    }
    if world.paused {
        return Some(vec![]);
    }
    Some(step::step(world, input))
}

/// Quit, pause, upgrade choice and restart. Returns true to quit.
fn handle_meta(world: &mut WorldState, cmds: &Commands, now_ms: u64) -> bool {
    if cmds.quit {
        return true;
    }

    // F1 / Start: Pause / Resume (not on the final score screen)
    if cmds.pause && world.phase != Phase::GameOverFinal {
        world.paused = !world.paused;
        log::debug!("paused: {}", world.paused);
        return false;
    }
    if world.paused {
        return false;
    }

    match world.phase {
        Phase::LevelUpgrade => {
            if let Some(upgrade) = cmds.upgrade {
                choose_upgrade(world, upgrade, now_ms);
            }
        }
        Phase::GameOverFinal => {
            if cmds.restart {
                if let Some(event) = progression::advance(world, Trigger::Restart, now_ms) {
                    log_events(&[event]);
                }
            }
        }
        Phase::Playing | Phase::GameOverSequence => {}
    }
    false
}

fn choose_upgrade(world: &mut WorldState, upgrade: Upgrade, now_ms: u64) {
    match progression::apply_upgrade(world, upgrade, now_ms) {
        Some(event) => {
            let banner = format!("LEVEL {}", world.level);
            world.set_message(&banner, 90);
            log_events(&[event]);
        }
        None => {
            let label = match upgrade {
                Upgrade::Gun => "Guns Maxed!",
                Upgrade::Graphics => "Graphics Maxed!",
                Upgrade::Speed => return,
            };
            world.set_message(label, 60);
        }
    }
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::EnemySpawned { class, x } => log::debug!("spawn {class:?} at x={x:.0}"),
            GameEvent::EnemyDestroyed { class, points } => log::debug!("kill {class:?} +{points}"),
            GameEvent::EnemyEscaped => log::debug!("enemy escaped"),
            GameEvent::ShotFired { .. } => {}
            GameEvent::PlayerHit { lives_left } => log::info!("player hit, {lives_left} lives left"),
            GameEvent::LevelCleared { level, score } => {
                log::info!("level {level} cleared, score {score}")
            }
            GameEvent::UpgradeApplied { upgrade, level } => {
                log::info!("upgrade {upgrade:?}, starting level {level}")
            }
            GameEvent::PlayerDestroyed => log::info!("player destroyed"),
            GameEvent::GameOver { score, level } => {
                log::info!("game over: score {score}, level {level}")
            }
            GameEvent::Restarted => log::info!("restarted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayConfig;

    fn menu_world() -> WorldState {
        let mut w = WorldState::new(PlayConfig::default(), Some(3));
        w.spawned = w.quota;
        progression::advance(&mut w, Trigger::WaveCleared, 0);
        w
    }

    #[test]
    fn chosen_upgrade_announces_next_level() {
        let mut w = menu_world();
        choose_upgrade(&mut w, Upgrade::Speed, 10);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.message, "LEVEL 2");
    }

    #[test]
    fn capped_upgrade_keeps_menu_and_says_so() {
        let mut w = menu_world();
        w.graphics_tier = 3;
        choose_upgrade(&mut w, Upgrade::Graphics, 10);
        assert_eq!(w.phase, Phase::LevelUpgrade);
        assert_eq!(w.message, "Graphics Maxed!");
    }

    fn idle(now_ms: u64) -> FrameInput {
        FrameInput { left: false, right: false, fire: false, now_ms }
    }

    #[test]
    fn upgrade_applies_before_the_step() {
        let mut w = menu_world();
        let frame = w.frame;
        let cmds = Commands { upgrade: Some(Upgrade::Gun), ..Commands::default() };
        let events = update(&mut w, &cmds, idle(20)).unwrap();
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.gun_tier, 2);
        // The same frame already simulates the new level.
        assert_eq!(w.frame, frame + 1);
        assert!(events.iter().all(|e| !matches!(e, GameEvent::UpgradeApplied { .. })));
    }

    #[test]
    fn paused_frames_do_not_step() {
        let mut w = WorldState::new(PlayConfig::default(), Some(3));
        let pause = Commands { pause: true, ..Commands::default() };
        assert!(update(&mut w, &pause, idle(0)).unwrap().is_empty());
        assert!(w.paused);
        let frame = w.frame;
        assert!(update(&mut w, &Commands::default(), idle(16)).unwrap().is_empty());
        assert_eq!(w.frame, frame);

        update(&mut w, &pause, idle(32));
        assert!(!w.paused);
        assert_eq!(w.frame, frame + 1);
    }

    #[test]
    fn quit_stops_before_stepping() {
        let mut w = WorldState::new(PlayConfig::default(), Some(3));
        let frame = w.frame;
        let quit = Commands { quit: true, ..Commands::default() };
        assert!(update(&mut w, &quit, idle(0)).is_none());
        assert_eq!(w.frame, frame);
    }

    #[test]
    fn restart_only_from_final_screen() {
        let mut w = WorldState::new(PlayConfig::default(), Some(3));
        w.score = 50;
        let restart = Commands { restart: true, ..Commands::default() };
        handle_meta(&mut w, &restart, 0);
        assert_eq!(w.score, 50);

        w.phase = Phase::GameOverFinal;
        w.player.lives = 0;
        handle_meta(&mut w, &restart, 0);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.score, 0);
    }
}
