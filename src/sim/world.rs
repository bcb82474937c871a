/// WorldState: the complete snapshot of a running game.
///
/// One owned aggregate: the driver passes `&mut WorldState` to the update
/// functions and `&WorldState` to the renderer. Nothing else holds game
/// state.
///
/// ## Coordinates
///
/// Play-area pixels, origin at the top-left corner, y grows downward.
/// Entities store their center. The renderer scales the play area onto
/// the terminal grid.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::PlayConfig;
use crate::domain::entity::{Bullet, Enemy, Explosion, Player};
use crate::domain::rules;

/// Progression phase. Transitions live in `sim::progression::advance`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// Wave cleared, waiting for exactly one upgrade choice.
    LevelUpgrade,
    /// Player destroyed, surviving enemies flying off screen.
    GameOverSequence,
    /// Terminal: only the score screen is shown.
    GameOverFinal,
}

pub struct WorldState {
    // ── Entities ──
    pub player: Player,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    pub explosions: Vec<Explosion>,

    // ── Progression ──
    pub phase: Phase,
    pub score: u32,
    pub level: u32,
    pub quota: u32,
    pub spawned: u32,
    pub next_spawn_ms: u64,
    pub graphics_tier: u8,

    // ── Rules ──
    pub play: PlayConfig,
    pub rng: StdRng,

    // ── Meta ──
    pub frame: u64,
    pub paused: bool,
    pub message: String,
    pub message_timer: u32,
}

// ── Construction ──

impl WorldState {
    /// Fresh run. A fixed seed makes every roll reproducible.
    pub fn new(play: PlayConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        WorldState::with_rng(play, rng)
    }

    pub fn with_rng(play: PlayConfig, rng: StdRng) -> Self {
        WorldState {
            player: Player::new(&play),
            bullets: vec![],
            enemies: vec![],
            explosions: vec![],
            phase: Phase::Playing,
            score: 0,
            level: 1,
            quota: play.initial_quota,
            spawned: 0,
            next_spawn_ms: 0,
            graphics_tier: 1,
            play,
            rng,
            frame: 0,
            paused: false,
            message: String::new(),
            message_timer: 0,
        }
    }

    /// Back to the starting state of a run. Rules and RNG stream are kept.
    pub fn reset(&mut self, now_ms: u64) {
        self.player = Player::new(&self.play);
        self.bullets.clear();
        self.enemies.clear();
        self.explosions.clear();
        self.phase = Phase::Playing;
        self.score = 0;
        self.level = 1;
        self.quota = self.play.initial_quota;
        self.spawned = 0;
        self.next_spawn_ms = now_ms;
        self.graphics_tier = 1;
        self.paused = false;
        self.message.clear();
        self.message_timer = 0;
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }
    }
}

// ── Queries ──

impl WorldState {
    /// Every enemy of this level has been spawned and none is left.
    pub fn wave_cleared(&self) -> bool {
        self.spawned >= self.quota && self.enemies.is_empty()
    }

    pub fn spawn_pending(&self) -> bool {
        self.spawned < self.quota
    }

    pub fn progress(&self) -> f32 {
        rules::level_progress(self.spawned, self.enemies.len(), self.quota)
    }
}
