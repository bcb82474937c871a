/// Game rules as pure functions: spawn odds, speeds, cooldowns, upgrade
/// math and effect budgets.
///
/// ## Spawn table
/// ┌────────────────────┬─────────────────────────────────┐
/// │ Roll               │ Probability                      │
/// ├────────────────────┼─────────────────────────────────┤
/// │ fast               │ min(0.15 + 0.02·(level-1), 0.5) │
/// │ wave (tier 3 only) │ min(0.50 + 0.05·(level-1), 0.8) │
/// └────────────────────┴─────────────────────────────────┘
///
/// ## Explosion budgets (frames)
/// ┌──────┬────────┬───────┐
/// │ Tier │ Normal │ Final │
/// ├──────┼────────┼───────┤
/// │ 1    │ 10     │ 20    │
/// │ 2    │ 15     │ 30    │
/// │ 3    │ 20     │ 40    │
/// └──────┴────────┴───────┘

pub const MAX_GUN_TIER: u8 = 4;
pub const MAX_GRAPHICS_TIER: u8 = 3;

pub const BULLET_STEP: f32 = 5.0;
/// Lateral offset of each barrel at max gun tier.
pub const TWIN_OFFSET: f32 = 5.0;

pub const PLAIN_SIZE: f32 = 20.0;
pub const FAST_SIZE: f32 = 16.0;
pub const FAST_SPEED_FACTOR: f32 = 1.8;
/// Enemies enter from just above the visible top edge.
pub const SPAWN_Y: f32 = -20.0;

pub const WAVE_AMPLITUDE_MIN: f32 = 30.0;
pub const WAVE_AMPLITUDE_SPAN: f32 = 20.0;
pub const WAVE_FREQUENCY_MIN: f32 = 0.05;
pub const WAVE_FREQUENCY_SPAN: f32 = 0.03;

// ── Game-over fly-off ──
pub const EXIT_MARGIN: f32 = 100.0;
pub const EXIT_GRAVITY: f32 = 0.2;
pub const EXIT_LIFT: f32 = 3.0;

pub fn fast_chance(level: u32) -> f64 {
    (0.15 + 0.02 * level.saturating_sub(1) as f64).min(0.5)
}

pub fn wave_chance(level: u32) -> f64 {
    (0.5 + 0.05 * level.saturating_sub(1) as f64).min(0.8)
}

/// Wave motion only exists at the highest graphics tier, and only for fast enemies.
pub fn wave_allowed(graphics_tier: u8, fast: bool) -> bool {
    fast && graphics_tier >= MAX_GRAPHICS_TIER
}

pub fn enemy_speed(level: u32, fast: bool) -> f32 {
    let base = 1.0 + level as f32 * 0.5;
    if fast { base * FAST_SPEED_FACTOR } else { base }
}

pub fn enemy_size(fast: bool) -> f32 {
    if fast { FAST_SIZE } else { PLAIN_SIZE }
}

/// Width of the rotation-speed roll, centered on zero.
pub fn spin_range(fast: bool) -> f32 {
    if fast { 0.15 } else { 0.1 }
}

/// Can the gun fire at `now_ms`? The first shot is always allowed.
pub fn can_fire(last_shot_ms: Option<u64>, now_ms: u64, fire_rate_ms: u64) -> bool {
    match last_shot_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= fire_rate_ms,
    }
}

/// Barrel x offsets relative to the ship's nose for a gun tier.
pub fn barrel_offsets(gun_tier: u8) -> &'static [f32] {
    if gun_tier >= MAX_GUN_TIER {
        &[-TWIN_OFFSET, TWIN_OFFSET]
    } else {
        &[0.0]
    }
}

/// Fire rate after a gun upgrade to `new_tier`: 10% faster below the cap,
/// unchanged when the upgrade reaches the cap (the twin barrel is the bonus).
pub fn fire_rate_after_upgrade(fire_rate_ms: u64, new_tier: u8) -> u64 {
    if new_tier < MAX_GUN_TIER {
        fire_rate_ms * 9 / 10
    } else {
        fire_rate_ms
    }
}

pub fn explosion_budget(graphics_tier: u8, is_final: bool) -> u32 {
    let base = match graphics_tier {
        0 | 1 => 10,
        2 => 15,
        _ => 20,
    };
    if is_final { base * 2 } else { base }
}

/// Horizontal position of a weaving enemy, clamped so it stays a full
/// body-width inside the play area.
pub fn wave_x(initial_x: f32, distance: f32, frequency: f32, amplitude: f32, width: f32, play_width: f32) -> f32 {
    let x = initial_x + (distance * frequency).sin() * amplitude;
    x.max(width).min(play_width - width)
}

/// Is a flying-off enemy still within the extended bounds?
pub fn within_exit_bounds(x: f32, y: f32, play_width: f32, play_height: f32) -> bool {
    y > -EXIT_MARGIN
        && y < play_height + EXIT_MARGIN
        && x > -EXIT_MARGIN
        && x < play_width + EXIT_MARGIN
}

/// Share of the level's quota already destroyed, 0.0..=1.0.
pub fn level_progress(spawned: u32, alive: usize, quota: u32) -> f32 {
    if quota == 0 {
        return 1.0;
    }
    let defeated = spawned.saturating_sub(alive as u32);
    (defeated as f32 / quota as f32).min(1.0)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
