/// Entity spawner: one enemy per scheduled tick until the level quota is met.

use rand::Rng;

use crate::domain::entity::{Enemy, EnemyClass, WaveMotion};
use crate::domain::rules;
use super::event::GameEvent;
use super::world::WorldState;

/// Spawn one enemy if the quota allows it and the schedule says so.
/// Returns true when an enemy was added.
pub fn tick_spawner(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) -> bool {
    if !world.spawn_pending() || now_ms < world.next_spawn_ms {
        return false;
    }

    let enemy = roll_enemy(&mut world.rng, world.level, world.graphics_tier, world.play.width);
    events.push(GameEvent::EnemySpawned { class: enemy.class, x: enemy.x });
    world.enemies.push(enemy);
    world.spawned += 1;
    world.next_spawn_ms = now_ms + world.play.spawn_interval_ms;
    true
}

/// Roll a new enemy's attributes for the given level and graphics tier.
pub fn roll_enemy<R: Rng>(rng: &mut R, level: u32, graphics_tier: u8, play_width: f32) -> Enemy {
    let fast = rng.gen_bool(rules::fast_chance(level));
    let weaving = rules::wave_allowed(graphics_tier, fast)
        && rng.gen_bool(rules::wave_chance(level));

    let size = rules::enemy_size(fast);
    let x = rng.gen_range(0.0..(play_width - size).max(1.0));
    let spin = (rng.gen::<f32>() - 0.5) * rules::spin_range(fast);

    let wave = if weaving {
        Some(WaveMotion {
            amplitude: rules::WAVE_AMPLITUDE_MIN + rng.gen::<f32>() * rules::WAVE_AMPLITUDE_SPAN,
            frequency: rules::WAVE_FREQUENCY_MIN + rng.gen::<f32>() * rules::WAVE_FREQUENCY_SPAN,
            distance: 0.0,
            initial_x: x,
        })
    } else {
        None
    };

    let class = match (fast, weaving) {
        (_, true) => EnemyClass::Weaving,
        (true, false) => EnemyClass::Fast,
        (false, false) => EnemyClass::Plain,
    };

    Enemy {
        x,
        y: rules::SPAWN_Y,
        width: size,
        height: size,
        speed: rules::enemy_speed(level, fast),
        angle: 0.0,
        spin,
        class,
        wave,
        exit: None,
    }
}
