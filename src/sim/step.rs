/// The step function: advances the world by one frame.
///
/// Processing order while Playing:
///   1. Spawn (at most one enemy, on schedule)
///   2. Player movement
///   3. Firing
///   4. Bullet movement
///   5. Enemy movement (fall, spin, wave drift)
///   6. Bullet–enemy hits
///   7. Enemy–player hits (may end the run)
///   8. Wave-cleared check
///
/// GameOverSequence runs only the fly-off and bullet drift.
/// LevelUpgrade and GameOverFinal run nothing but effect aging.

use std::f32::consts::TAU;

use crate::domain::collision::{self, Hit};
use crate::domain::entity::{Bullet, Explosion, FrameInput};
use crate::domain::rules;
use super::event::GameEvent;
use super::progression::{self, Trigger};
use super::spawn;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.frame += 1;
    world.tick_message();
    age_explosions(world);

    match world.phase {
        Phase::Playing => play_frame(world, input, &mut events),
        Phase::GameOverSequence => fly_off_frame(world, input.now_ms, &mut events),
        Phase::LevelUpgrade | Phase::GameOverFinal => {}
    }

    events
}

fn play_frame(world: &mut WorldState, input: FrameInput, events: &mut Vec<GameEvent>) {
    spawn::tick_spawner(world, input.now_ms, events);
    resolve_player_movement(world, input);
    resolve_fire(world, input, events);
    resolve_bullets(world);
    resolve_enemies(world, events);
    resolve_bullet_hits(world, events);
    if resolve_player_hits(world, input.now_ms, events) { return; }
    events.extend(progression::advance(world, Trigger::WaveCleared, input.now_ms));
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, input: FrameInput) {
    let p = &mut world.player;
    let min_x = p.width / 2.0;
    let max_x = world.play.width - p.width / 2.0;

    if input.left && p.x > min_x { p.x -= p.speed; }
    if input.right && p.x < max_x { p.x += p.speed; }
    p.x = p.x.clamp(min_x, max_x);
}

fn resolve_fire(world: &mut WorldState, input: FrameInput, events: &mut Vec<GameEvent>) {
    if !input.fire { return; }
    let p = &mut world.player;
    if !rules::can_fire(p.last_shot_ms, input.now_ms, p.fire_rate_ms) { return; }

    let (nx, ny) = p.nose();
    let barrels = rules::barrel_offsets(p.gun_tier);
    world.bullets.extend(barrels.iter().map(|dx| Bullet { x: nx + dx, y: ny }));
    p.last_shot_ms = Some(input.now_ms);
    events.push(GameEvent::ShotFired { bullets: barrels.len() });
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// Bullets at or above the top edge are dropped, the rest climb.
fn resolve_bullets(world: &mut WorldState) {
    world.bullets.retain(|b| b.y > 0.0);
    for b in world.bullets.iter_mut() {
        b.y -= rules::BULLET_STEP;
    }
}

fn resolve_enemies(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let spinning = world.graphics_tier >= 2;
    let play_w = world.play.width;

    for e in world.enemies.iter_mut() {
        e.y += e.speed;
        if spinning {
            e.angle = (e.angle + e.spin) % TAU;
        }
        if let Some(wave) = e.wave.as_mut() {
            wave.distance += e.speed;
            e.x = rules::wave_x(wave.initial_x, wave.distance, wave.frequency, wave.amplitude, e.width, play_w);
        }
    }

    let floor = world.play.height;
    let before = world.enemies.len();
    world.enemies.retain(|e| e.y < floor + e.height);
    for _ in world.enemies.len()..before {
        events.push(GameEvent::EnemyEscaped);
    }
}

// ══════════════════════════════════════════════════════════════
// Collisions: detect all pairs, then remove as a batch
// ══════════════════════════════════════════════════════════════

fn resolve_bullet_hits(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let hits = collision::bullet_hits(&world.bullets, &world.enemies);
    if hits.is_empty() { return; }

    let mut dead_bullets = vec![false; world.bullets.len()];
    let mut dead_enemies = vec![false; world.enemies.len()];
    let budget = rules::explosion_budget(world.graphics_tier, false);

    for Hit { bullet, enemy } in hits {
        dead_bullets[bullet] = true;
        dead_enemies[enemy] = true;
        let e = &world.enemies[enemy];
        world.score += e.points();
        world.explosions.push(Explosion::new(e.x, e.y, budget));
        events.push(GameEvent::EnemyDestroyed { class: e.class, points: e.points() });
    }

    collision::remove_marked(&mut world.bullets, &dead_bullets);
    collision::remove_marked(&mut world.enemies, &dead_enemies);
}

/// Returns true when the run ended this frame.
fn resolve_player_hits(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) -> bool {
    let touching = collision::enemies_touching(&world.player.hitbox(), &world.enemies);
    if touching.is_empty() { return false; }

    let mut dead = vec![false; world.enemies.len()];
    let budget = rules::explosion_budget(world.graphics_tier, true);

    for idx in touching {
        if world.player.lives == 0 { break; }
        dead[idx] = true;
        world.player.lives -= 1;
        world.explosions.push(Explosion::final_blast(world.player.x, world.player.y, budget));
        events.push(GameEvent::PlayerHit { lives_left: world.player.lives });
    }
    collision::remove_marked(&mut world.enemies, &dead);

    match progression::advance(world, Trigger::PlayerDestroyed, now_ms) {
        Some(ev) => {
            events.push(ev);
            true
        }
        None => false,
    }
}

// ══════════════════════════════════════════════════════════════
// Game-over fly-off
// ══════════════════════════════════════════════════════════════

fn fly_off_frame(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) {
    for e in world.enemies.iter_mut() {
        if let Some(exit) = e.exit.as_mut() {
            e.x += exit.vx;
            e.y += exit.vy - rules::EXIT_LIFT;
            exit.vy += rules::EXIT_GRAVITY;
            e.angle += exit.spin;
        }
    }

    let (w, h) = (world.play.width, world.play.height);
    world.enemies.retain(|e| rules::within_exit_bounds(e.x, e.y, w, h));

    // Shots already in the air keep going.
    resolve_bullets(world);

    events.extend(progression::advance(world, Trigger::FlyOffComplete, now_ms));
}

// ══════════════════════════════════════════════════════════════
// Effects
// ══════════════════════════════════════════════════════════════

fn age_explosions(world: &mut WorldState) {
    for ex in world.explosions.iter_mut() {
        ex.tick();
    }
    world.explosions.retain(|ex| !ex.expired());
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayConfig;
    use crate::domain::entity::{Enemy, EnemyClass, Upgrade, WaveMotion};
    use proptest::prelude::*;

    const NEVER: u64 = u64::MAX / 2;

    fn world() -> WorldState {
        WorldState::new(PlayConfig::default(), Some(1234))
    }

    /// World with spawning switched off so tests place enemies by hand.
    fn quiet_world() -> WorldState {
        let mut w = world();
        w.next_spawn_ms = NEVER;
        w
    }

    fn input(now_ms: u64) -> FrameInput {
        FrameInput { now_ms, ..FrameInput::default() }
    }

    fn enemy_at(x: f32, y: f32) -> Enemy {
        Enemy {
            x, y,
            width: 20.0,
            height: 20.0,
            speed: 1.5,
            angle: 0.0,
            spin: 0.05,
            class: EnemyClass::Plain,
            wave: None,
            exit: None,
        }
    }

    // ── Player ──

    #[test]
    fn player_moves_and_clamps() {
        let mut w = quiet_world();
        step(&mut w, FrameInput { left: true, ..input(0) });
        assert_eq!(w.player.x, 397.0);

        w.player.x = 11.0;
        step(&mut w, FrameInput { left: true, ..input(16) });
        assert_eq!(w.player.x, 10.0);
        step(&mut w, FrameInput { left: true, ..input(32) });
        assert_eq!(w.player.x, 10.0);

        w.player.x = 789.0;
        step(&mut w, FrameInput { right: true, ..input(48) });
        assert_eq!(w.player.x, 790.0);
    }

    #[test]
    fn fire_emits_from_nose() {
        let mut w = quiet_world();
        let ev = step(&mut w, FrameInput { fire: true, ..input(0) });
        assert!(ev.contains(&GameEvent::ShotFired { bullets: 1 }));
        assert_eq!(w.bullets, vec![Bullet { x: 400.0, y: 530.0 }]); // nose 535, moved 5
        assert_eq!(w.player.last_shot_ms, Some(0));
    }

    #[test]
    fn held_fire_gives_one_shot_per_window() {
        let mut w = quiet_world();
        let mut shots = vec![];
        for t in 0..2000u64 {
            let ev = step(&mut w, FrameInput { fire: true, ..input(t) });
            if ev.iter().any(|e| matches!(e, GameEvent::ShotFired { .. })) {
                shots.push(t);
            }
        }
        assert_eq!(shots, vec![0, 500, 1000, 1500]);
    }

    #[test]
    fn max_gun_tier_fires_twin_bullets() {
        let mut w = quiet_world();
        w.player.gun_tier = 4;
        let ev = step(&mut w, FrameInput { fire: true, ..input(0) });
        assert!(ev.contains(&GameEvent::ShotFired { bullets: 2 }));
        let xs: Vec<f32> = w.bullets.iter().map(|b| b.x).collect();
        assert_eq!(xs, vec![395.0, 405.0]);
    }

    // ── Movement ──

    #[test]
    fn bullets_leave_through_the_top() {
        let mut w = quiet_world();
        w.bullets.push(Bullet { x: 10.0, y: 3.0 });
        w.bullets.push(Bullet { x: 20.0, y: 0.0 });
        step(&mut w, input(0));
        assert_eq!(w.bullets, vec![Bullet { x: 10.0, y: -2.0 }]);
        step(&mut w, input(16));
        assert!(w.bullets.is_empty());
    }

    #[test]
    fn enemies_fall_and_escape_at_bottom() {
        let mut w = quiet_world();
        w.enemies.push(enemy_at(100.0, 100.0));
        w.enemies.push(enemy_at(200.0, 619.0));
        let ev = step(&mut w, input(0));
        assert_eq!(w.enemies.len(), 1);
        assert_eq!(w.enemies[0].y, 101.5);
        assert!(ev.contains(&GameEvent::EnemyEscaped));
        assert_eq!(w.player.lives, 3);
    }

    #[test]
    fn rotation_only_from_tier_two() {
        let mut w = quiet_world();
        w.enemies.push(enemy_at(100.0, 100.0));
        step(&mut w, input(0));
        assert_eq!(w.enemies[0].angle, 0.0);
        w.graphics_tier = 2;
        step(&mut w, input(16));
        assert!((w.enemies[0].angle - 0.05).abs() < 1e-6);
    }

    #[test]
    fn wave_motion_is_clamped() {
        let mut w = quiet_world();
        let mut e = enemy_at(5.0, 100.0);
        e.width = 16.0;
        e.class = EnemyClass::Weaving;
        e.wave = Some(WaveMotion { amplitude: 50.0, frequency: 0.08, distance: 0.0, initial_x: 5.0 });
        w.enemies.push(e);
        for t in 0..200u64 {
            step(&mut w, input(t * 16));
            if let Some(e) = w.enemies.first() {
                assert!(e.x >= 16.0 && e.x <= 784.0);
            }
        }
    }

    // ── Collisions ──

    #[test]
    fn bullet_kills_enemy_and_scores() {
        let mut w = quiet_world();
        let mut e = enemy_at(300.0, 200.0);
        e.class = EnemyClass::Fast;
        w.enemies.push(e);
        w.bullets.push(Bullet { x: 300.0, y: 205.0 });
        let ev = step(&mut w, input(0));
        assert!(w.enemies.is_empty());
        assert!(w.bullets.is_empty());
        assert_eq!(w.score, 20);
        assert_eq!(w.explosions.len(), 1);
        assert_eq!(w.explosions[0].max_frames, 10);
        assert!(ev.contains(&GameEvent::EnemyDestroyed { class: EnemyClass::Fast, points: 20 }));
    }

    #[test]
    fn simultaneous_hits_resolve_as_batch() {
        let mut w = quiet_world();
        w.enemies.push(enemy_at(100.0, 200.0));
        w.enemies.push(enemy_at(104.0, 200.0));
        w.enemies.push(enemy_at(500.0, 200.0));
        w.bullets.push(Bullet { x: 102.0, y: 205.0 });
        w.bullets.push(Bullet { x: 102.0, y: 205.0 });
        w.bullets.push(Bullet { x: 500.0, y: 205.0 });
        step(&mut w, input(0));
        assert!(w.enemies.is_empty());
        assert!(w.bullets.is_empty());
        assert_eq!(w.score, 30);
    }

    #[test]
    fn enemy_reaching_player_costs_a_life() {
        let mut w = quiet_world();
        w.enemies.push(enemy_at(400.0, 548.0));
        let ev = step(&mut w, input(0));
        assert_eq!(w.player.lives, 2);
        assert!(w.enemies.is_empty());
        assert_eq!(w.phase, Phase::Playing);
        assert!(ev.contains(&GameEvent::PlayerHit { lives_left: 2 }));
        let blast = &w.explosions[0];
        assert!(blast.is_final);
        assert_eq!(blast.max_frames, 20);
        assert_eq!((blast.x, blast.y), (400.0, 550.0));
    }

    #[test]
    fn explosions_expire_after_budget() {
        let mut w = quiet_world();
        w.explosions.push(Explosion::new(0.0, 0.0, 2));
        step(&mut w, input(0));
        step(&mut w, input(16));
        assert_eq!(w.explosions.len(), 1);
        step(&mut w, input(32));
        assert!(w.explosions.is_empty());
    }

    // ── Scenarios ──

    #[test]
    fn clearing_first_wave_opens_upgrade_menu() {
        let mut w = world();
        let mut expected = 0u32;
        let mut t = 0u64;
        while w.phase == Phase::Playing && t < 100_000 {
            // Aim one bullet at every enemy that has come into view.
            let aimed: Vec<Bullet> = w.enemies.iter()
                .filter(|e| e.y > 50.0)
                .map(|e| Bullet { x: e.x, y: e.y + 5.0 })
                .collect();
            w.bullets.extend(aimed);

            for ev in step(&mut w, input(t)) {
                if let GameEvent::EnemyDestroyed { points, .. } = ev {
                    expected += points;
                }
            }
            t += 16;
        }
        assert_eq!(w.phase, Phase::LevelUpgrade);
        assert_eq!(w.spawned, 15);
        assert_eq!(w.score, expected);
        assert!(w.score >= 150);
        assert_eq!(w.player.lives, 3);

        // Nothing moves while the menu is up.
        let bullets = w.bullets.clone();
        step(&mut w, input(t));
        assert_eq!(w.bullets, bullets);
        assert_eq!(w.spawned, 15);
    }

    #[test]
    fn three_hits_end_the_run() {
        let mut w = quiet_world();
        let mut phases = vec![w.phase];
        let mut t = 0;

        for _ in 0..2 {
            w.enemies.push(enemy_at(400.0, 548.0));
            step(&mut w, input(t));
            t += 16;
        }
        assert_eq!(w.player.lives, 1);
        assert_eq!(w.phase, Phase::Playing);

        w.enemies.push(enemy_at(400.0, 548.0));
        w.enemies.push(enemy_at(100.0, 100.0)); // bystander, flies off
        let ev = step(&mut w, input(t));
        assert!(ev.contains(&GameEvent::PlayerDestroyed));
        assert_eq!(w.player.lives, 0);
        assert!(w.player.destroyed);
        assert_eq!(w.enemies.len(), 1);
        assert!(w.enemies[0].exit.is_some());
        phases.push(w.phase);

        let mut guard = 0;
        while w.phase != Phase::GameOverFinal && guard < 10_000 {
            t += 16;
            step(&mut w, input(t));
            assert_eq!(w.player.lives, 0);
            if phases.last() != Some(&w.phase) { phases.push(w.phase); }
            guard += 1;
        }
        assert_eq!(phases, vec![Phase::Playing, Phase::GameOverSequence, Phase::GameOverFinal]);

        // Terminal: nothing spawns, nothing scores.
        let score = w.score;
        for _ in 0..200 {
            t += 1000;
            step(&mut w, FrameInput { fire: true, ..input(t) });
        }
        assert!(w.enemies.is_empty());
        assert_eq!(w.score, score);
        assert_eq!(w.player.lives, 0);
    }

    #[test]
    fn last_life_ignores_further_overlaps() {
        let mut w = quiet_world();
        w.player.lives = 1;
        w.enemies.push(enemy_at(400.0, 548.0));
        w.enemies.push(enemy_at(401.0, 548.0));
        step(&mut w, input(0));
        assert_eq!(w.player.lives, 0);
        assert_eq!(w.phase, Phase::GameOverSequence);
        assert_eq!(w.enemies.len(), 1);
    }

    #[test]
    fn fly_off_applies_gravity_and_lift() {
        let mut w = quiet_world();
        let mut e = enemy_at(300.0, 300.0);
        e.exit = Some(crate::domain::entity::ExitVelocity { vx: 2.0, vy: -4.0, spin: 0.1 });
        w.enemies.push(e);
        w.phase = Phase::GameOverSequence;
        step(&mut w, input(0));
        let e = &w.enemies[0];
        assert_eq!(e.x, 302.0);
        assert_eq!(e.y, 293.0);
        assert!((e.exit.unwrap().vy - -3.8).abs() < 1e-6);
        assert!((e.angle - 0.1).abs() < 1e-6);
    }

    // ── Invariants over random play ──

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn invariants_hold_under_random_input(
            seed in any::<u64>(),
            inputs in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), 0u8..3), 300..900),
        ) {
            let mut w = WorldState::new(PlayConfig::default(), Some(seed));
            w.graphics_tier = 3;
            w.level = 8;
            let mut last_score = 0;
            let mut last_lives = w.player.lives;
            let mut last_gun = w.player.gun_tier;
            let mut last_tier = w.graphics_tier;

            for (i, (left, right, fire, pick)) in inputs.into_iter().enumerate() {
                let now = i as u64 * 16;
                if w.phase == Phase::LevelUpgrade {
                    let up = [Upgrade::Speed, Upgrade::Gun, Upgrade::Graphics][pick as usize];
                    if progression::apply_upgrade(&mut w, up, now).is_none() {
                        progression::apply_upgrade(&mut w, Upgrade::Speed, now);
                    }
                }
                step(&mut w, FrameInput { left, right, fire, now_ms: now });

                prop_assert!(w.player.lives <= 3);
                prop_assert!(w.player.lives <= last_lives);
                prop_assert!(w.score >= last_score);
                prop_assert!((1..=4).contains(&w.player.gun_tier));
                prop_assert!(w.player.gun_tier >= last_gun);
                prop_assert!((1..=3).contains(&w.graphics_tier));
                prop_assert!(w.graphics_tier >= last_tier);
                prop_assert!(w.spawned <= w.quota);
                if w.phase == Phase::Playing {
                    for e in w.enemies.iter().filter(|e| e.wave.is_some()) {
                        prop_assert!(e.x >= e.width && e.x <= 800.0 - e.width);
                    }
                }
                if matches!(w.phase, Phase::GameOverSequence | Phase::GameOverFinal) {
                    prop_assert_eq!(w.player.lives, 0);
                }
                last_score = w.score;
                last_lives = w.player.lives;
                last_gun = w.player.gun_tier;
                last_tier = w.graphics_tier;
            }
        }
    }
}
