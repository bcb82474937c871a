/// Progression state machine.
///
/// ```text
///   Playing ──wave cleared──▶ LevelUpgrade ──upgrade──▶ Playing
///      │
///      └──lives reach 0──▶ GameOverSequence ──all enemies gone──▶ GameOverFinal
///                                                                    │
///   Playing ◀───────────────────────restart───────────────────────────┘
/// ```
///
/// Every phase change goes through `advance`. A trigger that does not apply
/// to the current phase (or whose guard fails) is ignored and yields `None`.

use rand::Rng;

use crate::domain::entity::{ExitVelocity, Upgrade};
use crate::domain::rules;
use super::event::GameEvent;
use super::world::{Phase, WorldState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Trigger {
    /// Checked every Playing frame; fires once the quota is spawned and dead.
    WaveCleared,
    UpgradeChosen(Upgrade),
    /// A collision took the last life.
    PlayerDestroyed,
    /// Checked every GameOverSequence frame; fires once no enemy is left.
    FlyOffComplete,
    Restart,
}

/// Apply a trigger to the world. Returns the event describing the
/// transition, or `None` when nothing changed.
pub fn advance(world: &mut WorldState, trigger: Trigger, now_ms: u64) -> Option<GameEvent> {
    match (world.phase, trigger) {
        (Phase::Playing, Trigger::WaveCleared) if world.wave_cleared() => {
            world.phase = Phase::LevelUpgrade;
            Some(GameEvent::LevelCleared { level: world.level, score: world.score })
        }
        (Phase::LevelUpgrade, Trigger::UpgradeChosen(upgrade)) => {
            if !upgrade_player(world, upgrade) {
                return None;
            }
            start_next_level(world, now_ms);
            Some(GameEvent::UpgradeApplied { upgrade, level: world.level })
        }
        (Phase::Playing, Trigger::PlayerDestroyed) if world.player.lives == 0 => {
            world.phase = Phase::GameOverSequence;
            world.player.destroyed = true;
            launch_survivors(world);
            Some(GameEvent::PlayerDestroyed)
        }
        (Phase::GameOverSequence, Trigger::FlyOffComplete) if world.enemies.is_empty() => {
            world.phase = Phase::GameOverFinal;
            Some(GameEvent::GameOver { score: world.score, level: world.level })
        }
        (Phase::GameOverFinal, Trigger::Restart) => {
            world.reset(now_ms);
            Some(GameEvent::Restarted)
        }
        _ => None,
    }
}

/// Upgrade selection from the between-wave menu.
pub fn apply_upgrade(world: &mut WorldState, upgrade: Upgrade, now_ms: u64) -> Option<GameEvent> {
    advance(world, Trigger::UpgradeChosen(upgrade), now_ms)
}

/// Can this upgrade still be taken? Capped upgrades stay on the menu
/// but do nothing.
pub fn upgrade_available(world: &WorldState, upgrade: Upgrade) -> bool {
    match upgrade {
        Upgrade::Speed => true,
        Upgrade::Gun => world.player.gun_tier < rules::MAX_GUN_TIER,
        Upgrade::Graphics => world.graphics_tier < rules::MAX_GRAPHICS_TIER,
    }
}

// ── Transition effects ──

fn upgrade_player(world: &mut WorldState, upgrade: Upgrade) -> bool {
    if !upgrade_available(world, upgrade) {
        return false;
    }
    match upgrade {
        Upgrade::Speed => world.player.speed += 1.0,
        Upgrade::Gun => {
            let p = &mut world.player;
            p.gun_tier += 1;
            p.fire_rate_ms = rules::fire_rate_after_upgrade(p.fire_rate_ms, p.gun_tier);
        }
        Upgrade::Graphics => world.graphics_tier += 1,
    }
    true
}

fn start_next_level(world: &mut WorldState, now_ms: u64) {
    world.level += 1;
    world.quota += world.play.quota_step;
    world.spawned = 0;
    world.next_spawn_ms = now_ms;
    world.enemies.clear();
    world.bullets.clear();
    world.phase = Phase::Playing;
}

/// Give every surviving enemy a random outward/upward fly-off.
fn launch_survivors(world: &mut WorldState) {
    let rng = &mut world.rng;
    for e in world.enemies.iter_mut() {
        e.exit = Some(ExitVelocity {
            vx: (rng.gen::<f32>() - 0.5) * 10.0,
            vy: -rng.gen::<f32>() * 5.0 - 3.0,
            spin: (rng.gen::<f32>() - 0.5) * 0.2,
        });
        e.angle = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayConfig;
    use crate::domain::entity::Bullet;
    use crate::sim::spawn::roll_enemy;

    fn world() -> WorldState {
        WorldState::new(PlayConfig::default(), Some(21))
    }

    fn in_upgrade_menu() -> WorldState {
        let mut w = world();
        w.spawned = w.quota;
        assert!(advance(&mut w, Trigger::WaveCleared, 0).is_some());
        assert_eq!(w.phase, Phase::LevelUpgrade);
        w
    }

    #[test]
    fn wave_cleared_requires_full_quota_and_no_enemies() {
        let mut w = world();
        w.spawned = w.quota - 1;
        assert_eq!(advance(&mut w, Trigger::WaveCleared, 0), None);

        w.spawned = w.quota;
        let e = roll_enemy(&mut w.rng, 1, 1, 800.0);
        w.enemies.push(e);
        assert_eq!(advance(&mut w, Trigger::WaveCleared, 0), None);
        assert_eq!(w.phase, Phase::Playing);

        w.enemies.clear();
        w.score = 150;
        assert_eq!(
            advance(&mut w, Trigger::WaveCleared, 0),
            Some(GameEvent::LevelCleared { level: 1, score: 150 }),
        );
        assert_eq!(w.phase, Phase::LevelUpgrade);
    }

    #[test]
    fn upgrade_starts_next_level() {
        let mut w = in_upgrade_menu();
        w.bullets.push(Bullet { x: 1.0, y: 1.0 });
        let ev = apply_upgrade(&mut w, Upgrade::Speed, 5000);
        assert_eq!(ev, Some(GameEvent::UpgradeApplied { upgrade: Upgrade::Speed, level: 2 }));
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.speed, 4.0);
        assert_eq!(w.level, 2);
        assert_eq!(w.quota, 20);
        assert_eq!(w.spawned, 0);
        assert_eq!(w.next_spawn_ms, 5000);
        assert!(w.bullets.is_empty());
    }

    #[test]
    fn upgrade_outside_menu_is_ignored() {
        let mut w = world();
        assert_eq!(apply_upgrade(&mut w, Upgrade::Gun, 0), None);
        assert_eq!(w.player.gun_tier, 1);
        assert_eq!(w.level, 1);
    }

    #[test]
    fn gun_upgrades_speed_up_fire_then_cap() {
        let mut w = in_upgrade_menu();
        let expected = [(2, 450), (3, 405), (4, 405)];
        for (tier, rate) in expected {
            assert!(apply_upgrade(&mut w, Upgrade::Gun, 0).is_some());
            assert_eq!(w.player.gun_tier, tier);
            assert_eq!(w.player.fire_rate_ms, rate);
            w.spawned = w.quota;
            advance(&mut w, Trigger::WaveCleared, 0);
        }
        // Maxed: no-op, menu stays open.
        let level = w.level;
        assert_eq!(apply_upgrade(&mut w, Upgrade::Gun, 0), None);
        assert_eq!(w.player.gun_tier, 4);
        assert_eq!(w.phase, Phase::LevelUpgrade);
        assert_eq!(w.level, level);
    }

    #[test]
    fn graphics_upgrade_increments_once_and_caps_at_three() {
        let mut w = in_upgrade_menu();
        assert!(apply_upgrade(&mut w, Upgrade::Graphics, 0).is_some());
        assert_eq!(w.graphics_tier, 2);
        w.spawned = w.quota;
        advance(&mut w, Trigger::WaveCleared, 0);
        assert!(apply_upgrade(&mut w, Upgrade::Graphics, 0).is_some());
        assert_eq!(w.graphics_tier, 3);
        w.spawned = w.quota;
        advance(&mut w, Trigger::WaveCleared, 0);
        assert_eq!(apply_upgrade(&mut w, Upgrade::Graphics, 0), None);
        assert_eq!(w.graphics_tier, 3);
        assert_eq!(w.phase, Phase::LevelUpgrade);
    }

    #[test]
    fn destruction_needs_zero_lives() {
        let mut w = world();
        assert_eq!(advance(&mut w, Trigger::PlayerDestroyed, 0), None);
        w.player.lives = 0;
        assert_eq!(advance(&mut w, Trigger::PlayerDestroyed, 0), Some(GameEvent::PlayerDestroyed));
        assert_eq!(w.phase, Phase::GameOverSequence);
        assert!(w.player.destroyed);
    }

    #[test]
    fn survivors_get_exit_velocities() {
        let mut w = world();
        for _ in 0..5 {
            let mut e = roll_enemy(&mut w.rng, 1, 3, 800.0);
            e.angle = 1.0;
            w.enemies.push(e);
        }
        w.player.lives = 0;
        advance(&mut w, Trigger::PlayerDestroyed, 0);
        for e in &w.enemies {
            let exit = e.exit.expect("exit velocity assigned");
            assert!(exit.vx.abs() <= 5.0);
            assert!(exit.vy <= -3.0 && exit.vy >= -8.0);
            assert!(exit.spin.abs() <= 0.1);
            assert_eq!(e.angle, 0.0);
        }
    }

    #[test]
    fn fly_off_complete_then_restart() {
        let mut w = world();
        w.player.lives = 0;
        w.enemies.push(roll_enemy(&mut w.rng, 1, 1, 800.0));
        advance(&mut w, Trigger::PlayerDestroyed, 0);
        assert_eq!(advance(&mut w, Trigger::FlyOffComplete, 0), None);
        w.enemies.clear();
        w.score = 70;
        assert_eq!(
            advance(&mut w, Trigger::FlyOffComplete, 0),
            Some(GameEvent::GameOver { score: 70, level: 1 }),
        );
        assert_eq!(w.phase, Phase::GameOverFinal);

        // Terminal for everything but restart.
        assert_eq!(advance(&mut w, Trigger::WaveCleared, 0), None);
        assert_eq!(apply_upgrade(&mut w, Upgrade::Speed, 0), None);
        assert_eq!(advance(&mut w, Trigger::Restart, 100), Some(GameEvent::Restarted));
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.lives, 3);
        assert_eq!(w.score, 0);
    }

    #[test]
    fn restart_only_from_final() {
        let mut w = world();
        w.score = 30;
        assert_eq!(advance(&mut w, Trigger::Restart, 0), None);
        assert_eq!(w.score, 30);
    }
}
