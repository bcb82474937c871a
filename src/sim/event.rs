/// Events emitted during a simulation step.
/// The driver consumes these for logging; tests use them to observe transitions.

use crate::domain::entity::{EnemyClass, Upgrade};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    EnemySpawned { class: EnemyClass, x: f32 },
    EnemyDestroyed { class: EnemyClass, points: u32 },
    EnemyEscaped,
    ShotFired { bullets: usize },
    PlayerHit { lives_left: u32 },
    LevelCleared { level: u32, score: u32 },
    UpgradeApplied { upgrade: Upgrade, level: u32 },
    PlayerDestroyed,
    GameOver { score: u32, level: u32 },
    Restarted,
}
