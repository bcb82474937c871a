/// Entities: Player, Bullet, Enemy, Explosion.
/// Positions are entity centers in play-area pixels; y grows downward.

use crate::config::PlayConfig;
use crate::domain::collision::Aabb;

pub const PLAYER_WIDTH: f32 = 20.0;
pub const PLAYER_HEIGHT: f32 = 30.0;
/// Distance of the ship's center above the bottom edge.
pub const PLAYER_BOTTOM_OFFSET: f32 = 50.0;

/// Frame input: what the driver observed on the input devices this frame.
/// `now_ms` is the driver clock, milliseconds since the run started.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub now_ms: u64,
}

/// The three choices offered between waves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Upgrade {
    Speed,
    Gun,
    Graphics,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub lives: u32,
    pub fire_rate_ms: u64,
    pub last_shot_ms: Option<u64>,
    pub gun_tier: u8,
    pub destroyed: bool,
}

impl Player {
    pub fn new(play: &PlayConfig) -> Self {
        Player {
            x: play.width / 2.0,
            y: play.height - PLAYER_BOTTOM_OFFSET,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            speed: play.player_speed,
            lives: play.initial_lives,
            fire_rate_ms: play.fire_rate_ms,
            last_shot_ms: None,
            gun_tier: 1,
            destroyed: false,
        }
    }

    pub fn hitbox(&self) -> Aabb {
        Aabb::centered(self.x, self.y, self.width, self.height)
    }

    /// Muzzle position: the tip of the ship.
    pub fn nose(&self) -> (f32, f32) {
        (self.x, self.y - self.height / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
}

/// Enemy classification, which also fixes its point value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyClass {
    Plain,
    Fast,
    /// Fast enemy that also drifts sideways on a sine wave.
    Weaving,
}

impl EnemyClass {
    pub fn points(self) -> u32 {
        match self {
            EnemyClass::Plain => 10,
            EnemyClass::Fast => 20,
            EnemyClass::Weaving => 30,
        }
    }

    pub fn is_fast(self) -> bool {
        !matches!(self, EnemyClass::Plain)
    }
}

/// Sinusoidal horizontal drift, a function of vertical distance traveled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveMotion {
    pub amplitude: f32,
    pub frequency: f32,
    pub distance: f32,
    pub initial_x: f32,
}

/// Fly-off velocity assigned to every surviving enemy when the run ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExitVelocity {
    pub vx: f32,
    pub vy: f32,
    pub spin: f32,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    /// Radians; only advanced at graphics tier 2+.
    pub angle: f32,
    pub spin: f32,
    pub class: EnemyClass,
    pub wave: Option<WaveMotion>,
    pub exit: Option<ExitVelocity>,
}

impl Enemy {
    pub fn hitbox(&self) -> Aabb {
        Aabb::centered(self.x, self.y, self.width, self.height)
    }

    pub fn points(&self) -> u32 {
        self.class.points()
    }
}

/// Ephemeral effect spawned by collisions. Rendering only.
#[derive(Clone, Debug, PartialEq)]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    pub frame: u32,
    pub max_frames: u32,
    pub is_final: bool,
    pub scale: f32,
}

impl Explosion {
    pub fn new(x: f32, y: f32, max_frames: u32) -> Self {
        Explosion { x, y, frame: 0, max_frames, is_final: false, scale: 1.0 }
    }

    /// The big one: the hit that cost the player a life.
    pub fn final_blast(x: f32, y: f32, max_frames: u32) -> Self {
        Explosion { x, y, frame: 0, max_frames, is_final: true, scale: 2.0 }
    }

    pub fn tick(&mut self) {
        self.frame += 1;
    }

    pub fn expired(&self) -> bool {
        self.frame > self.max_frames
    }

    /// 1.0 when fresh, fading to 0.0 at the end of its budget.
    pub fn intensity(&self) -> f32 {
        if self.max_frames == 0 {
            return 0.0;
        }
        (1.0 - self.frame as f32 / self.max_frames as f32).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_starts_centered_above_bottom() {
        let play = PlayConfig::default();
        let p = Player::new(&play);
        assert_eq!(p.x, 400.0);
        assert_eq!(p.y, 550.0);
        assert_eq!(p.lives, 3);
        assert_eq!(p.gun_tier, 1);
        assert_eq!(p.last_shot_ms, None);
        assert_eq!(p.nose(), (400.0, 535.0));
    }

    #[test]
    fn point_values_by_class() {
        assert_eq!(EnemyClass::Plain.points(), 10);
        assert_eq!(EnemyClass::Fast.points(), 20);
        assert_eq!(EnemyClass::Weaving.points(), 30);
        assert!(!EnemyClass::Plain.is_fast());
        assert!(EnemyClass::Weaving.is_fast());
    }

    #[test]
    fn explosion_lifecycle() {
        let mut e = Explosion::new(10.0, 10.0, 3);
        for _ in 0..3 { e.tick(); }
        assert!(!e.expired()); // frame == budget is still shown
        assert!((e.intensity() - 0.0).abs() < 1e-6);
        e.tick();
        assert!(e.expired());
    }

    #[test]
    fn final_blast_is_scaled() {
        let e = Explosion::final_blast(0.0, 0.0, 40);
        assert!(e.is_final);
        assert_eq!(e.scale, 2.0);
        assert!((e.intensity() - 1.0).abs() < 1e-6);
    }
}
