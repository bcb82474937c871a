/// Per-tier drawing descriptors.
///
/// Everything the renderer needs to know about how an entity looks at a
/// given graphics tier, as pure functions. The renderer does the placing,
/// this module decides glyphs, colors and particle counts.
///
/// ┌──────┬──────────────┬────────────────────┬────────────┬───────────────┐
/// │ Tier │ Ship         │ Enemies            │ Bullets    │ Explosions    │
/// ├──────┼──────────────┼────────────────────┼────────────┼───────────────┤
/// │ 1    │ plain, white │ two-tone blocks    │ thin bar   │ none          │
/// │ 2    │ colored      │ rotating wedges    │ bright bar │ 6 sparks      │
/// │ 3    │ + thruster   │ per-class colors   │ + trail    │ 12, fading    │
/// └──────┴──────────────┴────────────────────┴────────────┴───────────────┘
///
/// Final blasts (the hit that cost a life) get twice the sparks.

use std::f32::consts::TAU;

use crossterm::style::Color;

use crate::domain::entity::EnemyClass;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub fg: Color,
}

impl Glyph {
    const fn new(ch: char, fg: Color) -> Self {
        Glyph { ch, fg }
    }
}

// ── Shared colors ──

pub const HUD_TEXT: Color = Color::White;
pub const HUD_DIM: Color = Color::Rgb { r: 120, g: 120, b: 140 };
pub const PROGRESS_FILL: Color = Color::Rgb { r: 218, g: 165, b: 32 };
pub const PROGRESS_EMPTY: Color = Color::Rgb { r: 50, g: 50, b: 70 };
pub const OVERLAY_BG: Color = Color::Rgb { r: 35, g: 35, b: 55 };
pub const BUTTON_BG: Color = Color::Rgb { r: 60, g: 60, b: 100 };
pub const BUTTON_HOVER_BG: Color = Color::Rgb { r: 90, g: 90, b: 160 };
pub const BUTTON_MAXED_BG: Color = Color::Rgb { r: 50, g: 50, b: 50 };
pub const TITLE: Color = Color::Rgb { r: 255, g: 220, b: 50 };
pub const ALERT: Color = Color::Rgb { r: 255, g: 60, b: 60 };
pub const ACCEPT: Color = Color::Rgb { r: 80, g: 255, b: 80 };

// ══════════════════════════════════════════════════════════════
// Player ship
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShipLook {
    pub hull: &'static str,
    pub fg: Color,
    /// Thruster flame drawn under the hull; flickers between the two.
    pub flame: Option<[Glyph; 2]>,
}

pub fn ship(tier: u8) -> ShipLook {
    match tier {
        0 | 1 => ShipLook { hull: "/^\\", fg: Color::White, flame: None },
        2 => ShipLook { hull: "/▲\\", fg: Color::Rgb { r: 0, g: 200, b: 255 }, flame: None },
        _ => ShipLook {
            hull: "◢▲◣",
            fg: Color::Rgb { r: 120, g: 230, b: 255 },
            flame: Some([
                Glyph::new('▾', Color::Rgb { r: 255, g: 160, b: 0 }),
                Glyph::new('▿', Color::Rgb { r: 255, g: 90, b: 0 }),
            ]),
        },
    }
}

/// Small ship used for the lives counter.
pub const LIFE_ICON: Glyph = Glyph::new('▲', Color::Rgb { r: 0, g: 200, b: 255 });

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

const WEDGES: [char; 4] = ['◢', '◣', '◤', '◥'];
const DISCS: [char; 4] = ['◐', '◓', '◑', '◒'];

/// Which of `n` rotation frames an angle falls into.
fn rotation_frame(angle: f32, n: usize) -> usize {
    let turn = angle.rem_euclid(TAU) / TAU;
    ((turn * n as f32) as usize).min(n - 1)
}

pub fn enemy(class: EnemyClass, angle: f32, tier: u8) -> Glyph {
    match tier {
        0 | 1 => {
            let fg = if class.is_fast() {
                Color::Rgb { r: 255, g: 102, b: 102 }
            } else {
                Color::Rgb { r: 220, g: 40, b: 40 }
            };
            Glyph::new('■', fg)
        }
        2 => {
            let fg = if class.is_fast() {
                Color::Rgb { r: 255, g: 140, b: 0 }
            } else {
                Color::Rgb { r: 230, g: 50, b: 50 }
            };
            Glyph::new(WEDGES[rotation_frame(angle, WEDGES.len())], fg)
        }
        _ => {
            let fg = match class {
                EnemyClass::Plain => Color::Rgb { r: 255, g: 70, b: 70 },
                EnemyClass::Fast => Color::Rgb { r: 255, g: 170, b: 30 },
                EnemyClass::Weaving => Color::Rgb { r: 220, g: 90, b: 255 },
            };
            Glyph::new(DISCS[rotation_frame(angle, DISCS.len())], fg)
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Bullets
// ══════════════════════════════════════════════════════════════

pub fn bullet(tier: u8) -> Glyph {
    match tier {
        0 | 1 => Glyph::new('|', Color::Yellow),
        2 => Glyph::new('│', Color::Rgb { r: 255, g: 255, b: 80 }),
        _ => Glyph::new('┃', Color::Rgb { r: 255, g: 255, b: 190 }),
    }
}

/// Glow left one row below the bullet.
pub fn bullet_trail(tier: u8) -> Option<Glyph> {
    if tier >= 3 {
        Some(Glyph::new('·', Color::Rgb { r: 255, g: 190, b: 0 }))
    } else {
        None
    }
}

// ══════════════════════════════════════════════════════════════
// Explosions
// ══════════════════════════════════════════════════════════════

pub fn explosion_particles(tier: u8, is_final: bool) -> usize {
    let base = match tier {
        0 | 1 => 0,
        2 => 6,
        _ => 12,
    };
    if is_final { base * 2 } else { base }
}

/// Spark glyph for an explosion at `intensity` (1.0 fresh, 0.0 spent).
pub fn spark(tier: u8, intensity: f32) -> Glyph {
    let ch = if intensity > 0.66 {
        '*'
    } else if intensity > 0.33 {
        '+'
    } else {
        '·'
    };
    let fg = if tier >= 3 {
        // white-hot → yellow → red
        let g = (60.0 + 195.0 * intensity) as u8;
        let b = (255.0 * (intensity - 0.6).max(0.0) / 0.4) as u8;
        Color::Rgb { r: 255, g, b }
    } else {
        Color::Rgb { r: 255, g: (40.0 + 120.0 * intensity) as u8, b: 0 }
    };
    Glyph::new(ch, fg)
}

/// Offset of spark `i` of `n` from the blast center, in play-area pixels.
/// Sparks sit evenly on a ring that grows as the blast ages.
pub fn spark_offset(i: usize, n: usize, intensity: f32, scale: f32) -> (f32, f32) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let theta = i as f32 / n as f32 * TAU;
    let radius = (4.0 + 26.0 * (1.0 - intensity)) * scale;
    (theta.cos() * radius, theta.sin() * radius)
}

// ══════════════════════════════════════════════════════════════
// Background
// ══════════════════════════════════════════════════════════════

/// Star brightness 0.0..=1.0 to glyph.
pub fn star(brightness: f32) -> Glyph {
    let v = (70.0 + 185.0 * brightness.clamp(0.0, 1.0)) as u8;
    let ch = if brightness > 0.8 { '+' } else if brightness > 0.4 { '·' } else { '.' };
    Glyph::new(ch, Color::Rgb { r: v, g: v, b: v.saturating_add(20) })
}
