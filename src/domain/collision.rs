/// Overlap queries.
///
/// Boxes are centered (center + half extents). Bullets and enemy centers are
/// tested as points against a box, with strict inequalities: a point exactly
/// on an edge does not hit.
///
/// Detection is pure and separate from removal. Callers get the full list of
/// matched pairs for a frame and apply removals as one batch, so the result
/// does not depend on what was removed earlier in the same scan.

use crate::domain::entity::{Bullet, Enemy};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub cx: f32,
    pub cy: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Aabb { cx, cy, half_w: width / 2.0, half_h: height / 2.0 }
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.cx - self.half_w
            && x < self.cx + self.half_w
            && y > self.cy - self.half_h
            && y < self.cy + self.half_h
    }
}

/// A bullet/enemy pair that met this frame (indices into the input slices).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub bullet: usize,
    pub enemy: usize,
}

/// Pair bullets with enemies. Bullets are scanned in order; each takes the
/// first enemy (in order) it overlaps that no earlier bullet has claimed.
/// Every bullet and every enemy appears in at most one pair.
pub fn bullet_hits(bullets: &[Bullet], enemies: &[Enemy]) -> Vec<Hit> {
    let mut claimed = vec![false; enemies.len()];
    let mut hits = Vec::new();

    for (bi, b) in bullets.iter().enumerate() {
        let found = enemies.iter().enumerate().find(|(ei, e)| {
            !claimed[*ei] && e.hitbox().contains(b.x, b.y)
        });
        if let Some((ei, _)) = found {
            claimed[ei] = true;
            hits.push(Hit { bullet: bi, enemy: ei });
        }
    }
    hits
}

/// Indices of enemies whose center lies inside `target`, in order.
pub fn enemies_touching(target: &Aabb, enemies: &[Enemy]) -> Vec<usize> {
    enemies.iter()
        .enumerate()
        .filter(|(_, e)| target.contains(e.x, e.y))
        .map(|(i, _)| i)
        .collect()
}

/// Keep only the items whose index is not marked.
pub fn remove_marked<T>(items: &mut Vec<T>, marked: &[bool]) {
    let mut idx = 0;
    items.retain(|_| {
        let keep = !marked.get(idx).copied().unwrap_or(false);
        idx += 1;
        keep
    });
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
