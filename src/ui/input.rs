/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement and fire while a key is held
///   - Edge-triggered menu keys (only fire on initial press)
///   - Simultaneous movement + fire in the same frame
///
/// Also follows the mouse: last pointer cell and the left clicks of the
/// frame. Clicks are resolved against `Clickables`, the regions the
/// renderer registered while drawing the previous frame.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,

    /// Last known pointer cell (column, row).
    pub pointer: Option<(u16, u16)>,

    /// Left-button presses this frame, oldest first.
    clicks: Vec<(u16, u16)>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
            pointer: None,
            clicks: Vec::with_capacity(2),
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.clicks.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.on_key(key, Instant::now()),
                Ok(Event::Mouse(mouse)) => self.on_mouse(mouse),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn on_key(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // Not trusted without enhancement; timeout expiry handles it
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let cell = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.pointer = Some(cell);
                self.clicks.push(cell);
            }
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                self.pointer = Some(cell);
            }
            _ => {}
        }
    }

    /// Is this key currently held down?
    /// Used for continuous actions (movement, fire).
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Convenience: is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Consume this frame's clicks; returns the action of the first one
    /// that lands on a registered region.
    pub fn take_click_action<A: Copy>(&mut self, targets: &Clickables<A>) -> Option<A> {
        self.clicks.drain(..).find_map(|(col, row)| targets.hit(col, row))
    }
}

// ── Click regions ──

/// Screen rectangle (terminal cells) bound to an action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickRegion<A> {
    pub col: u16,
    pub row: u16,
    pub width: u16,
    pub height: u16,
    pub action: A,
}

impl<A> ClickRegion<A> {
    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.col
            && row >= self.row
            && (col - self.col) < self.width
            && (row - self.row) < self.height
    }
}

/// Regions registered during a render pass. Cleared at the start of each
/// pass so stale buttons never catch a click.
#[derive(Debug)]
pub struct Clickables<A> {
    regions: Vec<ClickRegion<A>>,
}

impl<A: Copy> Clickables<A> {
    pub fn new() -> Self {
        Clickables { regions: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn register(&mut self, region: ClickRegion<A>) {
        self.regions.push(region);
    }

    /// Topmost (last registered) region under the cell.
    pub fn hit(&self, col: u16, row: u16) -> Option<A> {
        self.regions.iter().rev()
            .find(|r| r.contains(col, row))
            .map(|r| r.action)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
