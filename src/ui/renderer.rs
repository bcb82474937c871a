/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout (play area scaled to whatever the terminal offers):
///   row 0          Points / Level
///   rows 1..h-1    play area
///   row h-1        lives (left), wave progress (right)
///
/// The renderer only reads the world. The one thing it hands back is the
/// set of upgrade buttons it drew, for the input collector to hit-test.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::entity::Upgrade;
use crate::sim::progression;
use crate::sim::world::{Phase, WorldState};
use super::input::{ClickRegion, Clickables};
use super::palette::{self, Glyph};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell, never the terminal default, so
    /// the gaps between rows match the play area.
    const BASE_BG: Color = Color::Rgb { r: 8, g: 8, b: 20 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Draw a glyph over whatever background is already there.
    fn put_glyph(&mut self, x: usize, y: usize, g: Glyph) {
        let bg = self.get(x, y).bg;
        self.set(x, y, Cell { ch: g.ch, fg: g.fg, bg });
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }

    /// Horizontally centered string.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        self.put_str(self.width.saturating_sub(len) / 2, y, s, fg, bg);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, Cell { ch: ' ', fg: Color::White, bg });
            }
        }
    }
}

// ── Viewport: play-area pixels → terminal cells ──

const HUD_ROW: usize = 0;
const PLAY_ROW: usize = 1;

#[derive(Clone, Copy, Debug)]
struct Viewport {
    cols: usize,
    rows: usize,
    play_w: f32,
    play_h: f32,
}

impl Viewport {
    fn new(term_w: usize, term_h: usize, play_w: f32, play_h: f32) -> Self {
        Viewport {
            cols: term_w.max(1),
            rows: term_h.saturating_sub(2).max(1),
            play_w,
            play_h,
        }
    }

    /// Cell under a play-area point, or None when off screen.
    fn to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if x < 0.0 || y < 0.0 || x >= self.play_w || y >= self.play_h {
            return None;
        }
        let col = (x / self.play_w * self.cols as f32) as usize;
        let row = (y / self.play_h * self.rows as f32) as usize;
        Some((col.min(self.cols - 1), PLAY_ROW + row.min(self.rows - 1)))
    }

    /// Columns covered by a play-area width, at least one.
    fn span(&self, w: f32) -> usize {
        ((w / self.play_w * self.cols as f32).round() as usize).max(1)
    }

    fn bottom_row(&self) -> usize {
        PLAY_ROW + self.rows
    }
}

// ── Starfield ──

/// One star; position as a fraction of the play area.
struct Star {
    x: f32,
    y: f32,
    /// Fraction of the play height per frame; 0 for the twinkling layer.
    speed: f32,
    base: f32,
    phase: f32,
}

struct Starfield {
    stars: Vec<Star>,
    tick: u32,
}

const STARS_STILL: usize = 50;
const STARS_SLOW: usize = 25;
const STARS_FAST: usize = 10;

impl Starfield {
    fn new<R: Rng>(rng: &mut R) -> Self {
        let layers = [
            (STARS_STILL, 0.0, 0.9),
            (STARS_SLOW, 0.0008, 0.5),
            (STARS_FAST, 0.003, 0.8),
        ];
        let mut stars = Vec::with_capacity(STARS_STILL + STARS_SLOW + STARS_FAST);
        for (count, speed, max_base) in layers {
            for _ in 0..count {
                stars.push(Star {
                    x: rng.gen(),
                    y: rng.gen(),
                    speed,
                    base: rng.gen_range(0.2..=max_base),
                    phase: rng.gen_range(0.0..std::f32::consts::TAU),
                });
            }
        }
        Starfield { stars, tick: 0 }
    }

    fn advance(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        for s in self.stars.iter_mut() {
            s.y += s.speed;
            if s.y >= 1.0 { s.y -= 1.0; }
        }
    }

    fn brightness(&self, s: &Star) -> f32 {
        if s.speed == 0.0 {
            s.base * (0.6 + 0.4 * (self.tick as f32 * 0.08 + s.phase).sin())
        } else {
            s.base
        }
    }
}

// ── Upgrade menu layout ──

const BUTTON_W: usize = 18;
const BUTTON_H: usize = 3;
const BUTTON_GAP: usize = 2;
const MENU_W: usize = BUTTON_W * 3 + BUTTON_GAP * 2 + 4;
const MENU_H: usize = 9;

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    keyboard_enhanced: bool,
    stars: Starfield,
    buttons: Clickables<Upgrade>,
    /// Advances every frame, paused or not; drives overlay blinking.
    overlay_tick: u64,
    gamepad_connected: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            keyboard_enhanced: false,
            stars: Starfield::new(&mut StdRng::from_entropy()),
            buttons: Clickables::new(),
            overlay_tick: 0,
            gamepad_connected: false,
        }
    }

    /// Controller hints are shown only while a pad is attached.
    pub fn set_gamepad_connected(&mut self, connected: bool) {
        self.gamepad_connected = connected;
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        // Release events make held fire/movement exact; without them the
        // input collector falls back to its hold timeout.
        self.keyboard_enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if self.keyboard_enhanced {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    /// Upgrade buttons drawn in the last frame.
    pub fn buttons(&self) -> &Clickables<Upgrade> {
        &self.buttons
    }

    pub fn render(&mut self, world: &WorldState, pointer: Option<(u16, u16)>) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Detect phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world, pointer);

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, not ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        let mut utf8 = [0u8; 4];
        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(&*cell.ch.encode_utf8(&mut utf8)))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════════
    // Compose: build front buffer content
    // ══════════════════════════════════════════════════════════════

    fn compose(&mut self, w: &WorldState, pointer: Option<(u16, u16)>) {
        self.front.clear();
        self.buttons.clear();
        self.overlay_tick = self.overlay_tick.wrapping_add(1);
        let view = Viewport::new(self.front.width, self.front.height, w.play.width, w.play.height);

        if !w.paused {
            self.stars.advance();
        }
        self.compose_stars(&view);

        match w.phase {
            Phase::Playing | Phase::GameOverSequence => self.compose_field(w, &view),
            Phase::LevelUpgrade => {
                self.compose_field(w, &view);
                self.compose_upgrade_menu(w, pointer);
            }
            Phase::GameOverFinal => self.compose_game_over(w),
        }

        if !w.message.is_empty() && w.phase != Phase::GameOverFinal {
            self.front.put_centered(PLAY_ROW + view.rows / 4, &w.message, palette::TITLE, Cell::BASE_BG);
        }

        // Pause overlay (drawn on top of everything)
        if w.paused {
            self.compose_pause_overlay(w);
        }
    }

    fn compose_stars(&mut self, view: &Viewport) {
        for s in &self.stars.stars {
            let x = s.x * view.play_w;
            let y = s.y * view.play_h;
            if let Some((col, row)) = view.to_cell(x, y) {
                let g = palette::star(self.stars.brightness(s));
                self.front.put_glyph(col, row, g);
            }
        }
    }

    /// Entities plus HUD: everything shown while a wave is on screen.
    fn compose_field(&mut self, w: &WorldState, view: &Viewport) {
        let tier = w.graphics_tier;

        // ── Enemies ──
        for e in &w.enemies {
            let Some((col, row)) = view.to_cell(e.x, e.y) else { continue };
            let g = palette::enemy(e.class, e.angle, tier);
            let span = view.span(e.width);
            let left = col.saturating_sub(span / 2);
            for dx in 0..span {
                self.front.put_glyph(left + dx, row, g);
            }
        }

        // ── Bullets ──
        let bullet = palette::bullet(tier);
        let trail = palette::bullet_trail(tier);
        for b in &w.bullets {
            let Some((col, row)) = view.to_cell(b.x, b.y) else { continue };
            self.front.put_glyph(col, row, bullet);
            if let Some(t) = trail {
                if row + 1 < view.bottom_row() && self.front.get(col, row + 1).ch == ' ' {
                    self.front.put_glyph(col, row + 1, t);
                }
            }
        }

        // ── Explosions ──
        for ex in &w.explosions {
            let n = palette::explosion_particles(tier, ex.is_final);
            let intensity = ex.intensity();
            let g = palette::spark(tier, intensity);
            for i in 0..n {
                let (dx, dy) = palette::spark_offset(i, n, intensity, ex.scale);
                if let Some((col, row)) = view.to_cell(ex.x + dx, ex.y + dy) {
                    self.front.put_glyph(col, row, g);
                }
            }
        }

        // ── Player ──
        if !w.player.destroyed {
            if let Some((col, row)) = view.to_cell(w.player.x, w.player.y) {
                let look = palette::ship(tier);
                let hull_len = look.hull.chars().count();
                let left = col.saturating_sub(hull_len / 2);
                self.front.put_str(left, row, look.hull, look.fg, Cell::BASE_BG);
                if let Some(flame) = look.flame {
                    if row + 1 < view.bottom_row() {
                        self.front.put_glyph(col, row + 1, flame[(w.frame / 4 % 2) as usize]);
                    }
                }
            }
        }

        self.compose_hud(w, view);
    }

    fn compose_hud(&mut self, w: &WorldState, view: &Viewport) {
        let hud = format!(" Points: {}  Level: {}", w.score, w.level);
        self.front.put_str(0, HUD_ROW, &hud, palette::HUD_TEXT, Cell::BASE_BG);

        let status_row = view.bottom_row();

        // Lives as ship icons, bottom-left
        for i in 0..w.player.lives as usize {
            self.front.put_glyph(1 + i * 2, status_row, palette::LIFE_ICON);
        }

        // Progress bar, bottom-right
        const BAR_W: usize = 20;
        let progress = w.progress();
        let filled = ((progress * BAR_W as f32) as usize).min(BAR_W);
        let pct = format!(" {:>3}%", (progress * 100.0).floor() as u32);
        let bar_x = self.front.width.saturating_sub(BAR_W + pct.len() + 1);
        for i in 0..BAR_W {
            let bg = if i < filled { palette::PROGRESS_FILL } else { palette::PROGRESS_EMPTY };
            self.front.set(bar_x + i, status_row, Cell { ch: ' ', fg: Color::White, bg });
        }
        self.front.put_str(bar_x + BAR_W, status_row, &pct, palette::HUD_TEXT, Cell::BASE_BG);
    }

    // ── Overlays ──

    fn compose_upgrade_menu(&mut self, w: &WorldState, pointer: Option<(u16, u16)>) {
        let box_w = MENU_W.min(self.front.width);
        let box_h = MENU_H.min(self.front.height);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = self.front.height.saturating_sub(box_h) / 2;
        self.front.fill_rect(box_x, box_y, box_w, box_h, palette::OVERLAY_BG);

        let title = format!("LEVEL {} COMPLETE!", w.level);
        self.front.put_centered(box_y + 1, &title, palette::TITLE, palette::OVERLAY_BG);
        self.front.put_centered(box_y + 2, "Choose an upgrade", palette::HUD_DIM, palette::OVERLAY_BG);

        let gun = w.player.gun_tier;
        let gfx = w.graphics_tier;
        let buttons = [
            (Upgrade::Speed, "1  Speed".to_string(), format!("speed {}", w.player.speed)),
            (
                Upgrade::Gun,
                "2  Guns".to_string(),
                if progression::upgrade_available(w, Upgrade::Gun) {
                    format!("Level {gun}/4")
                } else {
                    "Guns Maxed!".to_string()
                },
            ),
            (
                Upgrade::Graphics,
                "3  Graphics".to_string(),
                if progression::upgrade_available(w, Upgrade::Graphics) {
                    format!("Level {gfx}/3")
                } else {
                    "Graphics Maxed!".to_string()
                },
            ),
        ];

        let row = box_y + 4;
        let first_x = box_x + 2;
        for (i, (upgrade, label, detail)) in buttons.into_iter().enumerate() {
            let x = first_x + i * (BUTTON_W + BUTTON_GAP);
            let region = ClickRegion {
                col: x as u16,
                row: row as u16,
                width: BUTTON_W as u16,
                height: BUTTON_H as u16,
                action: upgrade,
            };
            let hovered = pointer.map_or(false, |(c, r)| region.contains(c, r));
            let bg = if !progression::upgrade_available(w, upgrade) {
                palette::BUTTON_MAXED_BG
            } else if hovered {
                palette::BUTTON_HOVER_BG
            } else {
                palette::BUTTON_BG
            };
            self.front.fill_rect(x, row, BUTTON_W, BUTTON_H, bg);
            self.front.put_str(x + 1, row, &label, palette::HUD_TEXT, bg);
            self.front.put_str(x + 1, row + 1, &detail, palette::HUD_DIM, bg);
            self.buttons.register(region);
        }

        self.front.put_centered(
            box_y + box_h.saturating_sub(1),
            "click or press 1 / 2 / 3",
            palette::HUD_DIM,
            palette::OVERLAY_BG,
        );
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let mid = self.front.height / 2;
        let band_y = mid.saturating_sub(2);
        self.front.fill_rect(0, band_y, self.front.width, 5, palette::OVERLAY_BG);

        self.front.put_centered(band_y + 1, "G A M E   O V E R", palette::ALERT, palette::OVERLAY_BG);
        let score = format!("Final Score: {}", w.score);
        self.front.put_centered(band_y + 2, &score, palette::HUD_TEXT, palette::OVERLAY_BG);
        let level = format!("Reached Level {}", w.level);
        self.front.put_centered(band_y + 3, &level, palette::HUD_DIM, palette::OVERLAY_BG);
        self.front.put_centered(band_y + 5, "ENTER: Play again   ESC: Quit", palette::ACCEPT, Cell::BASE_BG);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let box_w = 38_usize.min(self.front.width);
        let box_h = 6_usize.min(self.front.height);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = self.front.height.saturating_sub(box_h) / 2;
        self.front.fill_rect(box_x, box_y, box_w, box_h, palette::OVERLAY_BG);

        let blink = (self.overlay_tick / 30) % 2 == 0;
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_centered(box_y + 1, label, palette::TITLE, palette::OVERLAY_BG);
        let score = format!("Points: {}  Level: {}", w.score, w.level);
        self.front.put_centered(box_y + 3, &score, palette::HUD_DIM, palette::OVERLAY_BG);
        let hint = if self.gamepad_connected {
            "F1/Start Resume   ESC/Select Quit"
        } else {
            "F1 Resume   ESC Quit"
        };
        self.front.put_centered(box_y + 4, hint, palette::ACCEPT, palette::OVERLAY_BG);
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
