/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into `front` (array of Cell)
///   2. Compare each cell with `back` (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Composing also records clickable regions, so mouse clicks can be
/// mapped back to option slots and buttons with `hit_test()`.

use std::io::{self, BufWriter, Write};
use std::time::Instant;

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::round::{Feedback, FeedbackKind, Round};
use crate::sim::session::{Phase, Session};
use crate::sim::store::HighScoreStore;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 16],  // up to 16 bytes (supports ZWJ emoji sequences)
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = right half of a wide char (skip render)
}

impl Cell {
    /// Explicit background for every "empty" cell, also used for `Clear`,
    /// so inter-row gaps match the cell colour on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 24, g: 60, b: 88 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell {
        ch: [b'?', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    /// Wide cell from a (possibly multi-codepoint) emoji.
    fn from_str_wide(s: &str, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let mut len = s.len().min(cell.ch.len());
        while !s.is_char_boundary(len) {
            len -= 1;
        }
        cell.ch[..len].copy_from_slice(&s.as_bytes()[..len]);
        cell.ch_len = len as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell.wide = true;
        cell
    }

    fn continuation(bg: Color) -> Self {
        Cell { ch: [0; 16], ch_len: 0, cont: true, bg: Self::norm_bg(bg), ..Self::BLANK }
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
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

    /// Write narrow text at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Write narrow text centred on row `y`.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        self.put_str(self.width.saturating_sub(len) / 2, y, s, fg, bg);
    }

    /// Write one emoji at (x, y), occupying columns x and x+1.
    fn put_emoji(&mut self, x: usize, y: usize, s: &str, bg: Color) {
        if x + 1 >= self.width { return; }
        self.set(x, y, Cell::from_str_wide(s, Color::White, bg));
        self.set(x + 1, y, Cell::continuation(bg));
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

const BTN_W: usize = 8;
const BTN_H: usize = 3;
const GAP_X: usize = 2;
const GAP_Y: usize = 1;

const HEADER_ROW: usize = 0;
const TARGET_LABEL_ROW: usize = 3;
const TARGET_BOX_ROW: usize = 4;
const GRID_ROW: usize = 8;

const HEADER_BG: Color = Color::Rgb { r: 14, g: 36, b: 56 };
const BUTTON_BG: Color = Color::Rgb { r: 236, g: 240, b: 244 };
const CURSOR_BG: Color = Color::Rgb { r: 254, g: 240, b: 138 };
const CORRECT_BG: Color = Color::Rgb { r: 74, g: 222, b: 128 };
const CORRECT_BG_DIM: Color = Color::Rgb { r: 34, g: 160, b: 90 };
const INCORRECT_BG: Color = Color::Rgb { r: 248, g: 113, b: 113 };
const BORDER: Color = Color::Rgb { r: 148, g: 163, b: 184 };
const ACCENT: Color = Color::Rgb { r: 250, g: 204, b: 21 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const DIM: Color = Color::Rgb { r: 140, g: 160, b: 180 };

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Something the mouse can click.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hit {
    Slot(usize),
    Start,
    Mute,
}

/// Button rectangles for `count` options laid out `cols` per row,
/// centred in a buffer `buf_w` wide, starting at row `top`.
pub fn grid_layout(buf_w: usize, count: usize, cols: usize, top: usize) -> Vec<Rect> {
    let cols = cols.clamp(1, count.max(1));
    let grid_w = cols * BTN_W + (cols - 1) * GAP_X;
    let x0 = buf_w.saturating_sub(grid_w) / 2;
    (0..count)
        .map(|i| Rect {
            x: x0 + (i % cols) * (BTN_W + GAP_X),
            y: top + (i / cols) * (BTN_H + GAP_Y),
            w: BTN_W,
            h: BTN_H,
        })
        .collect()
}

// ── Frame: what one render needs to know ──

/// UI-only state that is not part of the session.
#[derive(Clone, Copy, Debug)]
pub struct Hud {
    pub cursor: usize,
    pub grid_columns: usize,
    pub muted: bool,
    pub audio_available: bool,
    pub gamepad: bool,
}

pub struct Frame<'a> {
    pub phase: Phase,
    pub score: u32,
    pub time_left: u32,
    pub high_score: u32,
    pub new_best: bool,
    pub duration_s: u32,
    pub round: &'a Round,
    pub feedback: Option<Feedback>,
    pub hud: Hud,
}

impl<'a> Frame<'a> {
    pub fn new<S: HighScoreStore>(s: &'a Session<S>, hud: Hud) -> Self {
        Frame {
            phase: s.phase(),
            score: s.score(),
            time_left: s.time_left(),
            high_score: s.high_score(),
            new_best: s.new_best(),
            duration_s: s.rules().duration_s,
            round: s.round(),
            feedback: s.feedback(),
            hud,
        }
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Feedback being animated and when it appeared.
    anim: Option<(Feedback, Instant)>,
    hits: Vec<(Rect, Hit)>,
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
            anim: None,
            hits: Vec::new(),
        }
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

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, frame: &Frame) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(frame.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(frame.phase);
        }

        self.compose(frame, Instant::now());
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Which button, if any, sits under terminal cell (col, row) in the
    /// most recently composed frame.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<Hit> {
        let (x, y) = (col as usize, row as usize);
        self.hits.iter().find(|(r, _)| r.contains(x, y)).map(|(_, h)| *h)
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the
        // terminal's own default and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
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

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, frame: &Frame, now: Instant) {
        self.front.clear();
        self.hits.clear();

        // Restart the animation clock whenever a new verdict appears
        self.anim = match (frame.feedback, self.anim) {
            (Some(fb), Some((prev, since))) if prev == fb => Some((fb, since)),
            (Some(fb), _) => Some((fb, now)),
            (None, _) => None,
        };

        self.compose_header(frame);
        match frame.phase {
            Phase::Playing => self.compose_playing(frame, now),
            Phase::Idle => self.compose_idle(frame),
            Phase::Over => self.compose_over(frame),
        }
        self.compose_footer(frame);
    }

    fn compose_header(&mut self, f: &Frame) {
        let w = self.front.width;
        self.front.fill_row(HEADER_ROW, HEADER_BG);
        self.front.fill_row(HEADER_ROW + 1, HEADER_BG);

        let time_color = if f.phase == Phase::Playing && f.time_left <= 5 { INCORRECT_BG } else { ACCENT };
        let columns = [
            ("SCORE", f.score, Color::White),
            ("TIME", f.time_left, time_color),
            ("BEST", f.high_score, Color::White),
        ];
        let col_w = w / 3;
        for (i, (label, value, color)) in columns.iter().enumerate() {
            let value = value.to_string();
            let cx = i * col_w + col_w / 2;
            self.front.put_str(cx.saturating_sub(label.len() / 2), HEADER_ROW, label, DIM, HEADER_BG);
            self.front.put_str(cx.saturating_sub(value.len() / 2), HEADER_ROW + 1, &value, *color, HEADER_BG);
        }
    }

    fn compose_playing(&mut self, f: &Frame, now: Instant) {
        let w = self.front.width;

        self.front.put_centered(TARGET_LABEL_ROW, "Find this emoji:", Color::White, Color::Reset);
        let bx = w.saturating_sub(6) / 2;
        self.front.put_str(bx, TARGET_BOX_ROW, "╭────╮", ACCENT, Color::Reset);
        self.front.put_str(bx, TARGET_BOX_ROW + 1, "│    │", ACCENT, Color::Reset);
        self.front.put_str(bx, TARGET_BOX_ROW + 2, "╰────╯", ACCENT, Color::Reset);
        self.front.put_emoji(bx + 2, TARGET_BOX_ROW + 1, f.round.target.as_str(), Cell::BASE_BG);

        let rects = grid_layout(w, f.round.options.len(), f.hud.grid_columns, GRID_ROW);
        for (i, (rect, emoji)) in rects.iter().zip(&f.round.options).enumerate() {
            let verdict = f.feedback.filter(|fb| fb.index == i).map(|fb| fb.kind);
            let elapsed_ms = self.anim.map(|(_, since)| now.duration_since(since).as_millis()).unwrap_or(0);

            let (bg, shift) = match verdict {
                Some(FeedbackKind::Correct) => {
                    let bright = (elapsed_ms / 100) % 2 == 0;
                    (if bright { CORRECT_BG } else { CORRECT_BG_DIM }, 0)
                }
                Some(FeedbackKind::Incorrect) => (INCORRECT_BG, shake_offset(elapsed_ms)),
                None if i == f.hud.cursor => (CURSOR_BG, 0),
                None => (BUTTON_BG, 0),
            };

            let drawn = Rect { x: (rect.x as isize + shift).max(0) as usize, ..*rect };
            let label = if i < 9 { char::from_digit(i as u32 + 1, 10) } else { None };
            self.draw_button(drawn, label, emoji.as_str(), bg);
            self.hits.push((*rect, Hit::Slot(i)));
        }
    }

    fn compose_idle(&mut self, f: &Frame) {
        let top = self.overlay_top(7);
        self.front.put_centered(top, "╔══════════════════════╗", ACCENT, Color::Reset);
        self.front.put_centered(top + 1, "║    TAP THE EMOJI     ║", ACCENT, Color::Reset);
        self.front.put_centered(top + 2, "╚══════════════════════╝", ACCENT, Color::Reset);
        let hint = format!("Find the right emojis in {} seconds.", f.duration_s);
        self.front.put_centered(top + 4, &hint, Color::White, Color::Reset);
        self.compose_start_button(top + 6, "[  ▶  PLAY!  ]");
    }

    fn compose_over(&mut self, f: &Frame) {
        let top = self.overlay_top(9);
        self.front.put_centered(top, "╔══════════════╗", INCORRECT_BG, Color::Reset);
        self.front.put_centered(top + 1, "║    TIME!     ║", INCORRECT_BG, Color::Reset);
        self.front.put_centered(top + 2, "╚══════════════╝", INCORRECT_BG, Color::Reset);
        self.front.put_centered(top + 4, "Your final score:", Color::White, Color::Reset);
        self.front.put_centered(top + 5, &f.score.to_string(), ACCENT, Color::Reset);
        if f.new_best {
            self.front.put_centered(top + 6, "★ New best! ★", GOOD, Color::Reset);
        }
        self.compose_start_button(top + 8, "[  ↻  PLAY AGAIN  ]");
    }

    fn compose_start_button(&mut self, row: usize, label: &str) {
        let len = label.chars().count();
        let x = self.front.width.saturating_sub(len) / 2;
        self.front.put_str(x, row, label, Color::Black, CORRECT_BG);
        self.hits.push((Rect { x, y: row, w: len, h: 1 }, Hit::Start));
    }

    fn compose_footer(&mut self, f: &Frame) {
        let h = self.front.height;
        if h < 4 { return; }
        let row = h - 2;
        let w = self.front.width;

        let restart = "[ ↻ Restart ]";
        self.front.put_str(1, row, restart, Color::White, Color::Rgb { r: 59, g: 130, b: 246 });
        self.hits.push((Rect { x: 1, y: row, w: restart.chars().count(), h: 1 }, Hit::Start));

        let (icon, text) = match (f.hud.audio_available, f.hud.muted) {
            (false, _) => ("🔇", " No audio "),
            (true, true) => ("🔇", " Sound off "),
            (true, false) => ("🔊", " Sound on  "),
        };
        let sound_bg = Color::Rgb { r: 251, g: 146, b: 60 };
        let sound_w = 3 + text.chars().count();
        let sx = w.saturating_sub(sound_w + 1);
        self.front.put_str(sx, row, " ", Color::Black, sound_bg);
        self.front.put_emoji(sx + 1, row, icon, sound_bg);
        self.front.put_str(sx + 3, row, text, Color::Black, sound_bg);
        self.hits.push((Rect { x: sx, y: row, w: sound_w, h: 1 }, Hit::Mute));

        let pad = if f.hud.gamepad { "  🎮" } else { "" };
        let help = format!(
            " 1-9/click: pick  ←↑↓→+Enter: pick  R: restart  M: sound  Q: quit{}",
            pad
        );
        let mut x = 0;
        for ch in help.chars() {
            if ch == '🎮' {
                self.front.put_emoji(x, h - 1, "🎮", Cell::BASE_BG);
                x += 2;
            } else {
                self.front.set(x, h - 1, Cell::from_char(ch, DIM, Color::Reset));
                x += 1;
            }
        }
    }

    /// First row of a vertically centred overlay of `height` rows,
    /// between the header and the footer.
    fn overlay_top(&self, height: usize) -> usize {
        let avail = self.front.height.saturating_sub(GRID_ROW);
        TARGET_LABEL_ROW + avail.saturating_sub(height) / 2
    }

    fn draw_button(&mut self, r: Rect, label: Option<char>, emoji: &str, bg: Color) {
        let inner = r.w - 2;
        let mut top = String::with_capacity(r.w * 3);
        top.push('┌');
        match label {
            Some(c) => { top.push(c); top.push_str(&"─".repeat(inner - 1)); }
            None => top.push_str(&"─".repeat(inner)),
        }
        top.push('┐');
        let bottom = format!("└{}┘", "─".repeat(inner));

        self.front.put_str(r.x, r.y, &top, BORDER, Color::Reset);
        self.front.set(r.x, r.y + 1, Cell::from_char('│', BORDER, Color::Reset));
        for x in r.x + 1..r.x + 1 + inner {
            self.front.set(x, r.y + 1, Cell::from_char(' ', Color::Black, bg));
        }
        self.front.set(r.x + r.w - 1, r.y + 1, Cell::from_char('│', BORDER, Color::Reset));
        self.front.put_emoji(r.x + 1 + (inner - 2) / 2, r.y + 1, emoji, bg);
        self.front.put_str(r.x, r.y + r.h - 1, &bottom, BORDER, Color::Reset);
    }
}

/// Horizontal shake for a wrong pick: left, right, left, right, rest,
/// one step per 100ms.
fn shake_offset(elapsed_ms: u128) -> isize {
    match elapsed_ms / 100 {
        0 | 2 => -1,
        1 | 3 => 1,
        _ => 0,
    }
}
