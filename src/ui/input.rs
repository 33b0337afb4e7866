/// Input state tracker.
///
/// Collects one frame's worth of terminal input:
///   - Key presses (edge-triggered; repeats and releases are ignored)
///   - Left mouse clicks as (column, row) terminal cells
///
/// Mouse reporting must be enabled by the renderer for clicks to arrive.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

pub struct InputState {
    /// Keys pressed during the most recent `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    raw_events: Vec<KeyEvent>,

    /// Left clicks during the most recent drain, in terminal cells.
    clicks: Vec<(u16, u16)>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            clicks: Vec::with_capacity(4),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.clicks.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.record_key(key),
                Ok(Event::Mouse(m)) => {
                    if let MouseEventKind::Down(MouseButton::Left) = m.kind {
                        self.clicks.push((m.column, m.row));
                    }
                }
                _ => {}
            }
        }
    }

    fn record_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        // Terminals with keyboard enhancement report Repeat/Release too;
        // only the initial press counts as an action here.
        if key.kind == KeyEventKind::Press {
            self.fresh_presses.push(key.code);
        }
    }

    /// Was this key pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Digit keys pressed this frame, as zero-based slot numbers ('1' → 0).
    pub fn digit_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.fresh_presses.iter().filter_map(|code| match code {
            KeyCode::Char(c @ '1'..='9') => Some(*c as usize - '1' as usize),
            _ => None,
        })
    }

    pub fn clicks(&self) -> &[(u16, u16)] {
        &self.clicks
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
