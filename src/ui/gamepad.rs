/// Gamepad input and rumble using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move grid cursor
///   A / B                 →  Pick cursored emoji
///   Start                 →  Start / Restart
///   Y                     →  Toggle sound
///   Select                →  Quit (outside a game)
///
/// Rumble doubles as the haptic channel. Patterns are millisecond
/// lists alternating on/off, e.g. `[100, 50, 100]`.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East  => Some(Btn::B),
            Button::West  => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start  => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Cursor movement requested this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Nav {
    Up,
    Down,
    Left,
    Right,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    select: Vec<Btn>,
    start: Vec<Btn>,
    mute: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            select: vec![Btn::A, Btn::B],
            start:  vec![Btn::Start],
            mute:   vec![Btn::Y],
            quit:   vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Playing rumble effect; dropping it stops the motors.
    #[cfg(feature = "gamepad")]
    rumble: Option<gilrs::ff::Effect>,

    /// Buttons pressed since the last `update()`.
    pressed: Vec<Btn>,
    /// Navigation pressed since the last `update()`.
    nav: Vec<Nav>,

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            #[cfg(feature = "gamepad")]
            rumble: None,
            pressed: Vec::with_capacity(4),
            nav: Vec::with_capacity(4),
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Unknown names are skipped; an
    /// action left with no valid buttons keeps its default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let sel = parse_list(&cfg.select);
        if !sel.is_empty() { map.select = sel; }
        let st = parse_list(&cfg.start);
        if !st.is_empty() { map.start = st; }
        let mu = parse_list(&cfg.mute);
        if !mu.is_empty() { map.mute = mu; }
        let qu = parse_list(&cfg.quit);
        if !qu.is_empty() { map.quit = qu; }
    }

    pub fn update(&mut self) {
        self.pressed.clear();
        self.nav.clear();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.press_button(btn);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    self.update_axis(axis, value);
                }
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    self.connected = false;
                    self.stick_x = 0.0;
                    self.stick_y = 0.0;
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn press_button(&mut self, btn: Button) {
        match btn {
            Button::DPadUp    => self.nav.push(Nav::Up),
            Button::DPadDown  => self.nav.push(Nav::Down),
            Button::DPadLeft  => self.nav.push(Nav::Left),
            Button::DPadRight => self.nav.push(Nav::Right),
            other => {
                if let Some(b) = Btn::from_gilrs(other) {
                    self.pressed.push(b);
                }
            }
        }
    }

    /// Stick crossings past the deadzone count as one navigation step.
    #[cfg(feature = "gamepad")]
    fn update_axis(&mut self, axis: Axis, value: f32) {
        let (prev, nav_neg, nav_pos) = match axis {
            Axis::LeftStickX => (std::mem::replace(&mut self.stick_x, value), Nav::Left, Nav::Right),
            Axis::LeftStickY => (std::mem::replace(&mut self.stick_y, value), Nav::Down, Nav::Up),
            _ => return,
        };
        if value < -STICK_DEADZONE && prev >= -STICK_DEADZONE {
            self.nav.push(nav_neg);
        } else if value > STICK_DEADZONE && prev <= STICK_DEADZONE {
            self.nav.push(nav_pos);
        }
    }

    // ── Action queries (config-driven) ──

    fn any_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|b| self.pressed.contains(b))
    }

    pub fn select_pressed(&self) -> bool {
        self.any_pressed(&self.action_map.select)
    }
    pub fn start_pressed(&self) -> bool {
        self.any_pressed(&self.action_map.start)
    }
    pub fn mute_pressed(&self) -> bool {
        self.any_pressed(&self.action_map.mute)
    }
    pub fn quit_pressed(&self) -> bool {
        self.any_pressed(&self.action_map.quit)
    }

    pub fn nav(&self) -> &[Nav] {
        &self.nav
    }

    // ── Haptics ──

    /// Rumble every force-feedback pad with an on/off pattern.
    /// Silently does nothing when no such pad is connected.
    #[cfg(feature = "gamepad")]
    pub fn vibrate(&mut self, pattern: &[u32]) {
        use gilrs::ff::{BaseEffect, BaseEffectType, EffectBuilder, Repeat, Replay, Ticks};

        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };
        let pads: Vec<_> = gilrs
            .gamepads()
            .filter(|(_, pad)| pad.is_ff_supported())
            .map(|(id, _)| id)
            .collect();
        if pads.is_empty() {
            return;
        }

        let mut builder = EffectBuilder::new();
        for (start, len) in pulses(pattern) {
            builder.add_effect(BaseEffect {
                kind: BaseEffectType::Strong { magnitude: 48_000 },
                scheduling: Replay {
                    after: Ticks::from_ms(start),
                    play_for: Ticks::from_ms(len),
                    with_delay: Ticks::from_ms(0),
                },
                envelope: Default::default(),
            });
        }
        let total: u32 = pattern.iter().sum();
        builder.repeat(Repeat::For(Ticks::from_ms(total))).gamepads(&pads);

        match builder.finish(gilrs) {
            Ok(effect) => {
                if let Err(e) = effect.play() {
                    log::debug!("rumble failed: {e}");
                }
                // Replaces (and stops) any previous pattern
                self.rumble = Some(effect);
            }
            Err(e) => log::debug!("rumble unavailable: {e}"),
        }
    }

    #[cfg(not(feature = "gamepad"))]
    pub fn vibrate(&mut self, _pattern: &[u32]) {}
}

/// (start, length) of each "on" segment in an alternating on/off pattern.
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
fn pulses(pattern: &[u32]) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(pattern.len() / 2 + 1);
    let mut t = 0;
    for (i, &ms) in pattern.iter().enumerate() {
        if i % 2 == 0 && ms > 0 {
            out.push((t, ms));
        }
        t += ms;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pulse() {
        assert_eq!(pulses(&[50]), vec![(0, 50)]);
    }

    #[test]
    fn on_off_on_pattern() {
        assert_eq!(pulses(&[100, 50, 100]), vec![(0, 100), (150, 100)]);
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("South"), Some(Btn::A));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn unknown_names_keep_defaults() {
        let mut gp = GamepadState::new();
        gp.load_button_config(&GamepadConfig {
            select: vec!["turbo".into()],
            start: vec!["X".into()],
            mute: vec![],
            quit: vec!["Back".into()],
        });
        assert_eq!(gp.action_map.select, vec![Btn::A, Btn::B]);
        assert_eq!(gp.action_map.start, vec![Btn::X]);
        assert_eq!(gp.action_map.mute, vec![Btn::Y]);
        assert_eq!(gp.action_map.quit, vec![Btn::Select]);
    }
}
