/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use log::{debug, error, info};

use config::GameConfig;
use sim::event::{GameEvent, HAPTIC_CORRECT, HAPTIC_INCORRECT};
use sim::session::{Phase, Session};
use sim::store::{data_dir, FileStore, HighScoreStore};
use ui::gamepad::{GamepadState, Nav};
use ui::input::InputState;
use ui::renderer::{Frame, Hit, Hud, Renderer};
use ui::sound::SoundController;

const LOG_FILE: &str = "emoji-tap.log";

fn main() {
    init_logging();

    let config = GameConfig::load();
    let rules = match config.rules() {
        Ok(rules) => rules,
        Err(e) => {
            error!("invalid configuration: {e}");
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    info!("{} emojis, {} per round, {}s games", rules.catalog.len(), rules.options_count, rules.duration_s);

    let store = FileStore::open_default();
    info!("high score file: {}", store.path().display());
    let mut session = Session::new(rules, store);
    let mut sound = SoundController::with_default_output(config.sound.start_muted);
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut session, &mut renderer, &mut sound, &mut gp, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop aborted: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Tap the Emoji!");
    println!("Final Score: {}   Best: {}", session.score(), session.high_score());
}

/// The terminal belongs to the game, so logs go to a file next to the
/// high score. `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let path = data_dir().join(LOG_FILE);
    let Ok(file) = File::create(&path) else { return };
    let init = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
    if let Err(e) = init {
        eprintln!("Logging disabled: {e}");
    }
}

fn game_loop<S: HighScoreStore>(
    session: &mut Session<S>,
    renderer: &mut Renderer,
    sound: &mut SoundController,
    gp: &mut GamepadState,
    config: &GameConfig,
) -> std::io::Result<()> {
    let mut kb = InputState::new();
    let frame_sleep = Duration::from_millis(config.display.frame_ms);
    let cols = config.game.grid_columns;
    let mut cursor: usize = 0;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        // Due ticks first: time running out beats input read this frame
        let now = Instant::now();
        let mut events = session.update(now);
        let playing = session.phase() == Phase::Playing;

        if !playing && (kb.any_pressed(&[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc]) || gp.quit_pressed()) {
            break;
        }

        if kb.any_pressed(&[KeyCode::Char('m'), KeyCode::Char('M')]) || gp.mute_pressed() {
            sound.toggle_mute();
        }

        let confirm = kb.any_pressed(&[KeyCode::Enter, KeyCode::Char(' ')]) || gp.select_pressed();

        if kb.any_pressed(&[KeyCode::Char('r'), KeyCode::Char('R')]) || gp.start_pressed() {
            events.extend(session.start_game(now));
        } else if playing {
            for slot in kb.digit_slots() {
                cursor = slot;
                events.extend(session.click_slot(slot, now));
            }
            let count = session.round().options.len();
            for nav in key_nav(&kb).into_iter().chain(gp.nav().iter().copied()) {
                cursor = move_cursor(cursor, nav, count, cols);
            }
            if confirm {
                events.extend(session.click_slot(cursor, now));
            }
        } else if confirm {
            events.extend(session.start_game(now));
        }

        for &(col, row) in kb.clicks() {
            match renderer.hit_test(col, row) {
                Some(Hit::Slot(i)) => {
                    cursor = i;
                    events.extend(session.click_slot(i, now));
                }
                Some(Hit::Start) => events.extend(session.start_game(now)),
                Some(Hit::Mute) => sound.toggle_mute(),
                None => {}
            }
        }

        process_events(&events, session, sound, gp);

        let hud = Hud {
            cursor,
            grid_columns: cols,
            muted: sound.is_muted(),
            audio_available: sound.is_available(),
            gamepad: gp.connected,
        };
        renderer.render(&Frame::new(session, hud))?;

        std::thread::sleep(frame_sleep);
    }

    Ok(())
}

/// Route session events to sound, rumble and the log.
fn process_events<S: HighScoreStore>(
    events: &[GameEvent],
    session: &Session<S>,
    sound: &mut SoundController,
    gp: &mut GamepadState,
) {
    for event in events {
        match event {
            GameEvent::GameStarted => sound.initialize_audio(),
            GameEvent::CorrectPick { index } => {
                debug!("correct pick at slot {index}");
                sound.play_correct_sound();
                gp.vibrate(HAPTIC_CORRECT);
            }
            GameEvent::WrongPick { index } => {
                debug!("wrong pick at slot {index}");
                sound.play_incorrect_sound();
                gp.vibrate(HAPTIC_INCORRECT);
            }
            GameEvent::RoundAdvanced => debug!("round {}", session.round_serial()),
            GameEvent::FeedbackCleared => {}
            GameEvent::GameOver { score, new_high_score } => {
                if *new_high_score {
                    info!("new high score: {score}");
                }
                sound.play_game_over_sound();
            }
        }
    }
}

fn key_nav(kb: &InputState) -> Vec<Nav> {
    let mut out = Vec::new();
    if kb.any_pressed(&[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')]) { out.push(Nav::Up); }
    if kb.any_pressed(&[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')]) { out.push(Nav::Down); }
    if kb.any_pressed(&[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')]) { out.push(Nav::Left); }
    if kb.any_pressed(&[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')]) { out.push(Nav::Right); }
    out
}

/// Move the grid cursor one step, staying inside the grid.
fn move_cursor(cursor: usize, nav: Nav, count: usize, cols: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let cols = cols.clamp(1, count);
    let cursor = cursor.min(count - 1);
    match nav {
        Nav::Left if cursor % cols > 0 => cursor - 1,
        Nav::Right if cursor % cols + 1 < cols && cursor + 1 < count => cursor + 1,
        Nav::Up if cursor >= cols => cursor - cols,
        Nav::Down if cursor + cols < count => cursor + cols,
        _ => cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::error::GameError;
    use crate::sim::store::MemoryStore;
    use crate::ui::sound::{AudioEngine, EngineFactory};
    use crate::ui::synth::Tone;

    struct ToneLog {
        freqs: Rc<RefCell<Vec<f32>>>,
    }

    impl AudioEngine for ToneLog {
        fn play_tone(&self, tone: &Tone, _offset: Duration) {
            self.freqs.borrow_mut().push(tone.frequency_hz);
        }
        fn close(&mut self) {}
        fn is_closed(&self) -> bool {
            false
        }
    }

    fn recording_sound(muted: bool) -> (SoundController, Rc<RefCell<Vec<f32>>>) {
        let freqs = Rc::new(RefCell::new(Vec::new()));
        let shared = freqs.clone();
        let factory: EngineFactory = Box::new(move || -> Result<Box<dyn AudioEngine>, GameError> {
            Ok(Box::new(ToneLog { freqs: shared.clone() }))
        });
        (SoundController::new(factory, muted), freqs)
    }

    fn idle_session() -> Session<MemoryStore> {
        let rules = GameConfig::default().rules().unwrap();
        Session::with_rng(rules, MemoryStore::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn game_over_plays_arpeggio_once() {
        let session = idle_session();
        let (mut sound, freqs) = recording_sound(false);
        let mut gp = GamepadState::new();
        let events = [
            GameEvent::GameStarted,
            GameEvent::GameOver { score: 4, new_high_score: true },
        ];
        process_events(&events, &session, &mut sound, &mut gp);
        assert_eq!(*freqs.borrow(), vec![523.0, 659.0, 784.0]);
    }

    #[test]
    fn picks_route_to_their_cues() {
        let session = idle_session();
        let (mut sound, freqs) = recording_sound(false);
        let mut gp = GamepadState::new();
        let events = [
            GameEvent::GameStarted,
            GameEvent::CorrectPick { index: 2 },
            GameEvent::RoundAdvanced,
            GameEvent::FeedbackCleared,
            GameEvent::WrongPick { index: 5 },
        ];
        process_events(&events, &session, &mut sound, &mut gp);
        assert_eq!(*freqs.borrow(), vec![600.0, 800.0, 200.0]);
    }

    #[test]
    fn muted_game_over_is_silent() {
        let session = idle_session();
        let (mut sound, freqs) = recording_sound(true);
        let mut gp = GamepadState::new();
        let events = [
            GameEvent::GameStarted,
            GameEvent::GameOver { score: 0, new_high_score: false },
        ];
        process_events(&events, &session, &mut sound, &mut gp);
        assert!(freqs.borrow().is_empty());
    }

    #[test]
    fn cursor_moves_within_rows() {
        assert_eq!(move_cursor(0, Nav::Right, 8, 4), 1);
        assert_eq!(move_cursor(3, Nav::Right, 8, 4), 3);
        assert_eq!(move_cursor(4, Nav::Left, 8, 4), 4);
        assert_eq!(move_cursor(5, Nav::Left, 8, 4), 4);
    }

    #[test]
    fn cursor_moves_between_rows() {
        assert_eq!(move_cursor(1, Nav::Down, 8, 4), 5);
        assert_eq!(move_cursor(5, Nav::Down, 8, 4), 5);
        assert_eq!(move_cursor(6, Nav::Up, 8, 4), 2);
        assert_eq!(move_cursor(2, Nav::Up, 8, 4), 2);
    }

    #[test]
    fn ragged_last_row_is_respected() {
        // 6 options in rows of 4: slots 4 and 5 on the second row
        assert_eq!(move_cursor(3, Nav::Down, 6, 4), 3);
        assert_eq!(move_cursor(5, Nav::Right, 6, 4), 5);
        assert_eq!(move_cursor(1, Nav::Down, 6, 4), 5);
    }

    #[test]
    fn stale_cursor_is_clamped() {
        assert_eq!(move_cursor(12, Nav::Left, 8, 4), 6);
        assert_eq!(move_cursor(0, Nav::Up, 0, 4), 0);
    }
}
