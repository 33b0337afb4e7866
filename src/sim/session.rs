/// The game session state machine.
///
/// ## Phases
///
///   Idle ──start──▶ Playing ──time up──▶ Over ──start──▶ Playing ...
///
/// Start is accepted from any phase and always resets score, time and round.
///
/// ## Deferred work
///
/// Two task slots, both driven by `update(now)`:
///   - `countdown`:      every second while playing, decrements `time_left`
///   - `feedback_clear`: one-shot after a click: 300ms (correct, then a new
///                       round) or 500ms (incorrect, same round)
///
/// Re-arming a slot replaces its previous task, and leaving `Playing`
/// cancels both, so stale callbacks cannot touch a newer session.
/// When both are due in the same update, the countdown goes first.

use std::time::{Duration, Instant};

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::emoji::{Catalog, Emoji};
use crate::domain::round::{generate_round, Feedback, FeedbackKind, Round};
use super::event::GameEvent;
use super::store::HighScoreStore;
use super::timer::TaskSlot;

pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
pub const CORRECT_FEEDBACK_DELAY: Duration = Duration::from_millis(300);
pub const INCORRECT_FEEDBACK_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Idle,
    Playing,
    Over,
}

/// Fixed game parameters, validated at startup.
#[derive(Clone, Debug)]
pub struct Rules {
    pub catalog: Catalog,
    pub options_count: usize,
    pub duration_s: u32,
}

/// What happens when a feedback marker expires.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum AfterFeedback {
    NextRound,
    Retry,
}

pub struct Session<S: HighScoreStore> {
    rules: Rules,
    store: S,
    rng: StdRng,

    phase: Phase,
    score: u32,
    time_left: u32,
    high_score: u32,
    /// True when the last finished game beat the previous best.
    new_best: bool,

    round: Round,
    /// Bumped every time a round is generated.
    round_serial: u64,
    feedback: Option<Feedback>,

    countdown: TaskSlot<()>,
    feedback_clear: TaskSlot<AfterFeedback>,
}

impl<S: HighScoreStore> Session<S> {
    pub fn new(rules: Rules, store: S) -> Self {
        Self::with_rng(rules, store, StdRng::from_entropy())
    }

    pub fn with_rng(rules: Rules, store: S, mut rng: StdRng) -> Self {
        let high_score = store.load();
        let round = generate_round(&rules.catalog, rules.options_count, &mut rng);
        Session {
            time_left: rules.duration_s,
            rules,
            store,
            rng,
            phase: Phase::Idle,
            score: 0,
            high_score,
            new_best: false,
            round,
            round_serial: 1,
            feedback: None,
            countdown: TaskSlot::new(),
            feedback_clear: TaskSlot::new(),
        }
    }

    // ── Accessors ──

    pub fn phase(&self) -> Phase { self.phase }
    pub fn score(&self) -> u32 { self.score }
    pub fn time_left(&self) -> u32 { self.time_left }
    pub fn high_score(&self) -> u32 { self.high_score }
    pub fn new_best(&self) -> bool { self.new_best }
    pub fn round(&self) -> &Round { &self.round }
    pub fn round_serial(&self) -> u64 { self.round_serial }
    pub fn feedback(&self) -> Option<Feedback> { self.feedback }
    pub fn rules(&self) -> &Rules { &self.rules }

    // ── Transitions ──

    /// Start or restart a game.
    pub fn start_game(&mut self, now: Instant) -> Vec<GameEvent> {
        self.score = 0;
        self.time_left = self.rules.duration_s;
        self.new_best = false;
        self.feedback = None;
        self.feedback_clear.cancel();
        self.next_round();
        self.countdown.arm_every(now, COUNTDOWN_PERIOD, ());
        self.phase = Phase::Playing;
        info!("game started ({}s, {} options)", self.rules.duration_s, self.rules.options_count);
        vec![GameEvent::GameStarted]
    }

    /// Click on option slot `index` showing `emoji`.
    ///
    /// Tasks already due at `now` run first, so a click landing after the
    /// last second has expired finds the game over. Ignored outside
    /// `Playing` and while a previous verdict is still shown.
    pub fn handle_click(&mut self, emoji: &Emoji, index: usize, now: Instant) -> Vec<GameEvent> {
        let mut events = self.update(now);
        if self.phase != Phase::Playing || self.feedback.is_some() {
            return events;
        }

        if *emoji == self.round.target {
            self.score += 1;
            self.feedback = Some(Feedback { index, kind: FeedbackKind::Correct });
            self.feedback_clear.arm_once(now, CORRECT_FEEDBACK_DELAY, AfterFeedback::NextRound);
            events.push(GameEvent::CorrectPick { index });
        } else {
            self.feedback = Some(Feedback { index, kind: FeedbackKind::Incorrect });
            self.feedback_clear.arm_once(now, INCORRECT_FEEDBACK_DELAY, AfterFeedback::Retry);
            events.push(GameEvent::WrongPick { index });
        }
        events
    }

    /// Click on a slot by index. Out-of-range slots are ignored.
    pub fn click_slot(&mut self, index: usize, now: Instant) -> Vec<GameEvent> {
        match self.round.options.get(index).cloned() {
            Some(emoji) => self.handle_click(&emoji, index, now),
            None => vec![],
        }
    }

    /// Run every task due at `now`, in deadline order.
    pub fn update(&mut self, now: Instant) -> Vec<GameEvent> {
        let mut events = Vec::new();
        loop {
            let tick = self.countdown.due_at(now);
            let clear = self.feedback_clear.due_at(now);
            match (tick, clear) {
                (None, None) => break,
                (Some(t), Some(c)) if c < t => self.fire_feedback_clear(now, &mut events),
                (Some(_), _) => self.fire_countdown(now, &mut events),
                (None, Some(_)) => self.fire_feedback_clear(now, &mut events),
            }
        }
        events
    }

    // ── Internal ──

    fn next_round(&mut self) {
        self.round = generate_round(&self.rules.catalog, self.rules.options_count, &mut self.rng);
        self.round_serial += 1;
        debug!("round {}: target in slot {:?}", self.round_serial, self.round.target_index());
    }

    fn fire_countdown(&mut self, now: Instant, events: &mut Vec<GameEvent>) {
        if self.countdown.fire(now).is_none() {
            return;
        }
        if self.phase != Phase::Playing {
            self.countdown.cancel();
            return;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.finish(events);
        }
    }

    fn fire_feedback_clear(&mut self, now: Instant, events: &mut Vec<GameEvent>) {
        let Some(after) = self.feedback_clear.fire(now) else { return };
        if self.phase != Phase::Playing {
            return;
        }
        if after == AfterFeedback::NextRound {
            self.next_round();
            events.push(GameEvent::RoundAdvanced);
        }
        self.feedback = None;
        events.push(GameEvent::FeedbackCleared);
    }

    fn finish(&mut self, events: &mut Vec<GameEvent>) {
        self.phase = Phase::Over;
        self.countdown.cancel();
        self.feedback_clear.cancel();
        self.feedback = None;

        self.new_best = self.score > self.high_score;
        if self.new_best {
            self.high_score = self.score;
            if let Err(e) = self.store.save(self.score) {
                error!("could not persist high score {}: {e}", self.score);
            }
        }
        info!("game over: score {} (best {})", self.score, self.high_score);
        events.push(GameEvent::GameOver { score: self.score, new_high_score: self.new_best });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::store::MemoryStore;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn rules(duration_s: u32) -> Rules {
        let symbols: Vec<String> = (0..20).map(|i| format!("e{i}")).collect();
        Rules {
            catalog: Catalog::new(&symbols, 8).unwrap(),
            options_count: 8,
            duration_s,
        }
    }

    fn session(duration_s: u32, store: MemoryStore) -> Session<MemoryStore> {
        Session::with_rng(rules(duration_s), store, StdRng::seed_from_u64(99))
    }

    fn wrong_slot(s: &Session<MemoryStore>) -> usize {
        let target = s.round().target_index().unwrap();
        (target + 1) % s.round().options.len()
    }

    #[test]
    fn starts_idle_with_loaded_high_score() {
        let s = session(30, MemoryStore::with_score(12));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.high_score(), 12);
        assert_eq!(s.time_left(), 30);
    }

    #[test]
    fn clicks_before_start_are_ignored() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        let target = s.round().target_index().unwrap();
        assert!(s.click_slot(target, t0).is_empty());
        assert_eq!(s.score(), 0);
        assert_eq!(s.feedback(), None);
    }

    #[test]
    fn start_resets_after_previous_game() {
        let mut s = session(2, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let target = s.round().target_index().unwrap();
        s.click_slot(target, t0);
        s.update(t0 + ms(2000));
        assert_eq!(s.phase(), Phase::Over);
        assert_eq!(s.score(), 1);
        assert_eq!(s.time_left(), 0);

        let t1 = t0 + ms(5000);
        assert_eq!(s.start_game(t1), vec![GameEvent::GameStarted]);
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.score(), 0);
        assert_eq!(s.time_left(), 2);
    }

    #[test]
    fn new_high_score_is_persisted() {
        let mut s = session(1, MemoryStore::with_score(3));
        let t0 = Instant::now();
        s.start_game(t0);
        s.score = 5;
        let events = s.update(t0 + ms(1000));
        assert_eq!(events, vec![GameEvent::GameOver { score: 5, new_high_score: true }]);
        assert_eq!(s.high_score(), 5);
        assert_eq!(s.store.value.as_deref(), Some("5"));
        assert_eq!(s.store.writes, 1);
        assert!(s.new_best());
    }

    #[test]
    fn lower_score_leaves_high_score_untouched() {
        let mut s = session(1, MemoryStore::with_score(10));
        let t0 = Instant::now();
        s.start_game(t0);
        s.score = 2;
        let events = s.update(t0 + ms(1000));
        assert_eq!(events, vec![GameEvent::GameOver { score: 2, new_high_score: false }]);
        assert_eq!(s.high_score(), 10);
        assert_eq!(s.store.writes, 0);
    }

    #[test]
    fn correct_click_scores_then_advances_round() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let serial = s.round_serial();
        let target = s.round().target_index().unwrap();

        let events = s.click_slot(target, t0);
        assert_eq!(events, vec![GameEvent::CorrectPick { index: target }]);
        assert_eq!(s.score(), 1);
        assert_eq!(s.feedback(), Some(Feedback { index: target, kind: FeedbackKind::Correct }));

        assert!(s.update(t0 + ms(299)).is_empty());
        assert!(s.feedback().is_some());

        let events = s.update(t0 + ms(300));
        assert_eq!(events, vec![GameEvent::RoundAdvanced, GameEvent::FeedbackCleared]);
        assert_eq!(s.feedback(), None);
        assert_eq!(s.round_serial(), serial + 1);
        assert!(s.round().target_index().is_some());
    }

    #[test]
    fn wrong_click_keeps_round() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let round = s.round().clone();
        let slot = wrong_slot(&s);

        let events = s.click_slot(slot, t0);
        assert_eq!(events, vec![GameEvent::WrongPick { index: slot }]);
        assert_eq!(s.score(), 0);
        assert_eq!(s.feedback(), Some(Feedback { index: slot, kind: FeedbackKind::Incorrect }));

        assert!(s.update(t0 + ms(499)).is_empty());
        assert_eq!(s.update(t0 + ms(500)), vec![GameEvent::FeedbackCleared]);
        assert_eq!(s.feedback(), None);
        assert_eq!(*s.round(), round);
    }

    #[test]
    fn clicks_during_feedback_are_ignored() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let slot = wrong_slot(&s);
        let target = s.round().target_index().unwrap();
        s.click_slot(slot, t0);
        assert!(s.click_slot(target, t0 + ms(100)).is_empty());
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn countdown_ends_game_exactly_once() {
        let mut s = session(3, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);

        assert!(s.update(t0 + ms(1000)).is_empty());
        assert_eq!(s.time_left(), 2);
        assert!(s.update(t0 + ms(2000)).is_empty());
        assert_eq!(s.time_left(), 1);

        let events = s.update(t0 + ms(3000));
        assert_eq!(events, vec![GameEvent::GameOver { score: 0, new_high_score: false }]);
        assert_eq!(s.phase(), Phase::Over);

        // No dangling ticks
        assert!(s.update(t0 + ms(60_000)).is_empty());
        assert_eq!(s.time_left(), 0);
    }

    #[test]
    fn late_frame_catches_up_on_missed_seconds() {
        let mut s = session(5, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        s.update(t0 + ms(3500));
        assert_eq!(s.time_left(), 2);
    }

    #[test]
    fn game_over_wins_over_pending_round_change() {
        let mut s = session(1, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let target = s.round().target_index().unwrap();
        s.click_slot(target, t0 + ms(800));
        let serial = s.round_serial();

        // Countdown (1000ms) and feedback clear (1100ms) both due
        let events = s.update(t0 + ms(1200));
        assert_eq!(events, vec![GameEvent::GameOver { score: 1, new_high_score: true }]);
        assert_eq!(s.round_serial(), serial);
        assert_eq!(s.feedback(), None);
    }

    #[test]
    fn click_after_time_is_up_does_not_score() {
        let mut s = session(1, MemoryStore::with_score(0));
        let t0 = Instant::now();
        s.start_game(t0);
        let target = s.round().target_index().unwrap();

        let events = s.click_slot(target, t0 + ms(1010));
        assert_eq!(events, vec![GameEvent::GameOver { score: 0, new_high_score: false }]);
        assert_eq!(s.phase(), Phase::Over);
        assert_eq!(s.score(), 0);
        assert_eq!(s.high_score(), 0);
        assert_eq!(s.store.writes, 0);
        // The frame's own update finds nothing left to do
        assert!(s.update(t0 + ms(1010)).is_empty());
    }

    #[test]
    fn click_on_the_final_deadline_does_not_score() {
        let mut s = session(1, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let target = s.round().target_index().unwrap();
        s.click_slot(target, t0 + ms(1000));
        assert_eq!(s.score(), 0);
        assert_eq!(s.phase(), Phase::Over);
    }

    #[test]
    fn click_after_feedback_expired_is_accepted() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let slot = wrong_slot(&s);
        let target = s.round().target_index().unwrap();
        s.click_slot(slot, t0);

        // The 500ms clear is due but no frame has run it yet
        let events = s.click_slot(target, t0 + ms(600));
        assert_eq!(events, vec![GameEvent::FeedbackCleared, GameEvent::CorrectPick { index: target }]);
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn restart_drops_pending_feedback() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        let slot = wrong_slot(&s);
        s.click_slot(slot, t0);

        s.start_game(t0 + ms(100));
        assert_eq!(s.feedback(), None);
        let serial = s.round_serial();
        // The old 500ms clear must not fire into the new game
        assert!(s.update(t0 + ms(600)).is_empty());
        assert_eq!(s.round_serial(), serial);
    }

    #[test]
    fn restart_rearms_countdown() {
        let mut s = session(10, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        s.update(t0 + ms(1000));
        assert_eq!(s.time_left(), 9);

        let t1 = t0 + ms(1500);
        s.start_game(t1);
        // Old cadence (2000ms) must not tick the new game
        s.update(t0 + ms(2000));
        assert_eq!(s.time_left(), 10);
        s.update(t1 + ms(1000));
        assert_eq!(s.time_left(), 9);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut s = session(30, MemoryStore::default());
        let t0 = Instant::now();
        s.start_game(t0);
        assert!(s.click_slot(8, t0).is_empty());
        assert_eq!(s.feedback(), None);
    }
}
