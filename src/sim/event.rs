/// Events emitted by the session.
/// The presentation layer consumes these for sound and haptics.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted,
    CorrectPick { index: usize },
    WrongPick { index: usize },
    RoundAdvanced,
    FeedbackCleared,
    GameOver { score: u32, new_high_score: bool },
}

/// Rumble patterns in milliseconds, alternating on/off.
pub const HAPTIC_CORRECT: &[u32] = &[50];
pub const HAPTIC_INCORRECT: &[u32] = &[100, 50, 100];
