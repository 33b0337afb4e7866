/// Round generation: unbiased shuffling and target selection.
///
/// Both functions take the random source explicitly so the session can
/// own a single RNG and tests can seed it.

use rand::Rng;

use super::emoji::{Catalog, Emoji};

/// One target plus the options shown alongside it.
///
/// Invariant: `options` are distinct and contain `target` exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub target: Emoji,
    pub options: Vec<Emoji>,
}

impl Round {
    /// Slot index of the target within `options`.
    pub fn target_index(&self) -> Option<usize> {
        self.options.iter().position(|e| *e == self.target)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeedbackKind {
    Correct,
    Incorrect,
}

/// Verdict on the most recently clicked slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Feedback {
    pub index: usize,
    pub kind: FeedbackKind,
}

/// Fisher-Yates: walk from the last index down, swapping each slot with a
/// uniformly chosen slot in `[0, i]`. The input is left untouched.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.gen_range(0..=i);
        out.swap(i, j);
    }
    out
}

/// Draw `options_count` distinct emojis, pick one as the target, then
/// reshuffle so the target's slot is independent of how it was picked.
///
/// `Catalog` guarantees at least `options_count` entries, so this cannot fail.
pub fn generate_round<R: Rng + ?Sized>(catalog: &Catalog, options_count: usize, rng: &mut R) -> Round {
    let mut picked = shuffle(catalog.emojis(), rng);
    picked.truncate(options_count);
    let target = picked[rng.gen_range(0..picked.len())].clone();
    let options = shuffle(&picked, rng);
    Round { target, options }
}
