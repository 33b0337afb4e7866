/// Emoji symbols and the catalog rounds are drawn from.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::GameError;

/// Built-in catalog used when `config.toml` does not override it.
pub const EMOJIS: &[&str] = &[
    "😀", "😂", "😍", "😎", "🤔", "😴", "🥳", "😱",
    "🐶", "🐱", "🦊", "🐼", "🐸", "🐵", "🦄", "🐙",
    "🍎", "🍕", "🍩", "🍉", "🌵", "🌈", "⚽", "🚀",
];

/// An opaque symbol. Cloning shares the underlying string.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Emoji(Arc<str>);

impl Emoji {
    pub fn new(symbol: &str) -> Self {
        Emoji(Arc::from(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated set of distinct emojis, large enough for one round.
#[derive(Clone, Debug)]
pub struct Catalog {
    emojis: Vec<Emoji>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicates and catalogs smaller than
    /// `options_count`.
    pub fn new<S: AsRef<str>>(symbols: &[S], options_count: usize) -> Result<Self, GameError> {
        if options_count == 0 {
            return Err(GameError::InvalidSetting("options_count"));
        }

        let mut seen = HashSet::with_capacity(symbols.len());
        let mut emojis = Vec::with_capacity(symbols.len());
        for s in symbols {
            let s = s.as_ref();
            if !seen.insert(s) {
                return Err(GameError::DuplicateEmoji(s.to_string()));
            }
            emojis.push(Emoji::new(s));
        }

        if emojis.len() < options_count {
            return Err(GameError::CatalogTooSmall {
                catalog: emojis.len(),
                options: options_count,
            });
        }

        Ok(Catalog { emojis })
    }

    pub fn emojis(&self) -> &[Emoji] {
        &self.emojis
    }

    pub fn len(&self) -> usize {
        self.emojis.len()
    }
}
