/// Error types shared across the game.
///
/// Configuration errors are fatal at startup. Storage and audio errors
/// are logged and the game carries on without them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("emoji catalog has {catalog} entries but each round needs {options}")]
    CatalogTooSmall { catalog: usize, options: usize },
    #[error("emoji catalog lists {0:?} more than once")]
    DuplicateEmoji(String),
    #[error("invalid setting: {0} must be greater than zero")]
    InvalidSetting(&'static str),
    #[error("high score storage failed")]
    Storage(#[from] std::io::Error),
    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),
}
