/// High score persistence.
///
/// The session only sees the `HighScoreStore` trait. `FileStore` keeps a
/// single key-value line on disk:
///
///   emojiGameHighScore=<decimal>
///
/// Missing file, missing key or a non-numeric value all read as 0.

use std::path::{Path, PathBuf};

use log::warn;

use crate::error::GameError;

pub const HIGH_SCORE_KEY: &str = "emojiGameHighScore";

const STORE_FILE: &str = "highscore.dat";

pub trait HighScoreStore {
    fn load(&self) -> u32;
    fn save(&mut self, score: u32) -> Result<(), GameError>;
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store in the default data directory.
    pub fn open_default() -> Self {
        FileStore::at(data_dir().join(STORE_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for FileStore {
    fn load(&self) -> u32 {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_high_score(&content),
            Err(_) => 0,
        }
    }

    fn save(&mut self, score: u32) -> Result<(), GameError> {
        std::fs::write(&self.path, format!("{}={}\n", HIGH_SCORE_KEY, score))?;
        Ok(())
    }
}

fn parse_high_score(content: &str) -> u32 {
    for line in content.lines() {
        let Some((key, val)) = line.split_once('=') else { continue };
        if key.trim() != HIGH_SCORE_KEY {
            continue;
        }
        return match val.trim().parse::<u32>() {
            Ok(v) => v,
            Err(_) => {
                warn!("ignoring non-numeric high score {:?}", val.trim());
                0
            }
        };
    }
    0
}

/// Writable directory for the high score and log file.
///
/// Order: exe directory (portable installs), `~/.local/share/emoji-tap`,
/// then the current directory.
pub fn data_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ are read-only
            let probe = parent.join(".write_test_emoji_tap");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/emoji-tap");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

/// Keeps the score in memory and counts writes.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub value: Option<String>,
    pub writes: usize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_score(score: u32) -> Self {
        MemoryStore { value: Some(score.to_string()), writes: 0 }
    }
}

#[cfg(test)]
impl HighScoreStore for MemoryStore {
    fn load(&self) -> u32 {
        self.value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    fn save(&mut self, score: u32) -> Result<(), GameError> {
        self.value = Some(score.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("emoji_tap_{}_{}", name, std::process::id()))
    }

    #[test]
    fn parses_stored_value() {
        assert_eq!(parse_high_score("emojiGameHighScore=42\n"), 42);
        assert_eq!(parse_high_score("other=1\nemojiGameHighScore = 7\n"), 7);
    }

    #[test]
    fn bad_or_missing_values_read_as_zero() {
        assert_eq!(parse_high_score(""), 0);
        assert_eq!(parse_high_score("emojiGameHighScore=lots"), 0);
        assert_eq!(parse_high_score("emojiGameHighScore=-3"), 0);
        assert_eq!(parse_high_score("somethingElse=9"), 0);
    }

    #[test]
    fn missing_file_reads_as_zero() {
        let store = FileStore::at(temp_path("missing"));
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn file_store_persists_decimal_string() {
        let path = temp_path("persist");
        let mut store = FileStore::at(&path);
        store.save(5).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "emojiGameHighScore=5");
        assert_eq!(FileStore::at(&path).load(), 5);
        let _ = std::fs::remove_file(&path);
    }
}
