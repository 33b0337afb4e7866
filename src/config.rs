/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Values are fixed for the lifetime of the process.

use std::path::PathBuf;

use log::{info, warn};
use serde::Deserialize;

use crate::domain::emoji::{Catalog, EMOJIS};
use crate::error::GameError;
use crate::sim::session::Rules;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub game: GameSettings,
    pub sound: SoundConfig,
    pub display: DisplayConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug)]
pub struct GameSettings {
    pub duration_s: u32,
    pub options_count: usize,
    pub emojis: Vec<String>,
    pub grid_columns: usize,
}

#[derive(Clone, Debug)]
pub struct SoundConfig {
    pub start_muted: bool,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub frame_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub select: Vec<String>,
    pub start: Vec<String>,
    pub mute: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    game: TomlGame,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGame {
    #[serde(default = "default_duration")]
    duration_s: u32,
    #[serde(default = "default_options_count")]
    options_count: usize,
    #[serde(default = "default_emojis")]
    emojis: Vec<String>,
    #[serde(default = "default_grid_columns")]
    grid_columns: usize,
}

#[derive(Deserialize, Debug, Default)]
struct TomlSound {
    #[serde(default)]
    start_muted: bool,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_select")]
    select: Vec<String>,
    #[serde(default = "default_pad_start")]
    start: Vec<String>,
    #[serde(default = "default_pad_mute")]
    mute: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_duration() -> u32 { 30 }
fn default_options_count() -> usize { 8 }
fn default_emojis() -> Vec<String> { EMOJIS.iter().map(|s| s.to_string()).collect() }
fn default_grid_columns() -> usize { 4 }
fn default_frame_ms() -> u64 { 16 }

fn default_pad_select() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_pad_start() -> Vec<String> { vec!["Start".into()] }
fn default_pad_mute() -> Vec<String> { vec!["Y".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGame {
    fn default() -> Self {
        TomlGame {
            duration_s: default_duration(),
            options_count: default_options_count(),
            emojis: default_emojis(),
            grid_columns: default_grid_columns(),
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay { frame_ms: default_frame_ms() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            select: default_pad_select(),
            start: default_pad_start(),
            mute: default_pad_mute(),
            quit: default_pad_quit(),
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        GameConfig {
            game: GameSettings {
                duration_s: t.game.duration_s,
                options_count: t.game.options_count,
                emojis: t.game.emojis,
                grid_columns: t.game.grid_columns.max(1),
            },
            sound: SoundConfig { start_muted: t.sound.start_muted },
            display: DisplayConfig { frame_ms: t.display.frame_ms.max(1) },
            gamepad: GamepadConfig {
                select: t.gamepad.select,
                start: t.gamepad.start,
                mute: t.gamepad.mute,
                quit: t.gamepad.quit,
            },
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) ~/.local/share/emoji-tap.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        load_toml(&candidate_dirs()).into()
    }

    /// Parse config text; used by `load` and tests.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(Into::into)
    }

    /// Validate the game settings into session rules.
    /// Any error here is a configuration bug and fatal at startup.
    pub fn rules(&self) -> Result<Rules, GameError> {
        if self.game.duration_s == 0 {
            return Err(GameError::InvalidSetting("duration_s"));
        }
        let catalog = Catalog::new(&self.game.emojis, self.game.options_count)?;
        Ok(Rules {
            catalog,
            options_count: self.game.options_count,
            duration_s: self.game.duration_s,
        })
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        TomlConfig::default().into()
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/emoji-tap");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    info!("loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    warn!("config.toml parse error: {e}; using default settings");
                    return TomlConfig::default();
                }
            },
            Err(e) => warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.game.duration_s, 30);
        assert_eq!(cfg.game.options_count, 8);
        assert_eq!(cfg.game.emojis.len(), EMOJIS.len());
        assert_eq!(cfg.game.grid_columns, 4);
        assert!(!cfg.sound.start_muted);
        assert_eq!(cfg.gamepad.start, vec!["Start".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str("[game]\nduration_s = 10\n[sound]\nstart_muted = true\n").unwrap();
        assert_eq!(cfg.game.duration_s, 10);
        assert_eq!(cfg.game.options_count, 8);
        assert!(cfg.sound.start_muted);
    }

    #[test]
    fn default_rules_are_valid() {
        let rules = GameConfig::default().rules().unwrap();
        assert_eq!(rules.options_count, 8);
        assert_eq!(rules.duration_s, 30);
    }

    #[test]
    fn small_catalog_is_fatal() {
        let cfg = GameConfig::from_toml_str("[game]\noptions_count = 3\nemojis = [\"🐶\", \"🐱\"]\n").unwrap();
        assert!(matches!(cfg.rules(), Err(GameError::CatalogTooSmall { catalog: 2, options: 3 })));
    }

    #[test]
    fn zero_duration_is_fatal() {
        let cfg = GameConfig::from_toml_str("[game]\nduration_s = 0\n").unwrap();
        assert!(matches!(cfg.rules(), Err(GameError::InvalidSetting("duration_s"))));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(GameConfig::from_toml_str("[game\nduration_s = ").is_err());
    }
}
