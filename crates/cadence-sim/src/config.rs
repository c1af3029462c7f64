//! Configuration loading and typed config structures for the demo driver.
//!
//! The canonical configuration lives in `cadence-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure and provides a loader that reads the file; a missing
//! file falls back to defaults.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level driver configuration.
///
/// Mirrors the structure of `cadence-config.yaml`. All fields have
/// defaults, so an empty or missing file produces a runnable setup.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DriverConfig {
    /// Status server settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Playthrough script generation settings.
    #[serde(default)]
    pub playthrough: PlaythroughSection,

    /// Metadata of the scripted song.
    #[serde(default)]
    pub song: SongSection,
}

impl DriverConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Status server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Playthrough script generation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaythroughSection {
    /// Seed for the script RNG; identical seeds replay identically.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds per owner-loop iteration.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Number of objects (notes and bombs) in the scripted map.
    #[serde(default = "default_notes_count")]
    pub notes_count: u32,

    /// Beats between consecutive objects.
    #[serde(default = "default_note_interval_beats")]
    pub note_interval_beats: f32,

    /// Every Nth object is a bomb (0 disables bombs).
    #[serde(default = "default_bomb_every")]
    pub bomb_every: u32,

    /// Every Nth note is missed (0 plays a perfect run).
    #[serde(default = "default_miss_every")]
    pub miss_every: u32,

    /// How many sessions to play before exiting (0 = loop forever).
    #[serde(default)]
    pub repeat: u32,

    /// Optional path to a cover image embedded into the content metadata.
    #[serde(default)]
    pub cover_path: Option<String>,

    /// Whether the no-direction modifier is active for the session.
    #[serde(default)]
    pub no_arrows: bool,

    /// Whether the No Fail modifier is active for the session.
    #[serde(default = "default_true")]
    pub no_fail: bool,
}

impl Default for PlaythroughSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            notes_count: default_notes_count(),
            note_interval_beats: default_note_interval_beats(),
            bomb_every: default_bomb_every(),
            miss_every: default_miss_every(),
            repeat: 0,
            cover_path: None,
            no_arrows: false,
            no_fail: true,
        }
    }
}

/// Metadata of the scripted song.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongSection {
    /// Song title.
    #[serde(default = "default_song_name")]
    pub name: String,

    /// Performing artist.
    #[serde(default = "default_author_name")]
    pub author_name: String,

    /// Mapper credit.
    #[serde(default = "default_level_author_name")]
    pub level_author_name: String,

    /// Beats per minute.
    #[serde(default = "default_bpm")]
    pub bpm: f32,

    /// Difficulty name.
    #[serde(default = "default_difficulty")]
    pub difficulty: String,

    /// Environment (stage) name.
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for SongSection {
    fn default() -> Self {
        Self {
            name: default_song_name(),
            author_name: default_author_name(),
            level_author_name: default_level_author_name(),
            bpm: default_bpm(),
            difficulty: default_difficulty(),
            environment: default_environment(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    6557
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    16
}

const fn default_notes_count() -> u32 {
    64
}

const fn default_note_interval_beats() -> f32 {
    1.0
}

const fn default_bomb_every() -> u32 {
    16
}

const fn default_miss_every() -> u32 {
    11
}

fn default_song_name() -> String {
    "Scripted Run".to_owned()
}

fn default_author_name() -> String {
    "Cadence".to_owned()
}

fn default_level_author_name() -> String {
    "cadence-sim".to_owned()
}

const fn default_bpm() -> f32 {
    128.0
}

fn default_difficulty() -> String {
    "Expert".to_owned()
}

fn default_environment() -> String {
    "DefaultEnvironment".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DriverConfig::default();
        assert_eq!(config.server.port, 6557);
        assert_eq!(config.playthrough.seed, 42);
        assert_eq!(config.playthrough.notes_count, 64);
        assert_eq!(config.song.difficulty, "Expert");
    }

    #[test]
    fn parse_partial_yaml_keeps_other_defaults() {
        let yaml = "server:\n  port: 7070\nplaythrough:\n  seed: 7\n";
        let config = DriverConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.playthrough.seed, 7);
        // Untouched sections keep defaults.
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.song.bpm, 128.0);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = DriverConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9000

playthrough:
  seed: 1234
  tick_interval_ms: 8
  notes_count: 32
  note_interval_beats: 0.5
  bomb_every: 8
  miss_every: 5
  repeat: 2
  no_arrows: true
  no_fail: false

song:
  name: "Config Song"
  author_name: "Config Artist"
  level_author_name: "Config Mapper"
  bpm: 174.0
  difficulty: "ExpertPlus"
  environment: "BigMirror"
"#;
        let config = DriverConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.playthrough.repeat, 2);
        assert!(config.playthrough.no_arrows);
        assert!(!config.playthrough.no_fail);
        assert_eq!(config.song.name, "Config Song");
        assert_eq!(config.song.environment, "BigMirror");
    }
}
