//! User settings (config.toml in the platform config directory)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sequencer::playback::{DEFAULT_BPM, DEFAULT_RESOLUTION};

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tempo: TempoConfig,
    #[serde(default)]
    pub midi: MidiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    /// Ticks per quarter note.
    #[serde(default = "default_resolution")]
    pub resolution: u16,
    #[serde(default = "default_up_factor")]
    pub up_factor: f32,
    #[serde(default = "default_down_factor")]
    pub down_factor: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiConfig {
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Output port connected at startup.
    #[serde(default)]
    pub port: Option<String>,
}

fn default_bpm() -> f32 {
    DEFAULT_BPM
}

fn default_resolution() -> u16 {
    DEFAULT_RESOLUTION
}

fn default_up_factor() -> f32 {
    1.3
}

fn default_down_factor() -> f32 {
    0.97
}

fn default_client_name() -> String {
    "BeatBox".to_string()
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            resolution: default_resolution(),
            up_factor: default_up_factor(),
            down_factor: default_down_factor(),
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            port: None,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "beatbox", "beatbox")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn load() -> Config {
    config_dir()
        .map(|dir| load_from(&dir.join(CONFIG_FILE)))
        .unwrap_or_default()
}

/// Read settings from `path`, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    toml::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("ignoring invalid {}: {}", path.display(), e);
        Config::default()
    })
}

pub fn save(config: &Config) -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(&dir)?;
        save_to(&dir.join(CONFIG_FILE), config)?;
    }
    Ok(())
}

pub fn save_to(path: &Path, config: &Config) -> std::io::Result<()> {
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!((config.tempo.bpm - 120.0).abs() < f32::EPSILON);
        assert_eq!(config.tempo.resolution, 4);
        assert!((config.tempo.up_factor - 1.3).abs() < f32::EPSILON);
        assert!((config.tempo.down_factor - 0.97).abs() < f32::EPSILON);
        assert_eq!(config.midi.client_name, "BeatBox");
        assert_eq!(config.midi.port, None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[tempo]\nbpm = 90.0\n").unwrap();
        assert!((config.tempo.bpm - 90.0).abs() < f32::EPSILON);
        assert_eq!(config.tempo.resolution, 4);
        assert_eq!(config.midi, MidiConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = Config::default();
        config.midi.port = Some("IAC Driver Bus 1".to_string());
        config.tempo.bpm = 100.0;

        save_to(&path, &config).unwrap();
        assert_eq!(load_from(&path), config);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "tempo = [").unwrap();
        assert_eq!(load_from(&path), Config::default());
        assert_eq!(load_from(&dir.path().join("missing.toml")), Config::default());
    }
}
