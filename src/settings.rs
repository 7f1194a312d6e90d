// Engine settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::audio::decoder::DEFAULT_MAX_CHUNK_FRAMES;
use crate::error::SettingsError;

/// Output device settings
///
/// The sample format itself is fixed (S16 stereo 44.1kHz) and not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub buffer_frames: u32, // Device block size request, 0 = platform default
    pub device_name: Option<String>, // None = default output device
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            buffer_frames: 4096,
            device_name: None,
        }
    }
}

/// Decode settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    pub max_chunk_frames: usize,
    pub timeout_ms: Option<u64>, // Upper bound on one session's decode time
    pub background: bool,        // Decode on a worker thread instead of the caller's
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            max_chunk_frames: DEFAULT_MAX_CHUNK_FRAMES,
            timeout_ms: None,
            background: false,
        }
    }
}

impl DecodeSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Main engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub version: i32, // Settings schema version for future migrations
    pub output: OutputSettings,
    pub decode: DecodeSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: 1,
            output: OutputSettings::default(),
            decode: DecodeSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Get the settings file path
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::settings_path(dir);

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings: EngineSettings = serde_json::from_str(&content)?;

        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, dir: &Path) -> Result<(), SettingsError> {
        fs::create_dir_all(dir)?;

        let path = Self::settings_path(dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;

        info!("Saved settings to {:?}", path);
        Ok(())
    }
}
