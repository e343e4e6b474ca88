use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio_system::{ManagerSettings, DEFAULT_FADE_MS, DEFAULT_IDLE_TIMEOUT_MS};
use crate::error::ConfigError;

/// Which player backend the receiver drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Real output through the default audio device
    Rodio,

    /// No output device, useful for dry runs
    Silent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one audio file per sound key
    pub sound_dir: PathBuf,

    /// File extensions probed in order when resolving a sound key
    pub extensions: Vec<String>,

    /// Duration of every fade (in, out and live volume changes)
    pub fade_ms: u64,

    /// Quiet period after the last sound is released
    pub idle_timeout_ms: u64,

    pub backend: Backend,

    /// Stop the receiver when the idle timeout elapses
    pub exit_on_idle_timeout: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sound_dir: PathBuf::from("sounds"),
            extensions: vec![
                "mp3".to_string(),
                "ogg".to_string(),
                "wav".to_string(),
                "flac".to_string(),
            ],
            fade_ms: DEFAULT_FADE_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            backend: Backend::Rodio,
            exit_on_idle_timeout: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, creating a default file if missing
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
            let config: Config =
                serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })?;
            config.validate()?;

            tracing::info!("Loaded config from: {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default config at: {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: e,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(Box::new(e)))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;

        Ok(())
    }

    /// Default config file location in the platform config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("AmbienceReceiver").join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one audio file extension is required".to_string(),
            ));
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve `sound_dir` against the directory holding the config file
    pub fn sound_dir_relative_to(&self, config_path: &Path) -> PathBuf {
        if self.sound_dir.is_absolute() {
            return self.sound_dir.clone();
        }
        config_path
            .parent()
            .map(|dir| dir.join(&self.sound_dir))
            .unwrap_or_else(|| self.sound_dir.clone())
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            fade: Duration::from_millis(self.fade_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}
