/// Remote commands
///
/// Commands arrive one at a time from the decoding layer. They name a sound
/// and what should happen to it.
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Playback actions a remote sender can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Play,
    Pause,
    Stop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Play => write!(f, "play"),
            Action::Pause => write!(f, "pause"),
            Action::Stop => write!(f, "stop"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "play" => Ok(Action::Play),
            "pause" => Ok(Action::Pause),
            "stop" => Ok(Action::Stop),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// A single remote command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub sound_key: String,

    /// `None` applies volume/loop settings to an existing player
    #[serde(default, deserialize_with = "lenient_action")]
    pub action: Option<Action>,

    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub is_looping: bool,
}

fn default_volume() -> f32 {
    1.0
}

/// Anything but a known action string takes the same path as a missing action
fn lenient_action<'de, D>(deserializer: D) -> Result<Option<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(|s| s.parse().ok()))
}

impl Command {
    pub fn new(sound_key: impl Into<String>, action: Option<Action>) -> Self {
        Self {
            sound_key: sound_key.into(),
            action,
            volume: default_volume(),
            is_looping: false,
        }
    }

    pub fn create(sound_key: impl Into<String>) -> Self {
        Self::new(sound_key, Some(Action::Create))
    }

    pub fn play(sound_key: impl Into<String>) -> Self {
        Self::new(sound_key, Some(Action::Play))
    }

    pub fn pause(sound_key: impl Into<String>) -> Self {
        Self::new(sound_key, Some(Action::Pause))
    }

    pub fn stop(sound_key: impl Into<String>) -> Self {
        Self::new(sound_key, Some(Action::Stop))
    }

    /// Live parameter update with no state change
    pub fn adjust(sound_key: impl Into<String>) -> Self {
        Self::new(sound_key, None)
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn looping(mut self, is_looping: bool) -> Self {
        self.is_looping = is_looping;
        self
    }

    /// Requested volume clamped to 0.0-1.0
    pub fn target_volume(&self) -> f32 {
        if self.volume.is_nan() {
            return 0.0;
        }
        self.volume.clamp(0.0, 1.0)
    }

    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self.action {
            Some(action) => format!("{} {}", action, self.sound_key),
            None => format!(
                "adjust {} (volume {:.2}, looping {})",
                self.sound_key, self.volume, self.is_looping
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_command() {
        let cmd: Command = serde_json::from_str(
            r#"{"soundKey":"rain","action":"play","volume":0.4,"isLooping":true}"#,
        )
        .unwrap();

        assert_eq!(cmd.sound_key, "rain");
        assert_eq!(cmd.action, Some(Action::Play));
        assert_eq!(cmd.volume, 0.4);
        assert!(cmd.is_looping);
    }

    #[test]
    fn test_unknown_action_decodes_as_none() {
        let cmd: Command =
            serde_json::from_str(r#"{"soundKey":"rain","action":"rewind","volume":0.2}"#).unwrap();
        assert_eq!(cmd.action, None);

        let cmd: Command =
            serde_json::from_str(r#"{"soundKey":"rain","action":null}"#).unwrap();
        assert_eq!(cmd.action, None);
        assert_eq!(cmd.volume, 1.0);
        assert!(!cmd.is_looping);
    }

    #[test]
    fn test_non_string_action_keeps_the_volume_update() {
        for action in ["3", "true", "{\"name\":\"play\"}", "[\"stop\"]"] {
            let line = format!(
                r#"{{"soundKey":"rain","action":{},"volume":0.3,"isLooping":true}}"#,
                action
            );
            let cmd: Command = serde_json::from_str(&line).unwrap();
            assert_eq!(cmd.action, None);
            assert_eq!(cmd.volume, 0.3);
            assert!(cmd.is_looping);
        }
    }

    #[test]
    fn test_action_parsing_is_case_insensitive() {
        assert_eq!("STOP".parse::<Action>(), Ok(Action::Stop));
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn test_target_volume_is_clamped() {
        assert_eq!(Command::adjust("a").with_volume(1.7).target_volume(), 1.0);
        assert_eq!(Command::adjust("a").with_volume(-0.3).target_volume(), 0.0);
        assert_eq!(Command::adjust("a").with_volume(f32::NAN).target_volume(), 0.0);
    }

    #[test]
    fn test_command_description() {
        assert_eq!(Command::stop("wind").description(), "stop wind");
        assert!(Command::adjust("wind").description().starts_with("adjust wind"));
    }
}
