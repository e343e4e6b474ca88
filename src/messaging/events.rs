/// Status events
///
/// Events report transitions that already happened to a player (past tense).
/// They are broadcast to every status subscriber.
use serde::Serialize;
use std::fmt;

/// Kind of status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// A player was created for the key
    Added,

    /// Playback actually began
    Started,

    /// Playback was paused
    Paused,

    /// The player was released; always the last event for a key
    Removed,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Added => write!(f, "added"),
            StatusKind::Started => write!(f, "started"),
            StatusKind::Paused => write!(f, "paused"),
            StatusKind::Removed => write!(f, "removed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub sound_key: String,
}

impl StatusEvent {
    pub fn new(kind: StatusKind, sound_key: impl Into<String>) -> Self {
        Self {
            kind,
            sound_key: sound_key.into(),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        format!("{} {}", self.sound_key, self.kind)
    }
}
