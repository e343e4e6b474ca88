/// Sound player capability
///
/// The manager only talks to players through [`SoundPlayer`], so backends
/// (rodio output, a silent journal, a native mixer) can be swapped without
/// touching the orchestration logic.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PlayerError;

/// One-shot callback
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Events a player reports through [`SoundPlayer::once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerEvent {
    /// Playback actually started after `play()`
    Play,

    /// A fade ramp reached its target
    Fade,
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerEvent::Play => write!(f, "play"),
            PlayerEvent::Fade => write!(f, "fade"),
        }
    }
}

/// Construction settings for a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    pub looping: bool,
    pub volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            looping: false,
            volume: 0.0,
        }
    }
}

/// Per-sound playback capability
///
/// Everything is effectively synchronous except `play` and `fade`, whose
/// completion is reported through `once`.
pub trait SoundPlayer: Send + Sync {
    fn play(&self) -> Result<(), PlayerError>;

    fn pause(&self);

    fn stop(&self);

    /// Release every resource; the player must not be used afterwards
    fn unload(&self);

    fn playing(&self) -> bool;

    fn looping(&self) -> bool;

    fn set_looping(&self, looping: bool);

    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);

    /// Ramp volume from `from` to `to`, fires [`PlayerEvent::Fade`] when done
    fn fade(&self, from: f32, to: f32, duration: Duration);

    /// Run `callback` the next time `event` fires, then discard it
    fn once(&self, event: PlayerEvent, callback: Callback);
}

/// Constructs a player per sound key
pub trait PlayerFactory: Send + Sync {
    fn create(
        &self,
        sound_key: &str,
        config: PlayerConfig,
    ) -> Result<Arc<dyn SoundPlayer>, PlayerError>;
}

/// Pending one-shot callbacks, keyed by event
#[derive(Default)]
pub struct OnceCallbacks {
    slots: HashMap<PlayerEvent, Vec<Callback>>,
}

impl OnceCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event: PlayerEvent, callback: Callback) {
        self.slots.entry(event).or_default().push(callback);
    }

    /// Remove the callbacks for `event` so they can run outside any lock
    pub fn take(&mut self, event: PlayerEvent) -> Vec<Callback> {
        self.slots.remove(&event).unwrap_or_default()
    }

    pub fn pending(&self, event: PlayerEvent) -> usize {
        self.slots.get(&event).map(Vec::len).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl fmt::Debug for OnceCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceCallbacks")
            .field("play", &self.pending(PlayerEvent::Play))
            .field("fade", &self.pending(PlayerEvent::Fade))
            .finish()
    }
}

/// Run callbacks taken from [`OnceCallbacks::take`]
pub fn fire(callbacks: Vec<Callback>) {
    for callback in callbacks {
        callback();
    }
}
