/// Silent player backend
///
/// Tracks playback state, volume and ramps exactly like a real backend but
/// never touches an output device. Every call is kept in a journal, which
/// makes it the backend of choice for dry runs and tests.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::fade::{start_ramp, FadeRamp, RampGeneration};
use super::player::{fire, Callback, OnceCallbacks, PlayerConfig, PlayerEvent, PlayerFactory, SoundPlayer};
use crate::error::PlayerError;
use crate::scheduler::Scheduler;

/// A call made on a [`SilentPlayer`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Stop,
    Unload,
    SetLooping(bool),
    SetVolume(f32),
    Fade { from: f32, to: f32, duration: Duration },
}

#[derive(Debug)]
struct SilentState {
    playing: bool,
    looping: bool,
    volume: f32,
    loaded: bool,
    callbacks: OnceCallbacks,
    journal: Vec<PlayerCall>,
}

/// Headless player
pub struct SilentPlayer {
    sound_key: String,
    scheduler: Arc<dyn Scheduler>,
    state: Arc<Mutex<SilentState>>,
    ramps: RampGeneration,
}

impl SilentPlayer {
    pub fn new(sound_key: &str, config: PlayerConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            sound_key: sound_key.to_string(),
            scheduler,
            state: Arc::new(Mutex::new(SilentState {
                playing: false,
                looping: config.looping,
                volume: config.volume.clamp(0.0, 1.0),
                loaded: true,
                callbacks: OnceCallbacks::new(),
                journal: Vec::new(),
            })),
            ramps: RampGeneration::new(),
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<PlayerCall> {
        self.state.lock().journal.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&PlayerCall) -> bool) -> usize {
        self.state.lock().journal.iter().filter(|c| predicate(c)).count()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    fn record(&self, call: PlayerCall) {
        self.state.lock().journal.push(call);
    }
}

impl SoundPlayer for SilentPlayer {
    fn play(&self) -> Result<(), PlayerError> {
        {
            let mut state = self.state.lock();
            state.journal.push(PlayerCall::Play);
            if !state.loaded {
                return Err(PlayerError::Unloaded(self.sound_key.clone()));
            }
            state.playing = true;
        }

        let state = Arc::clone(&self.state);
        self.scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                let callbacks = state.lock().callbacks.take(PlayerEvent::Play);
                fire(callbacks);
            }),
        );
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.journal.push(PlayerCall::Pause);
        state.playing = false;
    }

    fn stop(&self) {
        self.ramps.bump();
        let mut state = self.state.lock();
        state.journal.push(PlayerCall::Stop);
        state.playing = false;
    }

    fn unload(&self) {
        self.ramps.bump();
        let mut state = self.state.lock();
        state.journal.push(PlayerCall::Unload);
        state.playing = false;
        state.loaded = false;
        state.callbacks.clear();
    }

    fn playing(&self) -> bool {
        self.state.lock().playing
    }

    fn looping(&self) -> bool {
        self.state.lock().looping
    }

    fn set_looping(&self, looping: bool) {
        let mut state = self.state.lock();
        state.journal.push(PlayerCall::SetLooping(looping));
        state.looping = looping;
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        state.journal.push(PlayerCall::SetVolume(volume));
        state.volume = volume.clamp(0.0, 1.0);
    }

    fn fade(&self, from: f32, to: f32, duration: Duration) {
        self.record(PlayerCall::Fade { from, to, duration });

        let ramp = FadeRamp::new(from, to, duration);
        self.state.lock().volume = ramp.from;

        let apply_state = Arc::clone(&self.state);
        let done_state = Arc::clone(&self.state);
        start_ramp(
            self.scheduler.as_ref(),
            &self.ramps,
            ramp,
            move |volume| apply_state.lock().volume = volume,
            move || {
                let callbacks = done_state.lock().callbacks.take(PlayerEvent::Fade);
                fire(callbacks);
            },
        );
    }

    fn once(&self, event: PlayerEvent, callback: Callback) {
        let mut state = self.state.lock();
        if state.loaded {
            state.callbacks.register(event, callback);
        }
    }
}

/// Factory for [`SilentPlayer`]s
///
/// Keeps every player it built so callers can inspect their journals.
pub struct SilentFactory {
    scheduler: Arc<dyn Scheduler>,
    created: Mutex<Vec<Arc<SilentPlayer>>>,
    missing: HashSet<String>,
}

impl SilentFactory {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            created: Mutex::new(Vec::new()),
            missing: HashSet::new(),
        }
    }

    /// Pretend these keys have no audio behind them
    pub fn with_missing<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Number of players constructed so far
    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Most recently constructed player for `sound_key`
    pub fn player(&self, sound_key: &str) -> Option<Arc<SilentPlayer>> {
        self.created
            .lock()
            .iter()
            .rev()
            .find(|p| p.sound_key == sound_key)
            .cloned()
    }
}

impl PlayerFactory for SilentFactory {
    fn create(
        &self,
        sound_key: &str,
        config: PlayerConfig,
    ) -> Result<Arc<dyn SoundPlayer>, PlayerError> {
        if self.missing.contains(sound_key) {
            return Err(PlayerError::NotFound {
                key: sound_key.to_string(),
            });
        }

        let player = Arc::new(SilentPlayer::new(
            sound_key,
            config,
            Arc::clone(&self.scheduler),
        ));
        self.created.lock().push(Arc::clone(&player));
        tracing::debug!("Silent player ready for {}", sound_key);
        Ok(player)
    }
}
