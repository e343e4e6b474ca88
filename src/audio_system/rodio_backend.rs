/// Rodio player backend
///
/// Each sound gets its own `Sink` on a shared output stream. Audio is
/// preloaded into memory and decoded fresh on every start, so repeated
/// plays never touch the disk. Looping re-decodes one pass at a time, so the
/// loop flag can change while the sink is playing.
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rodio::{Decoder, OutputStreamHandle, Sample, Sink, Source};

use super::fade::{start_ramp, FadeRamp, RampGeneration};
use super::player::{fire, Callback, OnceCallbacks, PlayerConfig, PlayerEvent, PlayerFactory, SoundPlayer};
use super::source::SoundLibrary;
use crate::error::PlayerError;
use crate::scheduler::Scheduler;

/// Plays `current` to its end, then asks `next_pass` for another pass while
/// the shared loop flag is set
pub struct LoopingSource<S, F> {
    current: S,
    next_pass: F,
    looping: Arc<AtomicBool>,
}

impl<S, F> LoopingSource<S, F>
where
    S: Source,
    S::Item: Sample,
    F: FnMut() -> Option<S>,
{
    pub fn new(first: S, next_pass: F, looping: Arc<AtomicBool>) -> Self {
        Self {
            current: first,
            next_pass,
            looping,
        }
    }
}

impl<S, F> Iterator for LoopingSource<S, F>
where
    S: Source,
    S::Item: Sample,
    F: FnMut() -> Option<S>,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        if let Some(sample) = self.current.next() {
            return Some(sample);
        }
        if !self.looping.load(Ordering::Acquire) {
            return None;
        }
        self.current = (self.next_pass)()?;
        self.current.next()
    }
}

impl<S, F> Source for LoopingSource<S, F>
where
    S: Source,
    S::Item: Sample,
    F: FnMut() -> Option<S>,
{
    fn current_frame_len(&self) -> Option<usize> {
        // Every pass shares one format, so an exhausted pass is not a boundary
        match self.current.current_frame_len() {
            Some(0) if self.looping.load(Ordering::Acquire) => None,
            len => len,
        }
    }

    fn channels(&self) -> u16 {
        self.current.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.current.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Player backed by a rodio sink
pub struct RodioPlayer {
    sound_key: String,
    sink: Arc<Sink>,
    audio_data: Mutex<Option<Arc<Vec<u8>>>>,
    looping: Arc<AtomicBool>,
    callbacks: Arc<Mutex<OnceCallbacks>>,
    ramps: RampGeneration,
    scheduler: Arc<dyn Scheduler>,
}

impl RodioPlayer {
    /// Create a player from preloaded audio bytes
    pub fn new(
        sound_key: &str,
        audio_data: Arc<Vec<u8>>,
        config: PlayerConfig,
        stream_handle: &OutputStreamHandle,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, PlayerError> {
        let sink = Sink::try_new(stream_handle)
            .map_err(|e| PlayerError::StreamInitFailed(Box::new(e)))?;

        // Verify the audio can be decoded before anyone asks to play it
        let decoder = Decoder::new(Cursor::new((*audio_data).clone())).map_err(|e| {
            PlayerError::DecodeFailed {
                key: sound_key.to_string(),
                source: Box::new(e),
            }
        })?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();

        sink.set_volume(config.volume.clamp(0.0, 1.0));

        tracing::debug!(
            "Created rodio player for {}: {} bytes, {}ch @ {}Hz, looping={}",
            sound_key,
            audio_data.len(),
            channels,
            sample_rate,
            config.looping
        );

        Ok(Self {
            sound_key: sound_key.to_string(),
            sink: Arc::new(sink),
            audio_data: Mutex::new(Some(audio_data)),
            looping: Arc::new(AtomicBool::new(config.looping)),
            callbacks: Arc::new(Mutex::new(OnceCallbacks::new())),
            ramps: RampGeneration::new(),
            scheduler,
        })
    }

    fn enqueue_source(&self) -> Result<(), PlayerError> {
        let data = self
            .audio_data
            .lock()
            .clone()
            .ok_or_else(|| PlayerError::Unloaded(self.sound_key.clone()))?;

        let first = Decoder::new(Cursor::new((*data).clone())).map_err(|e| {
            PlayerError::PlaybackFailed {
                key: self.sound_key.clone(),
                source: Box::new(e),
            }
        })?;

        let sound_key = self.sound_key.clone();
        let next_pass = move || match Decoder::new(Cursor::new((*data).clone())) {
            Ok(decoder) => Some(decoder),
            Err(e) => {
                tracing::warn!("Failed to restart loop of {}: {}", sound_key, e);
                None
            }
        };

        self.sink
            .append(LoopingSource::new(first, next_pass, Arc::clone(&self.looping)));
        Ok(())
    }
}

impl SoundPlayer for RodioPlayer {
    fn play(&self) -> Result<(), PlayerError> {
        tracing::info!("Playing sound: {}", self.sound_key);

        // A paused sink still holds its source; only refill when drained
        if self.sink.empty() {
            self.enqueue_source()?;
        }
        self.sink.play();

        // Report the start on the next tick, never from inside play()
        let callbacks = Arc::clone(&self.callbacks);
        self.scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                let pending = callbacks.lock().take(PlayerEvent::Play);
                fire(pending);
            }),
        );
        Ok(())
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn stop(&self) {
        tracing::debug!("Stopping sound: {}", self.sound_key);
        self.ramps.bump();
        self.sink.stop();
    }

    fn unload(&self) {
        self.ramps.bump();
        self.sink.stop();
        self.callbacks.lock().clear();
        if self.audio_data.lock().take().is_some() {
            tracing::debug!("Unloaded sound: {}", self.sound_key);
        }
    }

    fn playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Read at the end of every pass, so a playing loop finishes its current
    /// pass and ends once cleared
    fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Release);
    }

    fn volume(&self) -> f32 {
        self.sink.volume()
    }

    fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    fn fade(&self, from: f32, to: f32, duration: Duration) {
        let ramp = FadeRamp::new(from, to, duration);
        self.sink.set_volume(ramp.from);

        let sink = Arc::clone(&self.sink);
        let callbacks = Arc::clone(&self.callbacks);
        start_ramp(
            self.scheduler.as_ref(),
            &self.ramps,
            ramp,
            move |volume| sink.set_volume(volume),
            move || {
                let pending = callbacks.lock().take(PlayerEvent::Fade);
                fire(pending);
            },
        );
    }

    fn once(&self, event: PlayerEvent, callback: Callback) {
        self.callbacks.lock().register(event, callback);
    }
}

/// Builds [`RodioPlayer`]s from a sound library
pub struct RodioFactory {
    library: SoundLibrary,
    stream_handle: OutputStreamHandle,
    scheduler: Arc<dyn Scheduler>,
}

impl RodioFactory {
    pub fn new(
        library: SoundLibrary,
        stream_handle: OutputStreamHandle,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            library,
            stream_handle,
            scheduler,
        }
    }
}

impl PlayerFactory for RodioFactory {
    fn create(
        &self,
        sound_key: &str,
        config: PlayerConfig,
    ) -> Result<Arc<dyn SoundPlayer>, PlayerError> {
        let path = self.library.resolve(sound_key)?;

        let audio_data = std::fs::read(&path).map_err(|source| PlayerError::LoadFailed {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(
            "Loaded audio for {}: {} ({} bytes)",
            sound_key,
            path.display(),
            audio_data.len()
        );

        let player = RodioPlayer::new(
            sound_key,
            Arc::new(audio_data),
            config,
            &self.stream_handle,
            Arc::clone(&self.scheduler),
        )?;
        Ok(Arc::new(player))
    }
}
