pub mod fade;
pub mod idle;
pub mod manager;
pub mod player;
pub mod rodio_backend;
pub mod silent;
/// Audio system module
///
/// Drives any number of simultaneously active sound players from a stream
/// of remote commands:
/// - Per-key player lifecycle (create, play, pause, stop)
/// - Fade-in for loops, fade-out before release, smooth live volume changes
/// - Idle detection once the last player is released
///
/// ## Architecture
///
/// ```text
/// PlayerManager
///   ├── PlayerTable
///   │     ├── "rain"  -> SoundPlayer ─┐
///   │     ├── "wind"  -> SoundPlayer ─┤ Simultaneous
///   │     └── "fire"  -> SoundPlayer ─┘ Playback
///   ├── IdleMonitor (single timer)
///   └── StatusBus   (Added / Started / Paused / Removed)
///
/// SoundPlayer backends:
///   ├── RodioPlayer  (output device)
///   └── SilentPlayer (headless, journaled)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let timers = Arc::new(TimerQueue::new());
/// let factory = Arc::new(SilentFactory::new(timers.clone()));
/// let manager = PlayerManager::new(factory, timers.clone(), ManagerSettings::default());
///
/// manager.on_status(|event| println!("{}", event.description()));
/// manager.handle_event(Command::create("rain").looping(true));
/// manager.handle_event(Command::play("rain").looping(true).with_volume(0.6));
///
/// // Deferred work runs when the host advances the clock
/// timers.advance(Duration::from_millis(16));
/// ```
pub mod source;
pub mod table;

// Re-export commonly used types
pub use fade::{FadeRamp, DEFAULT_FADE_MS};
pub use idle::{IdleMonitor, DEFAULT_IDLE_TIMEOUT_MS};
pub use manager::{ManagerSettings, PlayerManager};
pub use player::{PlayerConfig, PlayerEvent, PlayerFactory, SoundPlayer};
pub use rodio_backend::{RodioFactory, RodioPlayer};
pub use silent::{PlayerCall, SilentFactory, SilentPlayer};
pub use source::SoundLibrary;
pub use table::{PlayerRecord, PlayerTable};
