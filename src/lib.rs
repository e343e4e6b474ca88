//! Playback-control core of a multi-track audio receiver.
//!
//! Remote commands name a sound and an action; the [`PlayerManager`] drives
//! one player per sound through fades, looping and teardown, reports status
//! transitions and notices when the receiver has gone idle.

pub mod audio_system;
pub mod config;
pub mod error;
pub mod messaging;
pub mod scheduler;

pub use audio_system::{ManagerSettings, PlayerManager};
pub use messaging::{Action, Command, StatusEvent, StatusKind};
pub use scheduler::{Scheduler, TaskHandle, TimerQueue};
