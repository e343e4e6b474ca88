/// Volume ramps
///
/// A ramp moves a player's volume from one level to another in fixed steps,
/// each step scheduled as a task. Starting a newer ramp on the same player
/// supersedes the older one: its remaining steps and its completion are
/// skipped.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::Scheduler;

/// Default fade duration shared by fade-in, fade-out and live adjustment
pub const DEFAULT_FADE_MS: u64 = 1000;

/// Number of volume steps in a non-empty ramp
pub const RAMP_STEPS: u32 = 50;

/// Fade ramp description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRamp {
    pub from: f32,
    pub to: f32,
    pub duration: Duration,
    steps: u32,
}

impl FadeRamp {
    /// Create a new ramp, zero duration collapses to a single step
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        let steps = if duration.is_zero() { 1 } else { RAMP_STEPS };
        Self {
            from: from.clamp(0.0, 1.0),
            to: to.clamp(0.0, 1.0),
            duration,
            steps,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Volume after `step` of `steps` (1-based, the last step lands on `to`)
    pub fn volume_at(&self, step: u32) -> f32 {
        if step >= self.steps {
            return self.to;
        }
        let progress = step as f32 / self.steps as f32;
        self.from + (self.to - self.from) * progress
    }

    /// Delay from ramp start until `step` is applied
    pub fn delay_at(&self, step: u32) -> Duration {
        if self.steps <= 1 {
            return self.duration;
        }
        self.duration.mul_f64(step as f64 / self.steps as f64)
    }
}

/// Tracks which ramp on a player is current
#[derive(Debug, Clone, Default)]
pub struct RampGeneration(Arc<AtomicU64>);

impl RampGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every ramp started so far, returns the new generation
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::Acquire) == generation
    }
}

/// Schedule every step of `ramp`
///
/// `apply` receives each intermediate volume; `done` runs after the final
/// step. Both are skipped once `generation` has moved on.
pub fn start_ramp<A, D>(
    scheduler: &dyn Scheduler,
    generation: &RampGeneration,
    ramp: FadeRamp,
    apply: A,
    done: D,
) where
    A: Fn(f32) + Send + Sync + 'static,
    D: FnOnce() + Send + 'static,
{
    let current = generation.bump();
    let apply = Arc::new(apply);
    let mut done = Some(done);

    for step in 1..=ramp.steps() {
        let generation = generation.clone();
        let apply = Arc::clone(&apply);
        let volume = ramp.volume_at(step);
        let finish = if step == ramp.steps() { done.take() } else { None };

        scheduler.schedule(
            ramp.delay_at(step),
            Box::new(move || {
                if !generation.is_current(current) {
                    return;
                }
                apply(volume);
                if let Some(finish) = finish {
                    finish();
                }
            }),
        );
    }

    tracing::trace!(
        "Ramp {:.2} -> {:.2} over {}ms scheduled ({} steps)",
        ramp.from,
        ramp.to,
        ramp.duration.as_millis(),
        ramp.steps()
    );
}
