/// Player manager
///
/// Receives one remote command at a time, drives the matching player through
/// its lifecycle and reports status transitions. Malformed or out-of-order
/// commands are absorbed as no-ops; nothing here ever fails the caller.
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::fade::DEFAULT_FADE_MS;
use super::idle::{IdleMonitor, DEFAULT_IDLE_TIMEOUT_MS};
use super::player::{PlayerConfig, PlayerEvent, PlayerFactory, SoundPlayer};
use super::table::{PlayerRecord, PlayerTable};
use crate::messaging::{Action, Command, StatusBus, StatusEvent, StatusKind};
use crate::scheduler::Scheduler;

/// Timing settings for a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Shared by fade-in, fade-out and live volume changes
    pub fade: Duration,
    pub idle_timeout: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            fade: Duration::from_millis(DEFAULT_FADE_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

struct ManagerState {
    table: PlayerTable,
    idle: IdleMonitor,
}

struct Shared {
    factory: Arc<dyn PlayerFactory>,
    settings: ManagerSettings,
    state: Mutex<ManagerState>,
    bus: StatusBus,
}

/// Orchestrates every active sound player
///
/// Locks are never held while calling into a player or a subscriber, so both
/// may re-enter the manager.
pub struct PlayerManager {
    shared: Arc<Shared>,
}

impl PlayerManager {
    /// Create a manager; it starts idle with the idle timer already armed
    pub fn new(
        factory: Arc<dyn PlayerFactory>,
        scheduler: Arc<dyn Scheduler>,
        settings: ManagerSettings,
    ) -> Self {
        let shared = Arc::new(Shared {
            factory,
            settings,
            state: Mutex::new(ManagerState {
                table: PlayerTable::new(),
                idle: IdleMonitor::new(scheduler, settings.idle_timeout),
            }),
            bus: StatusBus::new(),
        });

        let on_timeout = Shared::idle_timeout_task(&shared);
        shared.state.lock().idle.enter_idle(on_timeout);

        Self { shared }
    }

    /// Handle one command to completion
    pub fn handle_event(&self, cmd: Command) {
        tracing::debug!("Handling command: {}", cmd.description());

        match cmd.action {
            Some(Action::Create) => self.shared.create(&cmd),
            Some(Action::Play) => self.shared.play(&cmd),
            Some(Action::Pause) => self.shared.pause(&cmd),
            Some(Action::Stop) => self.shared.stop(&cmd),
            None => self.shared.adjust(&cmd),
        }
    }

    pub fn on_status<F>(&self, callback: F)
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.shared.bus.on_status(callback);
    }

    /// Status events as a channel, in the same order as callbacks
    pub fn subscribe_status(&self) -> crossbeam_channel::Receiver<StatusEvent> {
        self.shared.bus.subscribe()
    }

    pub fn on_idle<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.bus.on_idle(callback);
    }

    pub fn on_idle_timeout<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.bus.on_idle_timeout(callback);
    }

    pub fn settings(&self) -> ManagerSettings {
        self.shared.settings
    }

    pub fn player_count(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    pub fn contains(&self, sound_key: &str) -> bool {
        self.shared.state.lock().table.contains(sound_key)
    }

    pub fn sound_keys(&self) -> Vec<String> {
        self.shared.state.lock().table.keys()
    }

    pub fn is_idle(&self) -> bool {
        self.shared.state.lock().idle.is_idle()
    }

    pub fn idle_timer_armed(&self) -> bool {
        self.shared.state.lock().idle.is_armed()
    }
}

impl Shared {
    fn emit(&self, kind: StatusKind, sound_key: &str) {
        let event = StatusEvent::new(kind, sound_key);
        tracing::info!("Status: {}", event.description());
        self.bus.publish(&event);
    }

    /// Player for `sound_key` unless it is missing or on its way out
    fn live_player(&self, sound_key: &str) -> Option<Arc<dyn SoundPlayer>> {
        let state = self.state.lock();
        match state.table.get(sound_key) {
            Some(record) if !record.stopping => Some(Arc::clone(&record.player)),
            Some(_) => {
                tracing::debug!("Ignoring command for stopping sound: {}", sound_key);
                None
            }
            None => {
                tracing::debug!("No player for sound key: {}", sound_key);
                None
            }
        }
    }

    fn create(self: &Arc<Self>, cmd: &Command) {
        if self.state.lock().table.contains(&cmd.sound_key) {
            tracing::debug!("Player already exists for {}", cmd.sound_key);
            return;
        }

        let config = PlayerConfig {
            looping: cmd.is_looping,
            volume: 0.0,
        };
        let player = match self.factory.create(&cmd.sound_key, config) {
            Ok(player) => player,
            Err(e) => {
                tracing::warn!("Could not create player for {}: {}", cmd.sound_key, e);
                return;
            }
        };

        {
            let mut state = self.state.lock();
            if !state.table.insert(PlayerRecord::new(&cmd.sound_key, player)) {
                return;
            }
            state.idle.enter_active();
        }

        self.emit(StatusKind::Added, &cmd.sound_key);
    }

    fn play(self: &Arc<Self>, cmd: &Command) {
        let Some(player) = self.live_player(&cmd.sound_key) else {
            return;
        };

        if player.playing() {
            tracing::debug!("Already playing: {}", cmd.sound_key);
            return;
        }

        let Some(epoch) = self.next_start_epoch(&cmd.sound_key) else {
            return;
        };

        let looping = cmd.is_looping;
        let target = cmd.target_volume();
        player.set_looping(looping);
        if !looping {
            player.set_volume(target);
        }

        let shared = Arc::downgrade(self);
        let weak_player = Arc::downgrade(&player);
        let sound_key = cmd.sound_key.clone();
        player.once(
            PlayerEvent::Play,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.started(&sound_key, &weak_player, epoch, looping, target);
                }
            }),
        );

        if let Err(e) = player.play() {
            tracing::warn!("Failed to start {}: {}", cmd.sound_key, e);
        }
    }

    fn started(
        &self,
        sound_key: &str,
        player: &Weak<dyn SoundPlayer>,
        epoch: u64,
        looping: bool,
        target: f32,
    ) {
        let Some(player) = player.upgrade() else {
            return;
        };

        // A pause, stop or newer play since this start was requested wins
        let current = {
            let state = self.state.lock();
            state.table.holds(sound_key, &player)
                && state
                    .table
                    .get(sound_key)
                    .map(|r| !r.stopping && r.start_epoch == epoch)
                    .unwrap_or(false)
        };
        if !current || !player.playing() {
            tracing::debug!("Start of {} was superseded", sound_key);
            return;
        }

        self.emit(StatusKind::Started, sound_key);

        if looping {
            player.fade(0.0, target, self.settings.fade);
        }
    }

    fn pause(&self, cmd: &Command) {
        let Some(player) = self.live_player(&cmd.sound_key) else {
            return;
        };

        if self.next_start_epoch(&cmd.sound_key).is_none() {
            return;
        }

        player.pause();
        self.emit(StatusKind::Paused, &cmd.sound_key);
    }

    /// Invalidate any pending start for `sound_key` and return the new epoch
    fn next_start_epoch(&self, sound_key: &str) -> Option<u64> {
        let mut state = self.state.lock();
        let record = state.table.get_mut(sound_key).filter(|r| !r.stopping)?;
        record.start_epoch += 1;
        Some(record.start_epoch)
    }

    fn stop(self: &Arc<Self>, cmd: &Command) {
        let player = {
            let mut state = self.state.lock();
            match state.table.get_mut(&cmd.sound_key) {
                Some(record) if !record.stopping => {
                    record.stopping = true;
                    Arc::clone(&record.player)
                }
                _ => return,
            }
        };

        if player.playing() {
            let shared = Arc::downgrade(self);
            let weak_player = Arc::downgrade(&player);
            let sound_key = cmd.sound_key.clone();
            player.once(
                PlayerEvent::Fade,
                Box::new(move || {
                    if let (Some(shared), Some(player)) = (shared.upgrade(), weak_player.upgrade()) {
                        shared.release(&sound_key, &player);
                    }
                }),
            );
            player.fade(player.volume(), 0.0, self.settings.fade);
        } else {
            self.release(&cmd.sound_key, &player);
        }
    }

    fn release(self: &Arc<Self>, sound_key: &str, player: &Arc<dyn SoundPlayer>) {
        player.stop();
        player.unload();

        let became_idle = {
            let mut state = self.state.lock();
            if state.table.remove_if_holds(sound_key, player).is_none() {
                return;
            }
            if state.table.is_empty() {
                state.idle.enter_idle(Self::idle_timeout_task(self));
                true
            } else {
                false
            }
        };

        self.emit(StatusKind::Removed, sound_key);

        if became_idle {
            tracing::info!("All sounds released, receiver is idle");
            self.bus.notify_idle();
        }
    }

    fn adjust(&self, cmd: &Command) {
        let Some(player) = self.live_player(&cmd.sound_key) else {
            return;
        };

        if player.looping() != cmd.is_looping {
            player.set_looping(cmd.is_looping);
        }

        let target = cmd.target_volume();
        if player.playing() {
            player.fade(player.volume(), target, self.settings.fade);
        } else {
            player.set_volume(target);
        }
    }

    fn idle_timeout_task(shared: &Arc<Self>) -> crate::scheduler::Task {
        let weak = Arc::downgrade(shared);
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                tracing::info!("Idle timeout elapsed");
                shared.bus.notify_idle_timeout();
            }
        })
    }
}
