// Integration tests for the ambience receiver
// These drive the player manager end to end with the silent backend and a
// virtual clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ambience_receiver::audio_system::{PlayerCall, SilentFactory, SoundPlayer};
use ambience_receiver::{Command, ManagerSettings, PlayerManager, StatusEvent, StatusKind, TimerQueue};
use crossbeam_channel::Receiver;

const FADE: Duration = Duration::from_millis(400);
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

struct Harness {
    timers: Arc<TimerQueue>,
    factory: Arc<SilentFactory>,
    manager: PlayerManager,
    events: Receiver<StatusEvent>,
    idle: Arc<AtomicUsize>,
    idle_timeouts: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        let timers = Arc::new(TimerQueue::new());
        let factory = Arc::new(SilentFactory::new(timers.clone()));
        let manager = PlayerManager::new(
            factory.clone(),
            timers.clone(),
            ManagerSettings {
                fade: FADE,
                idle_timeout: IDLE_TIMEOUT,
            },
        );
        let events = manager.subscribe_status();

        let idle = Arc::new(AtomicUsize::new(0));
        let idle_clone = Arc::clone(&idle);
        manager.on_idle(move || {
            idle_clone.fetch_add(1, Ordering::SeqCst);
        });

        let idle_timeouts = Arc::new(AtomicUsize::new(0));
        let timeouts_clone = Arc::clone(&idle_timeouts);
        manager.on_idle_timeout(move || {
            timeouts_clone.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            timers,
            factory,
            manager,
            events,
            idle,
            idle_timeouts,
        }
    }

    fn send(&self, cmd: Command) {
        self.manager.handle_event(cmd);
    }

    fn drain(&self) -> Vec<(StatusKind, String)> {
        self.events
            .try_iter()
            .map(|e| (e.kind, e.sound_key))
            .collect()
    }

    fn calls(&self, key: &str) -> Vec<PlayerCall> {
        self.factory.player(key).expect("player was created").calls()
    }

    fn fades(&self, key: &str) -> Vec<PlayerCall> {
        self.calls(key)
            .into_iter()
            .filter(|c| matches!(c, PlayerCall::Fade { .. }))
            .collect()
    }
}

fn ev(kind: StatusKind, key: &str) -> (StatusKind, String) {
    (kind, key.to_string())
}

#[test]
fn test_end_to_end_lifecycle() {
    let h = Harness::new();

    h.send(Command::create("a"));
    assert_eq!(h.drain(), vec![ev(StatusKind::Added, "a")]);
    assert!(!h.manager.idle_timer_armed());

    h.send(Command::play("a").with_volume(1.0));
    assert!(h.calls("a").contains(&PlayerCall::Play));

    // Start completion
    h.timers.run_due();
    assert_eq!(h.drain(), vec![ev(StatusKind::Started, "a")]);

    let player = h.factory.player("a").unwrap();
    assert!(player.playing());
    assert_eq!(player.volume(), 1.0);

    h.send(Command::stop("a"));
    assert_eq!(
        h.fades("a"),
        vec![PlayerCall::Fade {
            from: 1.0,
            to: 0.0,
            duration: FADE
        }]
    );
    assert!(!h.calls("a").contains(&PlayerCall::Stop));
    assert!(h.drain().is_empty());

    // Fade completion
    h.timers.advance(FADE);
    let calls = h.calls("a");
    let fade_at = calls
        .iter()
        .position(|c| matches!(c, PlayerCall::Fade { .. }))
        .unwrap();
    let stop_at = calls.iter().position(|c| *c == PlayerCall::Stop).unwrap();
    let unload_at = calls.iter().position(|c| *c == PlayerCall::Unload).unwrap();
    assert!(fade_at < stop_at && stop_at < unload_at);

    assert_eq!(h.drain(), vec![ev(StatusKind::Removed, "a")]);
    assert_eq!(h.idle.load(Ordering::SeqCst), 1);
    assert!(h.manager.idle_timer_armed());
    assert_eq!(h.manager.player_count(), 0);

    h.timers.advance(IDLE_TIMEOUT - Duration::from_millis(1));
    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 0);

    h.timers.advance(Duration::from_millis(1));
    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 1);

    h.timers.advance(IDLE_TIMEOUT * 3);
    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_startup_idle_timer_fires_without_any_sound() {
    let h = Harness::new();
    assert!(h.manager.is_idle());

    h.timers.advance(IDLE_TIMEOUT);
    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(h.idle.load(Ordering::SeqCst), 0);
}

#[test]
fn test_create_before_timeout_cancels_it() {
    let h = Harness::new();

    h.send(Command::create("a"));
    h.send(Command::stop("a"));
    assert_eq!(h.idle.load(Ordering::SeqCst), 1);

    h.timers.advance(IDLE_TIMEOUT / 2);
    h.send(Command::create("b"));
    h.timers.advance(IDLE_TIMEOUT * 2);

    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 0);
    assert!(!h.manager.is_idle());
}

#[test]
fn test_create_after_timeout_does_not_retract_it() {
    let h = Harness::new();

    h.timers.advance(IDLE_TIMEOUT);
    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 1);

    h.send(Command::create("a"));
    h.timers.advance(IDLE_TIMEOUT);
    assert_eq!(h.idle_timeouts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_looping_play_fades_in_on_start() {
    let h = Harness::new();
    h.send(Command::create("rain").looping(true));
    h.send(Command::play("rain").looping(true).with_volume(0.6));

    assert!(h.fades("rain").is_empty());

    h.timers.run_due();
    assert_eq!(
        h.fades("rain"),
        vec![PlayerCall::Fade {
            from: 0.0,
            to: 0.6,
            duration: FADE
        }]
    );

    h.timers.advance(FADE);
    assert_eq!(h.factory.player("rain").unwrap().volume(), 0.6);
}

#[test]
fn test_one_shot_play_starts_at_target_without_fade() {
    let h = Harness::new();
    h.send(Command::create("chime"));
    h.send(Command::play("chime").with_volume(0.7));
    h.timers.run_due();

    assert!(h.fades("chime").is_empty());
    let calls = h.calls("chime");
    let volume_at = calls
        .iter()
        .position(|c| *c == PlayerCall::SetVolume(0.7))
        .unwrap();
    let play_at = calls.iter().position(|c| *c == PlayerCall::Play).unwrap();
    assert!(volume_at < play_at);
}

#[test]
fn test_stop_while_not_playing_releases_immediately() {
    let h = Harness::new();
    h.send(Command::create("a"));
    h.send(Command::stop("a"));

    assert!(h.fades("a").is_empty());
    let calls = h.calls("a");
    assert!(calls.contains(&PlayerCall::Stop));
    assert!(calls.contains(&PlayerCall::Unload));
    assert_eq!(
        h.drain(),
        vec![ev(StatusKind::Added, "a"), ev(StatusKind::Removed, "a")]
    );
    assert!(!h.manager.contains("a"));
}

#[test]
fn test_stop_mid_fade_in_refades_from_current_level() {
    let h = Harness::new();
    h.send(Command::create("rain").looping(true));
    h.send(Command::play("rain").looping(true).with_volume(1.0));
    h.timers.run_due();

    h.timers.advance(FADE / 2);
    h.send(Command::stop("rain"));

    let fades = h.fades("rain");
    assert_eq!(fades.len(), 2);
    match &fades[1] {
        PlayerCall::Fade { from, to, duration } => {
            assert!((from - 0.5).abs() < 1e-3);
            assert_eq!(*to, 0.0);
            assert_eq!(*duration, FADE);
        }
        other => panic!("Expected fade, got {:?}", other),
    }

    h.timers.advance(FADE);
    let kinds: Vec<StatusKind> = h.drain().into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        kinds,
        vec![StatusKind::Added, StatusKind::Started, StatusKind::Removed]
    );
}

#[test]
fn test_adjust_fades_while_playing() {
    let h = Harness::new();
    h.send(Command::create("a"));
    h.send(Command::play("a").with_volume(1.0));
    h.timers.run_due();

    h.send(Command::adjust("a").with_volume(0.25));
    assert_eq!(
        h.fades("a"),
        vec![PlayerCall::Fade {
            from: 1.0,
            to: 0.25,
            duration: FADE
        }]
    );

    h.timers.advance(FADE);
    assert_eq!(h.factory.player("a").unwrap().volume(), 0.25);
    assert!(h.manager.contains("a"));
}

#[test]
fn test_adjust_sets_volume_directly_when_silent() {
    let h = Harness::new();
    h.send(Command::create("a"));
    h.send(Command::adjust("a").with_volume(0.3));

    assert!(h.fades("a").is_empty());
    assert_eq!(h.calls("a").last(), Some(&PlayerCall::SetVolume(0.3)));
}

#[test]
fn test_many_sounds_layer_and_idle_only_when_all_gone() {
    let h = Harness::new();
    for key in ["rain", "wind", "fire"] {
        h.send(Command::create(key).looping(true));
        h.send(Command::play(key).looping(true).with_volume(0.5));
    }
    h.timers.advance(FADE);
    assert_eq!(h.manager.player_count(), 3);

    h.send(Command::stop("rain"));
    h.send(Command::stop("wind"));
    h.timers.advance(FADE);
    assert_eq!(h.idle.load(Ordering::SeqCst), 0);
    assert_eq!(h.manager.sound_keys(), vec!["fire".to_string()]);

    h.send(Command::stop("fire"));
    h.timers.advance(FADE);
    assert_eq!(h.idle.load(Ordering::SeqCst), 1);
    assert!(h.manager.is_idle());
}

#[test]
fn test_removed_is_last_event_per_key() {
    let h = Harness::new();
    h.send(Command::create("a"));
    h.send(Command::play("a"));
    h.send(Command::stop("a"));
    h.send(Command::pause("a"));
    h.send(Command::play("a"));
    h.timers.advance(FADE * 2);

    let events = h.drain();
    assert_eq!(events.first(), Some(&ev(StatusKind::Added, "a")));
    assert_eq!(events.last(), Some(&ev(StatusKind::Removed, "a")));
    assert_eq!(
        events
            .iter()
            .filter(|(k, _)| *k == StatusKind::Removed)
            .count(),
        1
    );
}

#[test]
fn test_decoded_wire_commands_drive_manager() {
    let h = Harness::new();
    let lines = [
        r#"{"soundKey":"rain","action":"create","volume":0,"isLooping":true}"#,
        r#"{"soundKey":"rain","action":"play","volume":0.8,"isLooping":true}"#,
        r#"{"soundKey":"rain","action":"rewind","volume":0.4,"isLooping":true}"#,
        r#"{"soundKey":"rain","action":7,"volume":0.2,"isLooping":true}"#,
    ];
    for line in lines {
        let cmd: Command = serde_json::from_str(line).unwrap();
        h.send(cmd);
        h.timers.run_due();
    }
    h.timers.advance(FADE);

    // Unknown actions took the live-adjust path
    let fades = h.fades("rain");
    assert_eq!(fades.len(), 3);
    assert!(matches!(fades[1], PlayerCall::Fade { to, .. } if (to - 0.4).abs() < 1e-6));
    assert!(matches!(fades[2], PlayerCall::Fade { to, .. } if (to - 0.2).abs() < 1e-6));
    assert!((h.factory.player("rain").unwrap().volume() - 0.2).abs() < 1e-6);
}
