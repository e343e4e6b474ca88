use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use rodio::OutputStream;
use sysinfo::System;

use ambience_receiver::audio_system::{PlayerFactory, RodioFactory, SilentFactory, SoundLibrary};
use ambience_receiver::config::{Backend, Config};
use ambience_receiver::error::{AppResult, PlayerError};
use ambience_receiver::{Command, PlayerManager, StatusEvent, TimerQueue};

const LOG_TARGET_STARTUP: &str = "ambience_receiver::startup";

/// Longest the loop sleeps when no timer is due sooner
const MAX_WAIT: Duration = Duration::from_millis(250);

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/AmbienceReceiver/logs/`, one file per
/// day. Debug builds also log to stderr; stdout carries status events only.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("AmbienceReceiver").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "ambience-receiver.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting ambience-receiver v{} on ({})",
        version,
        std::env::consts::ARCH
    );
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
}

#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    force_silent: bool,
}

impl CliArgs {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> AppResult<Self> {
        let mut parsed = CliArgs::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config_path = Some(PathBuf::from(path));
                }
                "--silent" => parsed.force_silent = true,
                other => bail!("Unknown argument: {} (expected --config <path> or --silent)", other),
            }
        }
        Ok(parsed)
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();

    thread::spawn(move || {
        tracing::debug!("Input reader thread started");
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        tracing::debug!("Input reader thread stopped");
    });

    rx
}

fn handle_line(manager: &PlayerManager, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match serde_json::from_str::<Command>(line) {
        Ok(cmd) => manager.handle_event(cmd),
        Err(e) => tracing::warn!("Skipping malformed command {:?}: {}", line, e),
    }
}

fn flush_events(events: &Receiver<StatusEvent>, out: &mut impl Write) -> AppResult<()> {
    for event in events.try_iter() {
        serde_json::to_writer(&mut *out, &event)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn run() -> AppResult<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    let config_path = match args.config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load_or_create(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let backend = if args.force_silent {
        Backend::Silent
    } else {
        config.backend
    };

    let timers = Arc::new(TimerQueue::new());

    // The output stream must outlive every player
    let _stream: Option<OutputStream>;
    let factory: Arc<dyn PlayerFactory> = match backend {
        Backend::Rodio => {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| PlayerError::StreamInitFailed(Box::new(e)))?;
            _stream = Some(stream);

            let sound_dir = config.sound_dir_relative_to(&config_path);
            tracing::info!("Sound directory: {}", sound_dir.display());
            let library = SoundLibrary::new(sound_dir, config.extensions.clone());
            Arc::new(RodioFactory::new(library, handle, timers.clone()))
        }
        Backend::Silent => {
            _stream = None;
            tracing::info!("Using silent backend");
            Arc::new(SilentFactory::new(timers.clone()))
        }
    };

    let manager = PlayerManager::new(factory, timers.clone(), config.manager_settings());
    let events = manager.subscribe_status();

    let timed_out = Arc::new(AtomicBool::new(false));
    manager.on_idle(|| tracing::info!("Receiver idle"));
    let timed_out_clone = Arc::clone(&timed_out);
    manager.on_idle_timeout(move || {
        tracing::info!("Receiver idle timeout reached");
        timed_out_clone.store(true, Ordering::SeqCst);
    });

    let input = spawn_stdin_reader();
    let mut stdout = io::stdout().lock();
    let started = Instant::now();

    tracing::info!(
        "Receiver ready (fade {}ms, idle timeout {}ms)",
        config.fade_ms,
        config.idle_timeout_ms
    );

    loop {
        let wait = timers
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(started.elapsed()))
            .unwrap_or(MAX_WAIT)
            .min(MAX_WAIT);

        match input.recv_timeout(wait) {
            Ok(line) => handle_line(&manager, &line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Input closed, shutting down");
                break;
            }
        }

        timers.advance_to(started.elapsed());
        flush_events(&events, &mut stdout)?;

        if config.exit_on_idle_timeout && timed_out.load(Ordering::SeqCst) {
            tracing::info!("Exiting after idle timeout");
            break;
        }
    }

    flush_events(&events, &mut stdout)?;
    Ok(())
}

fn main() {
    initialize_tracing();
    log_runtime_environment();

    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_cli_args() {
        let parsed = CliArgs::parse(args(&["--config", "/tmp/c.json", "--silent"])).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("/tmp/c.json")));
        assert!(parsed.force_silent);

        assert!(CliArgs::parse(args(&["--config"])).is_err());
        assert!(CliArgs::parse(args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_flush_events_writes_json_lines() {
        let (tx, rx) = unbounded();
        tx.send(StatusEvent::new(ambience_receiver::StatusKind::Added, "rain"))
            .unwrap();
        tx.send(StatusEvent::new(ambience_receiver::StatusKind::Started, "rain"))
            .unwrap();

        let mut out = Vec::new();
        flush_events(&rx, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\"type\":\"added\",\"soundKey\":\"rain\"}\n{\"type\":\"started\",\"soundKey\":\"rain\"}\n"
        );
    }
}
