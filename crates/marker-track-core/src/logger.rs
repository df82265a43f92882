//! Minimal logger and a rate gate for per-frame diagnostics.
//!
//! The logger prints `[mm:ss.mmm LEVEL target] message` to stderr; the
//! target identifies which pipeline stage spoke. Detection runs once
//! per frame, so most diagnostics are only useful as a heartbeat;
//! `LogGate` limits a log site to one line per interval.

use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record};

struct FrameLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for FrameLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed();
        let minutes = elapsed.as_secs() / 60;
        let seconds = elapsed.as_secs() % 60;
        let millis = elapsed.subsec_millis();
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "[{minutes:02}:{seconds:02}.{millis:03} {:>5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<FrameLogger> = OnceLock::new();

/// Install the frame logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| FrameLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Time gate for chatty log sites.
///
/// `ready` returns `true` at most once per interval; callers skip the log
/// line when it returns `false`.
#[derive(Clone, Copy, Debug)]
pub struct LogGate {
    interval: Duration,
    last: Option<Instant>,
}

impl LogGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(t) if now.duration_since(t) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for LogGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_opens_once_per_interval() {
        let mut gate = LogGate::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(gate.ready(t0));
        assert!(!gate.ready(t0 + Duration::from_secs(5)));
        assert!(!gate.ready(t0 + Duration::from_secs(9)));
        assert!(gate.ready(t0 + Duration::from_secs(10)));
        assert!(!gate.ready(t0 + Duration::from_secs(11)));
    }
}
