//! A synchronous `log::Log` implementation, styled after
//! `main/core/logger/shadow_logger.rs`'s timestamped, level-tagged stderr
//! lines, minus the background-thread/queue machinery that file needs for
//! simulation-scale throughput — this harness logs at session/run
//! granularity, so writing straight to stderr under a lock is enough.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

pub struct SessionLogger {
    start: Instant,
    max_level: LevelFilter,
    stderr: Mutex<std::io::Stderr>,
}

static LOGGER: std::sync::OnceLock<SessionLogger> = std::sync::OnceLock::new();

pub fn init(max_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let logger = LOGGER.get_or_init(|| SessionLogger { start: Instant::now(), max_level, stderr: Mutex::new(std::io::stderr()) });
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(())
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.start.elapsed();
        let level = level_tag(record.level());
        let mut stderr = self.stderr.lock().unwrap();
        let _ = writeln!(stderr, "{:>6}.{:03} [{level}] {}", elapsed.as_secs(), elapsed.subsec_millis(), record.args());
    }

    fn flush(&self) {
        let mut stderr = self.stderr.lock().unwrap();
        let _ = stderr.flush();
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}
