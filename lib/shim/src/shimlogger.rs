//! Minimal `log::Log` backend for the target process (design note "Global
//! shim state"), in the spirit of the teacher's `shimlogger.rs`: no heap
//! allocation before the first socket connects, so a straight `eprintln!`
//! under a lock is enough — this shim logs a handful of protocol-desync
//! warnings per process lifetime, not per-packet.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct ShimLogger;

impl Log for ShimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[shim] [{}] {}", level_tag(record.level()), record.args());
    }

    fn flush(&self) {}
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

/// Installs [`ShimLogger`] as the `log` backend. Safe to call more than
/// once; only the first call takes effect, matching `log::set_logger`'s own
/// "first one wins" contract.
pub fn install() {
    static LOGGER: ShimLogger = ShimLogger;
    log::set_max_level(LevelFilter::Warn);
    let _ = log::set_logger(&LOGGER);
}
