//! `log` backend that prints through the installed console.
//!
//! Lines look like `[WARN ramos::trap] unexpected interrupt source 1`.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::println;

pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Info and above, or everything with the `verbose` feature.
pub const fn default_level() -> LevelFilter {
    if cfg!(feature = "verbose") {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    }
}

pub fn init() -> Result<(), SetLoggerError> {
    init_with_level(default_level())
}

pub fn init_with_level(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
