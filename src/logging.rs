// this_file: src/logging.rs
//! Logging configuration and utilities

use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Default log level for debug builds
#[cfg(debug_assertions)]
pub fn default_level() -> &'static str {
    "debug"
}

/// Default log level for release builds
#[cfg(not(debug_assertions))]
pub fn default_level() -> &'static str {
    "info"
}

/// Map a user-supplied level name onto a filter, falling back to `info`
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => {
            eprintln!("Invalid log level '{}', using 'info'", level);
            LevelFilter::Info
        }
    }
}

/// Initialize logging with the project format. Safe to call more than once;
/// later calls are ignored.
pub fn init_logging(level: &str, quiet: bool, timestamps: bool) {
    let level_filter = if quiet {
        LevelFilter::Error
    } else {
        parse_level(level)
    };

    let mut builder = Builder::new();
    builder.filter_level(level_filter);

    builder.format(move |buf, record| {
        let level_style = match record.level() {
            Level::Error => "\x1b[31m", // Red
            Level::Warn => "\x1b[33m",  // Yellow
            Level::Info => "\x1b[32m",  // Green
            Level::Debug => "\x1b[34m", // Blue
            Level::Trace => "\x1b[35m", // Magenta
        };
        let reset = "\x1b[0m";

        if timestamps {
            writeln!(
                buf,
                "{} {}{:5}{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                level_style,
                record.level(),
                reset,
                record.target(),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{}{:5}{} [{}] {}",
                level_style,
                record.level(),
                reset,
                record.target(),
                record.args()
            )
        }
    });

    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        builder.parse_filters(&rust_log);
    }

    // A logger may already be installed (tests, embedding applications)
    let _ = builder.try_init();
}

/// Logs how long a scope took when dropped
pub struct Timer {
    name: String,
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        log::trace!("Starting: {}", name);
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since the timer started
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Log the elapsed time at the specified level
    pub fn log_elapsed(&self, level: Level) {
        log::log!(level, "{} completed in {:.3}ms", self.name, self.elapsed_ms());
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed(Level::Debug);
    }
}
