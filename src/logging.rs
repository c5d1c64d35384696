use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

// Logger with per-topic debug filtering
#[derive(Debug)]
struct SimLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

impl log::Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() <= self.level {
            // Debug and trace output is limited to the requested topics
            if let Some(filters) = &self.debug_filters {
                if metadata.level() == log::Level::Debug || metadata.level() == log::Level::Trace {
                    return filters.contains(metadata.target())
                        || filters.iter().any(|f| metadata.target().starts_with(f));
                }
            }
            return true;
        }
        false
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        // Records logged from a user thread carry its name
        let context = match std::thread::current().name() {
            Some(name) if name.starts_with("User Thread") || name == "pid" => {
                format!("[{}] ", name)
            }
            _ => String::new(),
        };

        let mut output = format!(
            "{timestamp} {level_color}{level:5}{reset} {context}{target}: {message}",
            timestamp = timestamp,
            level_color = level_color,
            level = record.level(),
            reset = reset,
            context = context,
            target = record.target(),
            message = record.args()
        );

        if let Some(module_path) = record.module_path() {
            if module_path != record.target() {
                output.push_str(&format!(" [{}]", module_path));
            }
        }

        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
        let _ = stdout.flush();
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

static LOGGER: OnceLock<SimLogger> = OnceLock::new();

/// Installs the global logger. `debug_filter` is a comma separated topic list
/// (motion, collision, pid, sensor, process, lcd).
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    let debug_filters = debug_filter.map(|filter_str| {
        filter_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<HashSet<String>>()
    });

    let logger = LOGGER.get_or_init(|| SimLogger {
        level,
        debug_filters,
    });

    log::set_logger(logger).map(|()| log::set_max_level(level))
}

// Helper macros for specific debug topics
#[macro_export]
macro_rules! debug_motion {
    ($($arg:tt)*) => {
        log::debug!(target: "motion", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_collision {
    ($($arg:tt)*) => {
        log::debug!(target: "collision", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_pid {
    ($port:expr, $($arg:tt)*) => {
        log::debug!(target: "pid", "[M{}] {}", $port, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_sensor {
    ($port:expr, $($arg:tt)*) => {
        log::debug!(target: "sensor", "[S{:02}] {}", $port, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_process {
    ($fmt:literal $($arg:tt)*) => {
        log::debug!(target: "process", "{}", format_args!($fmt $($arg)*))
    };
    ($id:expr, $($arg:tt)*) => {
        log::debug!(target: "process", "[P{:02}] {}", $id, format_args!($($arg)*))
    };
}
