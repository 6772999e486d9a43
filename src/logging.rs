use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

/// Append-only calculation log sink.
///
/// One line per log event, human-readable. When constructed without a path,
/// lines are still mirrored through the `log` facade so nothing is lost;
/// file-append failures are themselves downgraded to `log::warn!` because the
/// log is a convenience artifact, never part of the calculation contract.
#[derive(Debug, Default, Clone)]
pub struct CalcLog {
    path: Option<PathBuf>,
}

impl CalcLog {
    /// Creates a sink that only mirrors to the `log` facade.
    pub fn new() -> Self {
        CalcLog { path: None }
    }

    /// Creates a sink that appends each line to `path`.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        CalcLog {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Appends one line to the calculation log.
    pub fn add(&self, line: &str) {
        log_info(line);
        self.append_line(line);
    }

    /// Appends one warning line to the calculation log.
    pub fn add_warning(&self, line: &str) {
        log_warn(line);
        self.append_line(&format!("WARNING: {line}"));
    }

    fn append_line(&self, line: &str) {
        if let Some(path) = &self.path {
            let opened = OpenOptions::new().create(true).append(true).open(path);
            match opened {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{line}") {
                        warn!("calc log write failed: {e}");
                    }
                }
                Err(e) => warn!("calc log open failed: {e}"),
            }
        }
    }
}
