//! Log writer module
//!
//! Thread-safe log writing to files or stdout/stderr, with level filtering.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use super::Level;

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

/// Thread-safe log writer
pub struct LogWriter {
    /// Access and info log target
    access: LogTarget,
    /// Warning and error log target
    error: LogTarget,
    /// Most verbose level that is written
    level: Level,
}

impl LogWriter {
    fn new(
        access_log_file: Option<&str>,
        error_log_file: Option<&str>,
        level: Level,
    ) -> io::Result<Self> {
        let access = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };

        let error = match error_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stderr,
        };

        Ok(Self {
            access,
            error,
            level,
        })
    }

    pub const fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level as u8
    }

    /// Write to access log, regardless of level
    pub fn write_access(&self, message: &str) {
        write_to_target(&self.access, message);
    }

    /// Write to the target matching `level`, if that level is enabled
    pub fn write(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            Level::Error | Level::Warn => write_to_target(&self.error, message),
            Level::Info | Level::Debug => write_to_target(&self.access, message),
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => println!("{message}"),
        LogTarget::Stderr => eprintln!("{message}"),
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global log writer
///
/// Returns error if log files cannot be opened or the writer is already set.
pub fn init(
    access_log_file: Option<&str>,
    error_log_file: Option<&str>,
    level: Level,
) -> io::Result<()> {
    let writer = LogWriter::new(access_log_file, error_log_file, level)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// The global log writer, if `init()` has been called
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_targets_and_level_filter() {
        let dir = tempfile::tempdir().unwrap();
        let access_path = dir.path().join("logs").join("access.log");
        let error_path = dir.path().join("logs").join("error.log");

        let writer = LogWriter::new(
            access_path.to_str(),
            error_path.to_str(),
            Level::Warn,
        )
        .unwrap();

        writer.write_access("GET /api/posts 200");
        writer.write(Level::Info, "filtered out");
        writer.write(Level::Warn, "slow store");
        writer.write(Level::Error, "store down");

        let access = std::fs::read_to_string(&access_path).unwrap();
        let error = std::fs::read_to_string(&error_path).unwrap();
        assert_eq!(access, "GET /api/posts 200\n");
        assert_eq!(error, "slow store\nstore down\n");
    }

    #[test]
    fn test_enabled_ordering() {
        let writer = LogWriter::new(None, None, Level::Info).unwrap();
        assert!(writer.enabled(Level::Error));
        assert!(writer.enabled(Level::Info));
        assert!(!writer.enabled(Level::Debug));
    }
}
