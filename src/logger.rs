//! Session logger. One file per run in the OS data directory, truncated at
//! each launch:
//!
//!   Windows:  `%APPDATA%\SplatterBoard\splatterboard.log`
//!   Linux:    `$XDG_DATA_HOME` or `~/.local/share`, then `SplatterBoard/splatterboard.log`
//!   macOS:    `~/Library/Application Support/SplatterBoard/splatterboard.log`
//!
//! `log_info!` / `log_warn!` / `log_err!` are no-ops until [`init`] runs, so
//! library users and tests never create a file. [`set_echo`] mirrors every
//! line to stderr (the CLI's `--verbose`).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static ECHO: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

pub fn set_echo(enabled: bool) {
    ECHO.store(enabled, Ordering::Relaxed);
}

/// Log `msg` at `level`. I/O errors are dropped.
pub fn write(level: Level, msg: &str) {
    emit(&format_line(level, &timestamp(), msg));
}

fn format_line(level: Level, ts: &str, msg: &str) -> String {
    format!("[{}] [{}] {}", ts, level.label(), msg)
}

fn emit(line: &str) {
    if ECHO.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*));
    };
}

/// Open the session log and route panics into it. Returns the log path, or
/// `None` when no file could be opened (logging then stays off).
pub fn init() -> Option<PathBuf> {
    let path = data_dir()?.join("SplatterBoard").join("splatterboard.log");
    let file = match open_session(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] could not open {}: {}", path.display(), e);
            return None;
        }
    };
    LOG_FILE.set(Mutex::new(file)).ok()?;

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        emit(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
    Some(path)
}

/// Create or truncate `path` and write the session header.
fn open_session(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    writeln!(file, "=== SplatterBoard session (unix {}) ===", started)?;
    Ok(file)
}

fn data_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return std::env::var_os("APPDATA").map(PathBuf::from);
    }
    let home = std::env::var_os("HOME").map(PathBuf::from);
    if cfg!(target_os = "macos") {
        return home.map(|h| h.join("Library").join("Application Support"));
    }
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(".local").join("share")))
}

/// HH:MM:SS (UTC).
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs() % 86400;
            format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_clock_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }

    #[test]
    fn lines_carry_level_and_time() {
        assert_eq!(format_line(Level::Warn, "01:02:03", "low ink"), "[01:02:03] [WARN] low ink");
        assert!(Level::Info < Level::Error);
    }

    #[test]
    fn session_file_is_truncated() {
        let path = std::env::temp_dir()
            .join(format!("splatterboard-log-{}", std::process::id()))
            .join("session.log");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        std::fs::write(&path, "old session\n").expect("seed");
        drop(open_session(&path).expect("open"));
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("=== SplatterBoard session"));
        assert!(!text.contains("old session"));
        let _ = std::fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn logging_before_init_is_harmless() {
        crate::log_info!("nothing to see {}", 1);
        crate::log_warn!("still nothing");
        crate::log_err!("{}", "or here");
    }
}
