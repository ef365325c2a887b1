//! Logging for the Rust core and the web view.
//!
//! Every `log` record goes to the console through `env_logger` and, once the
//! app log directory is known, to a daily log file that rotates at 5 MB.
//! Only the newest five files are kept. The web view logs through the
//! `write_log` command into the same pipeline.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use tauri::{command, AppHandle, Manager};

use crate::error::{OverlayResult, ResultExt};

/// Maximum log file size before rotation (5MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum number of log files to keep
const MAX_LOG_FILES: usize = 5;

const LOG_PREFIX: &str = "comment-overlay";

lazy_static! {
    static ref LOG_FILE: Mutex<Option<RotatingFile>> = Mutex::new(None);
}

/// Append-only log file with size-based rotation.
struct RotatingFile {
    dir: PathBuf,
    file: File,
    written: u64,
    max_size: u64,
    max_files: usize,
}

impl RotatingFile {
    fn open(dir: &Path, max_size: u64, max_files: usize) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = current_log_path(dir);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        let rotating = Self {
            dir: dir.to_path_buf(),
            file,
            written,
            max_size,
            max_files,
        };
        rotating.cleanup();
        Ok(rotating)
    }

    fn write_line(&mut self, line: &str) {
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.written += line.len() as u64;
        }
        let _ = self.file.flush();
        if self.written > self.max_size {
            self.rotate();
        }
    }

    fn rotate(&mut self) {
        let current = current_log_path(&self.dir);
        let stamp = Local::now().format("%Y-%m-%d_%H%M%S%.3f");
        let rotated = self.dir.join(format!("{}_{}.log", LOG_PREFIX, stamp));
        let _ = fs::rename(&current, &rotated);

        match OpenOptions::new().create(true).append(true).open(&current) {
            Ok(file) => {
                self.file = file;
                self.written = 0;
            },
            Err(e) => eprintln!("[LOGGING] Failed to reopen log file: {}", e),
        }
        self.cleanup();
    }

    /// Remove the oldest `.log` files beyond `max_files`.
    fn cleanup(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        let mut log_files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|ext| ext == "log").unwrap_or(false))
            .collect();

        // Newest first
        log_files.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time).then_with(|| b.file_name().cmp(&a.file_name()))
        });

        for file in log_files.into_iter().skip(self.max_files) {
            let _ = fs::remove_file(file.path());
        }
    }
}

/// One file per day.
fn current_log_path(log_dir: &Path) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{}_{}.log", LOG_PREFIX, date))
}

fn format_line(level: log::Level, source: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{}] [{}] [{}] {}\n", timestamp, level, source, message)
}

/// `log` backend: console through env_logger plus the rotating file.
struct OverlayLogger {
    console: env_logger::Logger,
}

impl log::Log for OverlayLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.console.matches(record) {
            return;
        }
        self.console.log(record);

        if let Some(file) = LOG_FILE.lock().as_mut() {
            let line = format_line(record.level(), record.target(), &record.args().to_string());
            file.write_line(&line);
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// Install the logger. `RUST_LOG` overrides the default `info` filter.
/// Calling it again is harmless.
pub fn init() {
    let console = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .build();
    let max_level = console.filter();

    if log::set_boxed_logger(Box::new(OverlayLogger { console })).is_ok() {
        log::set_max_level(max_level);
    }
}

/// Start writing to `<app log dir>/comment-overlay_<date>.log`.
pub fn init_file_logging(app: &AppHandle) -> OverlayResult<PathBuf> {
    let log_dir = app.path().app_log_dir().context("Failed to get log directory")?;
    attach_log_dir(&log_dir)?;
    log::info!("[LOGGING] Log directory: {:?}", log_dir);
    Ok(log_dir)
}

fn attach_log_dir(log_dir: &Path) -> OverlayResult<()> {
    let file = RotatingFile::open(log_dir, MAX_LOG_SIZE, MAX_LOG_FILES)?;
    *LOG_FILE.lock() = Some(file);
    Ok(())
}

/// Level names as the web view sends them. Unknown names log at info.
fn parse_level(level: &str) -> log::Level {
    match level.to_lowercase().as_str() {
        "trace" => log::Level::Trace,
        "debug" => log::Level::Debug,
        "warn" | "warning" => log::Level::Warn,
        "error" => log::Level::Error,
        _ => log::Level::Info,
    }
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// Write a log message from the frontend
#[command]
pub fn write_log(level: String, source: String, message: String) {
    let target = format!("ui::{}", source);
    log::log!(target: &target, parse_level(&level), "{}", message);
}

/// Get the log directory path
#[command]
pub fn get_log_dir(app: AppHandle) -> OverlayResult<String> {
    let log_dir = app.path().app_log_dir().context("Failed to get log directory")?;
    Ok(log_dir.to_string_lossy().to_string())
}
