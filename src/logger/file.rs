/// File output for the logger
///
/// Keeps one append-only log file per day under the logs directory
/// (reversalbot-YYYY-MM-DD.log). The writer is lazy: the file is opened on
/// the first write and reopened when the date rolls over.

use crate::paths::get_logs_directory;
use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

struct FileState {
    file: Option<File>,
    current_date: String,
}

static FILE_STATE: Lazy<Mutex<FileState>> = Lazy::new(|| {
    Mutex::new(FileState {
        file: None,
        current_date: String::new(),
    })
});

/// Initialize file logging
///
/// Ensures the logs directory exists. Failures are reported to stderr and
/// file output is silently skipped afterwards; console logging is never
/// affected by file problems.
pub fn init_file_logging() {
    let logs_dir = get_logs_directory();
    if !logs_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(&logs_dir) {
            eprintln!(
                "Failed to create logs directory {}: {}",
                logs_dir.display(),
                e
            );
        }
    }
}

/// Append one line to the daily log file
pub fn write_to_file(line: &str) {
    let config = super::config::get_logger_config();
    if !config.file_output {
        return;
    }

    let today = Local::now().format("%Y-%m-%d").to_string();

    let mut state = match FILE_STATE.lock() {
        Ok(state) => state,
        Err(_) => return,
    };

    // Roll the file on date change
    if state.current_date != today || state.file.is_none() {
        let path = get_logs_directory().join(format!("reversalbot-{}.log", today));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                state.file = Some(file);
                state.current_date = today;
            }
            Err(_) => {
                state.file = None;
                return;
            }
        }
    }

    if let Some(file) = state.file.as_mut() {
        let _ = writeln!(file, "{}", line);
    }
}

/// Flush pending writes to disk
pub fn flush_file_logging() {
    if let Ok(mut state) = FILE_STATE.lock() {
        if let Some(file) = state.file.as_mut() {
            let _ = file.flush();
        }
    }
}
