use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use once_cell::sync::Lazy;

static LOG_FILE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Get the run log path (in the user's data directory)
pub fn get_log_path() -> PathBuf {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("primerlab").join("logs").join("primerlab.log")
}

/// Initialize logging - stderr via env_logger, plus the run log file
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();

    let log_path = get_log_path();

    // Create logs directory if it doesn't exist
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    if let Ok(mut path) = LOG_FILE.lock() {
        *path = Some(log_path);
    }

    log_message("INFO", "primerlab", "Run started");
}

/// Record a message through `log` and append it to the run log file.
///
/// The file is only written once [`init_logging`] has run.
pub fn log_message(level: &str, module: &str, message: &str) {
    match level {
        "ERROR" => log::error!(target: "primerlab", "[{}] {}", module, message),
        "WARN" => log::warn!(target: "primerlab", "[{}] {}", module, message),
        "DEBUG" => log::debug!(target: "primerlab", "[{}] {}", module, message),
        _ => log::info!(target: "primerlab", "[{}] {}", module, message),
    }

    let log_path = match LOG_FILE.lock() {
        Ok(path) => path.clone(),
        Err(_) => None,
    };
    if let Some(log_path) = log_path {
        let _ = append_to_log(&log_path, level, module, message);
    }
}

fn append_to_log(log_path: &Path, level: &str, module: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] [{}] [{}] {}", timestamp, level, module, message)
}

/// Get the run log contents
pub fn read_log_file() -> Result<String, String> {
    let log_path = get_log_path();

    if !log_path.exists() {
        return Ok("No log file yet.".to_string());
    }

    fs::read_to_string(&log_path)
        .map_err(|e| format!("Failed to read log file: {}", e))
}

/// Clear the run log
pub fn clear_log_file() -> Result<(), String> {
    let log_path = get_log_path();

    if log_path.exists() {
        fs::write(&log_path, "")
            .map_err(|e| format!("Failed to clear log file: {}", e))?;
    }

    log_message("INFO", "primerlab", "Log file cleared");
    Ok(())
}

/// Get log file size in bytes
pub fn get_log_file_size() -> Result<u64, String> {
    let log_path = get_log_path();

    if !log_path.exists() {
        return Ok(0);
    }

    fs::metadata(&log_path)
        .map(|m| m.len())
        .map_err(|e| format!("Failed to get log file size: {}", e))
}
