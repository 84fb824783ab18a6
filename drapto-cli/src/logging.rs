// ============================================================================
// drapto-cli/src/logging.rs
// ============================================================================
//
// LOGGING: env_logger for plain stderr output, or fern when a log file is
// requested so the run is captured to disk as well as the terminal.
//
// AI-ASSISTANT-INFO: logging setup and the timestamp helper used for default
// log filenames.

use std::path::Path;

use env_logger::Env;
use log::{Level, LevelFilter};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS", used
/// to build a unique default log filename per run.
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Initializes logging to stderr only, filtered at `level`.
pub fn setup_stderr_logging(level: LevelFilter) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level.to_string()))
        .format(|buf, record| {
            use std::io::Write;
            if record.level() != Level::Info {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            } else {
                writeln!(buf, "{}", record.args())
            }
        })
        .init();
}

/// Initializes logging to both stderr and `log_path`, filtered at `level`.
pub fn setup_file_logging(log_path: &Path, level: LevelFilter) -> Result<(), fern::InitError> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    fern::Dispatch::new()
        .level(level)
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
                .chain(std::io::stderr()),
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        message
                    ))
                })
                .chain(fern::log_file(log_path)?),
        )
        .apply()
        .map_err(fern::InitError::SetLoggerError)
}
