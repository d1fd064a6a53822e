//! Logging initialization.
//!
//! The console host prints shell output on stdout, so logs go to a file
//! instead: one file per run under `logs/` next to the executable, or under
//! `$SHELL_PANEL_LOG_DIR` when set.
//!
//! Verbosity follows `RUST_LOG` (`info` when unset), e.g.
//! `RUST_LOG=shell_panel=debug` to trace session lifecycles.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_DIR_ENV: &str = "SHELL_PANEL_LOG_DIR";

fn log_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// `shell-panel.2024-12-06-14-30-25.log`
fn log_file_name(started: DateTime<Local>) -> String {
    format!("shell-panel.{}.log", started.format("%Y-%m-%d-%H-%M-%S"))
}

/// Installs the global subscriber writing to this run's log file.
///
/// Returns the writer guard; keep it alive until exit so buffered lines are
/// flushed. Returns `None` (logging disabled) if the file cannot be created.
pub fn init_logging() -> Option<WorkerGuard> {
    let dir = log_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("Warning: Failed to create logs directory {}: {}", dir.display(), e);
        return None;
    }

    let path = dir.join(log_file_name(Local::now()));
    let file = match fs::File::create(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: Failed to create log file {}: {}", path.display(), e);
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized - writing to {}", path.display());
    Some(guard)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_log_file_name_is_timestamped() {
        let started = Local.with_ymd_and_hms(2024, 12, 6, 14, 30, 25).unwrap();
        assert_eq!(log_file_name(started), "shell-panel.2024-12-06-14-30-25.log");
    }
}
