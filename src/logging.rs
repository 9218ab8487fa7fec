//! Logging infrastructure.
//!
//! Provides structured file logging with daily rotation to platform-standard directories.
//! Logs never go to the terminal: the TUI owns the screen.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use directories::ProjectDirs;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, reload};

/// Prefix of the rolling log files.
const LOG_FILE_PREFIX: &str = "promptcodegen";

/// Handle for swapping the active level filter once config is loaded.
pub type ReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Result of initializing the logging system.
pub struct LoggingContext {
    /// Guard that must be held for the application lifetime to ensure logs are flushed.
    pub _guard: WorkerGuard,
    /// The session ID for this invocation.
    pub session_id: String,
    /// The directory where logs are written.
    pub log_directory: PathBuf,
    reload_handle: ReloadHandle,
}

impl LoggingContext {
    /// Replace the level filter with the configured one.
    ///
    /// `RUST_LOG` keeps precedence when set, so a developer override is not
    /// clobbered by the config file.
    pub fn apply_level(&self, level: &str) {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return;
        }
        let filter = match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(e) => {
                warn!(level, error = %e, "log_level_invalid");
                return;
            }
        };
        if let Err(e) = self.reload_handle.reload(filter) {
            warn!(error = %e, "log_level_reload_failed");
            return;
        }
        info!(level, "log_level_applied");
    }
}

/// Error that occurred during logging initialization.
#[derive(Debug)]
pub struct LoggingError {
    pub message: String,
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Generates a 6-character random hex session ID.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let bytes: [u8; 3] = rng.random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Initializes the logging system.
///
/// The returned `WorkerGuard` must be held for the application lifetime.
pub fn init() -> Result<LoggingContext, LoggingError> {
    let session_id = generate_session_id();

    let project_dirs = ProjectDirs::from("dev", "promptcodegen", "promptcodegen").ok_or_else(
        || LoggingError {
            message: "Failed to determine platform directories".to_string(),
        },
    )?;

    // macOS: ~/Library/Logs/promptcodegen/
    // Linux: ~/.local/state/promptcodegen/
    // Windows: %LocalAppData%\promptcodegen\
    let log_dir = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library").join("Logs").join(LOG_FILE_PREFIX))
    } else {
        project_dirs
            .state_dir()
            .map(PathBuf::from)
            .or_else(|| Some(project_dirs.cache_dir().to_path_buf()))
    }
    .ok_or_else(|| LoggingError {
        message: "Failed to determine log directory".to_string(),
    })?;

    fs::create_dir_all(&log_dir).map_err(|e| LoggingError {
        message: format!("Failed to create log directory: {}", e),
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, reload_handle) = reload::Layer::new(env_filter);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError {
            message: format!("Failed to install log subscriber: {}", e),
        })?;

    info!(session_id = %session_id, "session_start");

    Ok(LoggingContext {
        _guard: guard,
        session_id,
        log_directory: log_dir,
        reload_handle,
    })
}

/// How long rotated log files are kept.
const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Delete rotated log files older than [`LOG_RETENTION`]. Returns how many
/// were removed. Failures are logged and skipped.
pub fn cleanup_old_logs(log_dir: &Path) -> usize {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = ?log_dir, error = %e, "log_cleanup_read_dir_failed");
            return 0;
        }
    };

    let now = SystemTime::now();
    let expired = entries.filter_map(Result::ok).filter(|entry| {
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_rotated_log) {
            return false;
        }
        entry
            .metadata()
            .and_then(|m| m.modified())
            .is_ok_and(|modified| is_expired(modified, now))
    });

    let mut removed = 0;
    for entry in expired {
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(file = ?entry.path(), error = %e, "log_cleanup_remove_failed"),
        }
    }
    if removed > 0 {
        debug!(removed, "log_cleanup_done");
    }
    removed
}

fn is_expired(modified: SystemTime, now: SystemTime) -> bool {
    now.duration_since(modified)
        .is_ok_and(|age| age > LOG_RETENTION)
}

/// Rotated files are named `<prefix>.<date>`.
fn is_rotated_log(file_name: &str) -> bool {
    file_name
        .strip_prefix(LOG_FILE_PREFIX)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_six_hex_chars() {
        let id = generate_session_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_is_rotated_log() {
        assert!(is_rotated_log("promptcodegen.2026-10-01"));
        assert!(!is_rotated_log("promptcodegen"));
        assert!(!is_rotated_log("promptcodegen."));
        assert!(!is_rotated_log("other.2026-10-01"));
        assert!(!is_rotated_log("promptcodegenx.2026"));
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let recent = dir.path().join("promptcodegen.2026-10-15");
        let foreign = dir.path().join("notes.txt");
        fs::write(&recent, "log").unwrap();
        fs::write(&foreign, "keep").unwrap();

        assert_eq!(cleanup_old_logs(dir.path()), 0);

        assert!(recent.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_is_expired() {
        let now = SystemTime::now();
        assert!(!is_expired(now, now));
        assert!(!is_expired(now - Duration::from_secs(6 * 24 * 3600), now));
        assert!(is_expired(now - Duration::from_secs(8 * 24 * 3600), now));
        // Clock skew: modified in the future is never expired.
        assert!(!is_expired(now + Duration::from_secs(60), now));
    }

    #[test]
    fn test_cleanup_missing_dir_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent")), 0);
    }
}
