//! Configuration management for the secview application.
//!
//! This module handles loading and validating configuration settings from
//! environment variables, with sensible defaults. The only environment-derived
//! inputs the core consults are the system temp path, the user-data path, and
//! the user's home path (the default scan root).
//!
//! # Environment Variables
//!
//! - `SECVIEW_HELPER`: Path to the encryption helper (defaults to `bin/senc`
//!   beside the running executable)
//! - `SECVIEW_DATA_DIR`: User-data directory holding the discovery cache
//!   (defaults to `~/.local/share/secview`)
//! - `SECVIEW_SCAN_ROOT`: Root for discovery scans (defaults to `$HOME`)
//! - `SECVIEW_SESSION_TIMEOUT`: Session expiry in seconds (defaults to 600)

use crate::constants::{
    CACHE_FILE_NAME, DEFAULT_DATA_SUBDIR, DEFAULT_SESSION_TIMEOUT_SECS, ENCRYPT_HELPER_RELATIVE,
    ENV_VAR_DATA_DIR, ENV_VAR_HELPER, ENV_VAR_HOME, ENV_VAR_SCAN_ROOT, ENV_VAR_SESSION_TIMEOUT,
};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Configuration for the secview application.
///
/// # Examples
///
/// Creating a configuration manually (useful in tests):
/// ```
/// use secview::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     helper_path: PathBuf::from("/opt/secview/bin/senc"),
///     data_dir: PathBuf::from("/home/user/.local/share/secview"),
///     scan_root: PathBuf::from("/home/user"),
///     temp_root: std::env::temp_dir(),
///     session_timeout_secs: 600,
/// };
/// assert_eq!(config.session_timeout_secs, 600);
/// ```
pub struct Config {
    /// Fully-qualified path of the encryption helper executable.
    ///
    /// Never PATH-resolved: one historical variant shelled out to a bare
    /// `senc`, which made the effective binary depend on the caller's
    /// environment. The default is `bin/senc` beside the running executable.
    pub helper_path: PathBuf,

    /// User-data directory; the discovery cache document lives here.
    pub data_dir: PathBuf,

    /// Root directory for discovery scans.
    pub scan_root: PathBuf,

    /// Parent directory under which per-session workspaces are created.
    pub temp_root: PathBuf,

    /// Seconds a decrypted artifact stays displayed before forced teardown.
    pub session_timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("helper_path", &"[REDACTED_PATH]")
            .field("data_dir", &"[REDACTED_PATH]")
            .field("scan_root", &"[REDACTED_PATH]")
            .field("temp_root", &"[REDACTED_PATH]")
            .field("session_timeout_secs", &self.session_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// Paths are expanded with `shellexpand` so `~` and embedded environment
    /// variables work in overrides.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if:
    /// - A path override fails expansion
    /// - `SECVIEW_SESSION_TIMEOUT` is set but not a positive integer
    pub fn load() -> AppResult<Self> {
        let helper_path = match env::var(ENV_VAR_HELPER) {
            Ok(raw) => PathBuf::from(expand(&raw)?),
            Err(_) => default_helper_path()?,
        };

        let data_dir = match env::var(ENV_VAR_DATA_DIR) {
            Ok(raw) => PathBuf::from(expand(&raw)?),
            Err(_) => {
                let home = env::var(ENV_VAR_HOME).map_err(|_| {
                    AppError::Config(format!(
                        "Neither {} nor {} is set; cannot locate the user-data directory",
                        ENV_VAR_DATA_DIR, ENV_VAR_HOME
                    ))
                })?;
                PathBuf::from(home).join(DEFAULT_DATA_SUBDIR)
            }
        };

        let scan_root = match env::var(ENV_VAR_SCAN_ROOT) {
            Ok(raw) => PathBuf::from(expand(&raw)?),
            Err(_) => PathBuf::from(env::var(ENV_VAR_HOME).unwrap_or_else(|_| "/".to_string())),
        };

        let session_timeout_secs = match env::var(ENV_VAR_SESSION_TIMEOUT) {
            Ok(raw) => raw.parse::<u64>().ok().filter(|&t| t > 0).ok_or_else(|| {
                AppError::Config(format!(
                    "{} must be a positive integer number of seconds, got '{}'",
                    ENV_VAR_SESSION_TIMEOUT, raw
                ))
            })?,
            Err(_) => DEFAULT_SESSION_TIMEOUT_SECS,
        };

        Ok(Config {
            helper_path,
            data_dir,
            scan_root,
            temp_root: env::temp_dir(),
            session_timeout_secs,
        })
    }

    /// Validates the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the scan root is not an absolute path.
    pub fn validate(&self) -> AppResult<()> {
        if !self.scan_root.is_absolute() {
            return Err(AppError::Config(format!(
                "Scan root must be an absolute path: {}",
                self.scan_root.display()
            )));
        }
        Ok(())
    }

    /// Path of the on-disk discovery cache document.
    pub fn cache_file(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE_NAME)
    }
}

fn expand(raw: &str) -> AppResult<String> {
    shellexpand::full(raw)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| AppError::Config(format!("Failed to expand path '{}': {}", raw, e)))
}

fn default_helper_path() -> AppResult<PathBuf> {
    let exe = env::current_exe()
        .map_err(|e| AppError::Config(format!("Cannot locate the running executable: {}", e)))?;
    let dir = exe.parent().ok_or_else(|| {
        AppError::Config("The running executable has no parent directory".to_string())
    })?;
    Ok(dir.join(ENCRYPT_HELPER_RELATIVE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var(ENV_VAR_HELPER);
        env::remove_var(ENV_VAR_DATA_DIR);
        env::remove_var(ENV_VAR_SCAN_ROOT);
        env::remove_var(ENV_VAR_SESSION_TIMEOUT);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        env::set_var(ENV_VAR_HOME, "/home/tester");

        let config = Config::load().expect("load should succeed with defaults");
        assert_eq!(
            config.data_dir,
            PathBuf::from("/home/tester/.local/share/secview")
        );
        assert_eq!(config.scan_root, PathBuf::from("/home/tester"));
        assert_eq!(config.session_timeout_secs, DEFAULT_SESSION_TIMEOUT_SECS);
        assert!(config.helper_path.ends_with("bin/senc"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var(ENV_VAR_HOME, "/home/tester");
        env::set_var(ENV_VAR_HELPER, "/opt/tools/senc");
        env::set_var(ENV_VAR_SCAN_ROOT, "/srv/files");
        env::set_var(ENV_VAR_SESSION_TIMEOUT, "30");

        let config = Config::load().expect("load should succeed");
        assert_eq!(config.helper_path, PathBuf::from("/opt/tools/senc"));
        assert_eq!(config.scan_root, PathBuf::from("/srv/files"));
        assert_eq!(config.session_timeout_secs, 30);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_rejected() {
        clear_env();
        env::set_var(ENV_VAR_HOME, "/home/tester");
        env::set_var(ENV_VAR_SESSION_TIMEOUT, "soon");

        let result = Config::load();
        assert!(matches!(result, Err(AppError::Config(_))));

        env::set_var(ENV_VAR_SESSION_TIMEOUT, "0");
        let result = Config::load();
        assert!(matches!(result, Err(AppError::Config(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_validate_rejects_relative_scan_root() {
        clear_env();
        env::set_var(ENV_VAR_HOME, "/home/tester");
        env::set_var(ENV_VAR_SCAN_ROOT, "files");

        let config = Config::load().expect("load should succeed");
        assert!(config.validate().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_debug_redacts_paths() {
        clear_env();
        env::set_var(ENV_VAR_HOME, "/home/tester");

        let config = Config::load().expect("load should succeed");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("/home/tester"));
        assert!(debug.contains("[REDACTED_PATH]"));
    }

    #[test]
    #[serial]
    fn test_cache_file_location() {
        clear_env();
        env::set_var(ENV_VAR_DATA_DIR, "/data/secview");
        env::set_var(ENV_VAR_HOME, "/home/tester");

        let config = Config::load().expect("load should succeed");
        assert_eq!(
            config.cache_file(),
            PathBuf::from("/data/secview/file_cache.json")
        );

        clear_env();
    }
}
