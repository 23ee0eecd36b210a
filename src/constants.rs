//! Constants used throughout the application.
//!
//! This module contains all constants used in secview, organized into
//! logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "secview";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "Secure viewer core for helper-encrypted files";

// Encrypted File Detection
/// File suffix identifying helper-encrypted files (matched case-insensitively).
pub const ENCRYPTED_SUFFIX: &str = ".senc";

// Workspace Parameters
/// Prefix of per-session workspace directory names.
pub const WORKSPACE_PREFIX: &str = "secview_";
/// Number of random characters appended to the workspace prefix.
pub const WORKSPACE_RANDOM_LEN: usize = 12;
/// Charset the random workspace suffix is drawn from.
pub const WORKSPACE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
/// Chunk size for the zero-overwrite pass during teardown.
pub const SHRED_CHUNK_BYTES: usize = 4096;
/// Window during which a freshly written workspace file counts as a
/// plaintext candidate.
pub const FRESHNESS_WINDOW_SECS: u64 = 10;

// Session Parameters
/// Seconds a decrypted artifact stays bound before forced teardown.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 600;
/// Minimum passphrase length accepted for encryption flows.
pub const MIN_ENCRYPT_PASSPHRASE_LEN: usize = 6;

// Helper Invocation
/// Path of the encryption helper relative to the application directory.
pub const ENCRYPT_HELPER_RELATIVE: &str = "bin/senc";
/// Upper bound on captured helper output, in bytes.
pub const HELPER_OUTPUT_CAP_BYTES: usize = 64 * 1024;
/// Placeholder substituted for the passphrase in any surfaced output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// Discovery Cache
/// On-disk cache file name inside the user-data directory.
pub const CACHE_FILE_NAME: &str = "file_cache.json";
/// Entries older than this are discarded wholesale on load.
pub const CACHE_MAX_AGE_DAYS: i64 = 7;
/// Milliseconds between cooperative scan steps.
pub const SCAN_TICK_MS: u64 = 100;
/// System mounts the scanner never descends into.
pub const SCAN_EXCLUDED_DIRS: &[&str] = &[
    "/proc",
    "/sys",
    "/dev",
    "/run",
    "/snap",
    "/var/run",
    "/var/lock",
    "/private/var/vm",
    "/Library/Caches",
    "/System/Volumes",
];

// Configuration Keys & Environment Variables
/// Environment variable overriding the encryption helper path.
pub const ENV_VAR_HELPER: &str = "SECVIEW_HELPER";
/// Environment variable overriding the user-data directory.
pub const ENV_VAR_DATA_DIR: &str = "SECVIEW_DATA_DIR";
/// Environment variable overriding the discovery scan root.
pub const ENV_VAR_SCAN_ROOT: &str = "SECVIEW_SCAN_ROOT";
/// Environment variable overriding the session timeout in seconds.
pub const ENV_VAR_SESSION_TIMEOUT: &str = "SECVIEW_SESSION_TIMEOUT";
/// Environment variable supplying a passphrase for non-interactive tests.
pub const ENV_VAR_TEST_PASSPHRASE: &str = "SECVIEW_TEST_PASSPHRASE";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Default user-data sub-directory under the home directory.
pub const DEFAULT_DATA_SUBDIR: &str = ".local/share/secview";

// File System Parameters
/// POSIX permissions for workspaces and their artifacts (owner rwx).
#[cfg(unix)]
pub const WORKSPACE_PERMISSIONS: u32 = 0o700;
/// POSIX permissions for transient passphrase files (owner rw).
#[cfg(unix)]
pub const PASSPHRASE_FILE_PERMISSIONS: u32 = 0o600;
