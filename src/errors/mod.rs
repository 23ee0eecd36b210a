//! Error handling utilities for the secview application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! The propagation policy is that errors local to a decryption session always
//! funnel into teardown: the workspace is destroyed before the failure is
//! surfaced, so no plaintext can outlive a failed operation. Discovery-cache
//! errors never affect a session. Passphrases never appear in any error value.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while creating or destroying secure workspaces.
///
/// # Examples
///
/// ```
/// use secview::errors::WorkspaceError;
/// use std::io::{self, ErrorKind};
/// use std::path::PathBuf;
///
/// let io_error = io::Error::new(ErrorKind::PermissionDenied, "permission denied");
/// let error = WorkspaceError::Creation {
///     path: PathBuf::from("/tmp/secview_abc"),
///     source: io_error,
/// };
/// assert!(format!("{}", error).contains("private workspace"));
/// ```
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The private directory could not be created with owner-only permissions.
    #[error("Failed to create private workspace at {path}: {source}. Check that the system temp directory is writable.")]
    Creation {
        /// The workspace path that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Copying the ciphertext into the workspace failed.
    #[error("Failed to install {path} into the workspace: {source}")]
    Install {
        /// The source path that could not be copied
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// One or more files could not be overwritten or removed during teardown.
    ///
    /// Teardown is best-effort: the full pass still ran to completion before
    /// this error was reported.
    #[error("Workspace teardown at {path} completed with errors: {detail}")]
    Teardown {
        /// The workspace path being destroyed
        path: PathBuf,
        /// Description of the first failure encountered
        detail: String,
    },
}

/// Errors raised while driving the external cryptographic helper.
#[derive(Debug, Error)]
pub enum HelperError {
    /// The helper process could not be started at all.
    #[error("Failed to start helper '{command}': {source}. Check that the file is executable.")]
    Spawn {
        /// The helper command that failed to start
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The helper ran but reported failure.
    ///
    /// `output` is the captured (bounded, passphrase-redacted) merged
    /// stdout/stderr, suitable for showing to the user.
    #[error("Helper exited with status {exit_code}:\n{output}")]
    Execution {
        /// The helper's exit code
        exit_code: i32,
        /// Captured output, redacted of the passphrase
        output: String,
    },

    /// The helper exited 0 but no plaintext candidate appeared in the
    /// freshness window.
    #[error("Helper reported success but produced no decrypted file")]
    NoOutput,

    /// The helper exited 0 but more than one plaintext candidate appeared.
    /// Binding would have to guess, so this is treated as failure.
    #[error("Helper produced {count} candidate files; refusing to guess which is the plaintext")]
    AmbiguousOutput {
        /// Number of fresh candidates found
        count: usize,
    },

    /// A filename contained bytes the escape policy refuses to pass through.
    #[error("Filename contains control characters and was rejected")]
    SuspectFilename,
}

/// Errors raised by the session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A decrypt or encrypt request arrived while another is in flight or a
    /// teardown is in progress.
    #[error("A session operation is already in progress. Wait for it to finish before starting another.")]
    Busy,

    /// The viewer sink declined the decrypted artifact.
    #[error("The decrypted file could not be displayed ({kind} renderer declined it)")]
    UnsupportedMedia {
        /// The media kind the classifier assigned
        kind: String,
    },
}

/// Errors raised while loading or saving the discovery cache.
///
/// These are non-fatal by policy: callers log them and continue with
/// in-memory state.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache document failed.
    #[error("Discovery cache I/O failed at {path}: {source}")]
    Io {
        /// The cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Serializing the cache document failed.
    #[error("Failed to serialize discovery cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by the passphrase buffer.
#[derive(Debug, Error)]
pub enum PassphraseError {
    /// Interactive prompting failed (stdin closed, not a terminal, ...).
    #[error("Failed to read passphrase: {0}")]
    Prompt(String),

    /// The confirmation prompt did not match the first entry.
    #[error("Passphrases do not match")]
    Mismatch,

    /// An empty passphrase was entered.
    #[error("Passphrase cannot be empty")]
    Empty,

    /// The passphrase is shorter than the encryption minimum.
    #[error("Passphrase must be at least {min} characters")]
    TooShort {
        /// The enforced minimum length
        min: usize,
    },

    /// No passphrase is buffered and prompting was not permitted.
    #[error("No passphrase available")]
    Unavailable,
}

/// Represents all possible errors that can occur in the secview application.
///
/// This enum is the central error type used across the application, with
/// variants for different error categories. It uses `thiserror` for deriving
/// the `Error` trait implementation and formatted error messages.
///
/// # Examples
///
/// Converting from an IO error:
/// ```
/// use secview::errors::AppError;
/// use std::io::{self, ErrorKind};
///
/// let io_error = io::Error::new(ErrorKind::NotFound, "file not found");
/// let app_error: AppError = io_error.into();
///
/// match app_error {
///     AppError::Io(inner) => assert_eq!(inner.kind(), ErrorKind::NotFound),
///     _ => panic!("Expected Io variant"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to secure workspace lifecycle.
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Errors related to driving the external helper.
    #[error("Helper error: {0}")]
    Helper(#[from] HelperError),

    /// Errors related to the session state machine.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Errors related to the discovery cache.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Errors related to the passphrase buffer.
    #[error("Passphrase error: {0}")]
    Passphrase(#[from] PassphraseError),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
///
/// # Examples
///
/// ```
/// use secview::errors::{AppResult, AppError};
///
/// fn might_fail() -> AppResult<String> {
///     if false {
///         return Err(AppError::Config("Something went wrong".to_string()));
///     }
///     Ok("Operation succeeded".to_string())
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_app_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected AppError::Io variant"),
        }
    }

    #[test]
    fn test_workspace_error_display() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let error = WorkspaceError::Creation {
            path: PathBuf::from("/tmp/secview_abcdef123456"),
            source: io_error,
        };
        let message = format!("{}", error);
        assert!(message.contains("private workspace"));
        assert!(message.contains("/tmp/secview_abcdef123456"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn test_helper_execution_error_carries_output() {
        let error = HelperError::Execution {
            exit_code: 1,
            output: "bad pass".to_string(),
        };
        let message = format!("{}", error);
        assert!(message.contains("status 1"));
        assert!(message.contains("bad pass"));
    }

    #[test]
    fn test_ambiguous_output_names_count() {
        let error = HelperError::AmbiguousOutput { count: 2 };
        let message = format!("{}", error);
        assert!(message.contains('2'));
        assert!(message.contains("refusing to guess"));
    }

    #[test]
    fn test_session_busy_display() {
        let message = format!("{}", SessionError::Busy);
        assert!(message.contains("already in progress"));
    }

    #[test]
    fn test_app_error_wrapping_preserves_detail() {
        let error: AppError = HelperError::NoOutput.into();
        let message = format!("{}", error);
        assert!(message.starts_with("Helper error: "));
        assert!(message.contains("no decrypted file"));

        let error: AppError = SessionError::UnsupportedMedia {
            kind: "video".to_string(),
        }
        .into();
        assert!(format!("{}", error).contains("video"));
    }

    #[test]
    fn test_error_source_chaining() {
        use std::error::Error;

        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let workspace_error = WorkspaceError::Creation {
            path: PathBuf::from("/tmp/w"),
            source: io_error,
        };
        let app_error = AppError::Workspace(workspace_error);

        let first = app_error
            .source()
            .expect("AppError::Workspace should have a source");
        let workspace_source = first
            .downcast_ref::<WorkspaceError>()
            .expect("First source should be WorkspaceError");
        let second = workspace_source
            .source()
            .expect("WorkspaceError::Creation should have a source");
        let io_source = second
            .downcast_ref::<io::Error>()
            .expect("Second source should be io::Error");
        assert_eq!(io_source.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_cache_error_display() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "missing");
        let error = CacheError::Io {
            path: PathBuf::from("/data/file_cache.json"),
            source: io_error,
        };
        let message = format!("{}", error);
        assert!(message.contains("file_cache.json"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_passphrase_error_display() {
        assert!(format!("{}", PassphraseError::Mismatch).contains("do not match"));
        assert!(format!("{}", PassphraseError::TooShort { min: 6 }).contains('6'));
        assert!(format!("{}", PassphraseError::Empty).contains("empty"));
    }
}
