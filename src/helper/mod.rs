//! Invocation of the external cryptographic helper.
//!
//! The helper is an opaque executable: it performs key derivation, cipher,
//! MAC, and the file rewrite. This module only drives it over a constrained
//! surface — argv-array spawning, a passphrase fed over stdin, and a bounded
//! capture of its output — and never inspects ciphertext or handles keys.
//!
//! For decryption the helper is the ciphertext copy itself, executed inside
//! the workspace. For encryption a configured helper binary is run in the
//! plaintext's directory with the passphrase supplied twice from a private
//! temporary file.
//!
//! Passphrase contents never appear in log output or in any error value;
//! captured helper output is redacted before it is surfaced.

use crate::constants::{HELPER_OUTPUT_CAP_BYTES, PASSPHRASE_FILE_PERMISSIONS, REDACTED_PLACEHOLDER};
use crate::errors::{AppResult, HelperError};
use crate::workspace::{Artifact, Workspace};
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Runs the self-decrypting ciphertext copy inside its workspace.
///
/// The helper is invoked as `./<ciphertext-filename>` with the workspace as
/// its working directory. It reads one passphrase line from stdin and is
/// expected to write the plaintext as a sibling file and exit 0. The
/// plaintext filename is the helper's choice; discovery is the caller's job.
///
/// # Errors
///
/// - `HelperError::SuspectFilename` if the filename contains control bytes
/// - `HelperError::Spawn` if the process cannot be started
/// - `HelperError::Execution` with redacted output on a non-zero exit
pub fn decrypt_in_workspace(
    workspace: &Workspace,
    ciphertext: &Artifact,
    passphrase: &SecretString,
) -> AppResult<()> {
    let file_name = ciphertext
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(HelperError::SuspectFilename)?;
    ensure_safe_filename(file_name)?;
    debug!("Invoking helper ./{}", escape_shell_arg(file_name));

    let program = PathBuf::from(".").join(file_name);
    let mut child = Command::new(&program)
        .current_dir(workspace.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HelperError::Spawn {
            command: format!("./{}", escape_shell_arg(file_name)),
            source: e,
        })?;

    // Feed the passphrase and close stdin so the helper sees EOF.
    if let Some(mut stdin) = child.stdin.take() {
        let write_result = stdin
            .write_all(passphrase.expose_secret().as_bytes())
            .and_then(|_| stdin.write_all(b"\n"));
        // A helper that exits before reading closes the pipe; that is its
        // exit status's story to tell, not a spawn failure.
        if let Err(e) = write_result {
            debug!("Helper closed stdin early: {}", e);
        }
    }

    let output = child.wait_with_output().map_err(|e| HelperError::Spawn {
        command: format!("./{}", escape_shell_arg(file_name)),
        source: e,
    })?;

    if output.status.success() {
        info!("Helper reported success");
        return Ok(());
    }

    let captured = capture_merged(&output.stdout, &output.stderr);
    Err(HelperError::Execution {
        exit_code: output.status.code().unwrap_or(-1),
        output: redact(&captured, passphrase),
    }
    .into())
}

/// Encrypts a plaintext file in place via the configured helper.
///
/// Writes the passphrase twice (each followed by a newline) to a private
/// 0o600 temporary file, then runs `helper <basename>` with the plaintext's
/// directory as CWD and the passphrase file as stdin. The helper replaces
/// the plaintext with a `.senc` sibling; the exact naming is its contract.
/// The passphrase file is unlinked on every exit path.
///
/// # Errors
///
/// Same taxonomy as [`decrypt_in_workspace`], plus `Io` for passphrase-file
/// creation failures.
pub fn encrypt_in_place(
    helper: &Path,
    plaintext: &Path,
    passphrase: &SecretString,
) -> AppResult<()> {
    let file_name = plaintext
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(HelperError::SuspectFilename)?;
    ensure_safe_filename(file_name)?;
    let work_dir = plaintext.parent().unwrap_or_else(|| Path::new("."));

    // NamedTempFile unlinks on drop, which covers every exit path below.
    let mut passphrase_file = NamedTempFile::new()?;
    #[cfg(unix)]
    fs::set_permissions(
        passphrase_file.path(),
        fs::Permissions::from_mode(PASSPHRASE_FILE_PERMISSIONS),
    )?;
    for _ in 0..2 {
        passphrase_file.write_all(passphrase.expose_secret().as_bytes())?;
        passphrase_file.write_all(b"\n")?;
    }
    passphrase_file.flush()?;
    let stdin_file = passphrase_file.reopen()?;

    debug!(
        "Invoking encryption helper on {}",
        escape_shell_arg(file_name)
    );
    let output = Command::new(helper)
        .arg(file_name)
        .current_dir(work_dir)
        .stdin(Stdio::from(stdin_file))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| HelperError::Spawn {
            command: helper.display().to_string(),
            source: e,
        })?;

    if output.status.success() {
        info!("Encryption helper reported success");
        return Ok(());
    }

    let captured = capture_merged(&output.stdout, &output.stderr);
    Err(HelperError::Execution {
        exit_code: output.status.code().unwrap_or(-1),
        output: redact(&captured, passphrase),
    }
    .into())
}

/// Quotes an argument for inclusion in audit logs.
///
/// Single quotes become `'\''`; backslash, double quote, dollar, and
/// backtick are backslash-prefixed. This routine exists only for logging:
/// actual invocation passes argv arrays and never goes through a shell.
pub fn escape_shell_arg(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len() + 4);
    for c in arg.chars() {
        match c {
            '\'' => escaped.push_str("'\\''"),
            '\\' | '"' | '$' | '`' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Rejects filenames the escape policy cannot vouch for.
///
/// The quoting rules above cover the shell metacharacters; anything with
/// raw control bytes is refused outright rather than passed through.
fn ensure_safe_filename(name: &str) -> Result<(), HelperError> {
    if name.chars().any(|c| c.is_control()) {
        return Err(HelperError::SuspectFilename);
    }
    Ok(())
}

/// Merges stdout and stderr into one lossy string, bounded at the capture
/// cap so a chatty helper cannot balloon an error dialog.
fn capture_merged(stdout: &[u8], stderr: &[u8]) -> String {
    let mut merged = Vec::with_capacity(stdout.len() + stderr.len());
    merged.extend_from_slice(stdout);
    merged.extend_from_slice(stderr);
    merged.truncate(HELPER_OUTPUT_CAP_BYTES);
    String::from_utf8_lossy(&merged).into_owned()
}

/// Replaces every occurrence of the passphrase in captured output.
fn redact(output: &str, passphrase: &SecretString) -> String {
    let secret = passphrase.expose_secret();
    if secret.is_empty() {
        return output.to_string();
    }
    output.replace(secret, REDACTED_PLACEHOLDER)
}
