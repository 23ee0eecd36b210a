//! The secure decryption session state machine.
//!
//! One machine owns at most one live session: a private workspace, the
//! plaintext artifact bound to the viewer sink, and the expiry deadline.
//! Every exit path — helper failure, ambiguous output, sink rejection, user
//! clear, timer expiry, drop — funnels through the same teardown, which
//! releases the sink before the workspace shreds its files.
//!
//! The machine is an explicit owner object: construct one in `main` (or one
//! per test) and pass it around. Nothing here is global.

use crate::errors::{AppResult, HelperError, SessionError};
use crate::helper;
use crate::viewer::{classify, ViewerSink};
use crate::workspace::{Artifact, Workspace};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Phase of the session lifecycle.
///
/// Transitions:
/// - `Idle → Decrypting` on a decrypt request
/// - `Decrypting → Displayed` on helper success with exactly one candidate
/// - `Decrypting → TearingDown` on any failure
/// - `Displayed → TearingDown` on expiry, clear, or a new decrypt request
/// - `TearingDown → Idle` when the workspace destroy completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session bound, no timer running.
    Idle,
    /// Workspace created, helper running; further requests are rejected.
    Decrypting,
    /// Plaintext bound to the viewer sink; expiry timer running.
    Displayed,
    /// Workspace being destroyed; requests are rejected until `Idle`.
    TearingDown,
}

/// Owns the lifecycle of decryption sessions.
///
/// # Examples
///
/// ```no_run
/// use secview::session::SessionMachine;
/// use secview::viewer::ConsoleSink;
/// use secrecy::SecretString;
/// use std::path::Path;
///
/// let mut machine = SessionMachine::new(
///     std::env::temp_dir(),
///     600,
///     Box::new(ConsoleSink::new()),
/// );
/// let passphrase = SecretString::from("correct horse".to_string());
/// machine.decrypt(Path::new("/files/photo.senc"), &passphrase)?;
/// assert!(machine.remaining_secs().is_some());
/// machine.clear()?;
/// # Ok::<(), secview::AppError>(())
/// ```
pub struct SessionMachine {
    state: SessionState,
    workspace: Option<Workspace>,
    displayed: Option<Artifact>,
    ciphertext_source: Option<PathBuf>,
    deadline: Option<Instant>,
    timeout: Duration,
    temp_root: PathBuf,
    sink: Box<dyn ViewerSink>,
}

impl SessionMachine {
    /// Creates an idle machine.
    ///
    /// `temp_root` is the parent for per-session workspaces and
    /// `timeout_secs` the auto-teardown interval (600 by default at the
    /// configuration layer).
    pub fn new(temp_root: PathBuf, timeout_secs: u64, sink: Box<dyn ViewerSink>) -> Self {
        SessionMachine {
            state: SessionState::Idle,
            workspace: None,
            displayed: None,
            ciphertext_source: None,
            deadline: None,
            timeout: Duration::from_secs(timeout_secs),
            temp_root,
            sink,
        }
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Seconds until forced teardown, while a session is displayed.
    pub fn remaining_secs(&self) -> Option<u64> {
        let deadline = self.deadline?;
        Some(
            deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_default()
                .as_secs(),
        )
    }

    /// File name of the displayed artifact, for status surfaces.
    pub fn displayed_name(&self) -> Option<String> {
        self.displayed
            .as_ref()
            .and_then(|a| a.path.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Original path of the ciphertext behind the current session.
    pub fn ciphertext_source(&self) -> Option<&Path> {
        self.ciphertext_source.as_deref()
    }

    /// Decrypts `ciphertext` and binds the resulting plaintext to the sink.
    ///
    /// A prior displayed session is torn down first; two sessions never
    /// coexist. The helper blocks this call until it exits (no timeout is
    /// imposed on it). On every failure the workspace is destroyed before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// - `SessionError::Busy` while decrypting or tearing down
    /// - `Io` with `NotFound` if `ciphertext` does not exist
    /// - the full `WorkspaceError`/`HelperError` taxonomy from the stages
    /// - `SessionError::UnsupportedMedia` if the sink declines the artifact
    pub fn decrypt(&mut self, ciphertext: &Path, passphrase: &SecretString) -> AppResult<()> {
        match self.state {
            SessionState::Decrypting | SessionState::TearingDown => {
                return Err(SessionError::Busy.into())
            }
            SessionState::Displayed => {
                debug!("New decrypt request; tearing down the prior session");
                self.clear()?;
            }
            SessionState::Idle => {}
        }

        if !ciphertext.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Encrypted file not found: {}", ciphertext.display()),
            )
            .into());
        }

        self.state = SessionState::Decrypting;
        info!("Starting decryption session");

        match self.run_decrypt(ciphertext, passphrase) {
            Ok(()) => {
                // Bind happened above; only now does the clock start.
                self.deadline = Some(Instant::now() + self.timeout);
                self.ciphertext_source = Some(ciphertext.to_path_buf());
                self.state = SessionState::Displayed;
                info!("Session displayed; expiry timer started");
                Ok(())
            }
            Err(e) => {
                if let Err(teardown_err) = self.teardown() {
                    warn!("Teardown after failed decrypt reported: {}", teardown_err);
                }
                Err(e)
            }
        }
    }

    /// Tears down the current session, releasing the sink first.
    ///
    /// A no-op while idle. Cancels the expiry timer.
    ///
    /// # Errors
    ///
    /// `SessionError::Busy` while a decrypt is in flight; otherwise any
    /// teardown error after the workspace pass has completed.
    pub fn clear(&mut self) -> AppResult<()> {
        match self.state {
            SessionState::Decrypting | SessionState::TearingDown => {
                Err(SessionError::Busy.into())
            }
            SessionState::Idle => Ok(()),
            SessionState::Displayed => {
                info!("Clearing displayed session");
                self.teardown()
            }
        }
    }

    /// Advances the expiry timer; call once per status tick (~1 s).
    ///
    /// Returns `true` if the deadline had passed and the session was torn
    /// down within this call.
    pub fn tick(&mut self) -> AppResult<bool> {
        if self.state != SessionState::Displayed {
            return Ok(false);
        }
        let expired = self
            .deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false);
        if !expired {
            return Ok(false);
        }
        info!("Session expired; forcing teardown");
        self.teardown()?;
        Ok(true)
    }

    /// Encrypts a plaintext file in place via the configured helper.
    ///
    /// Permitted while idle or displayed; rejected mid-decrypt. The caller
    /// is expected to clear the passphrase buffer once this returns.
    pub fn encrypt(
        &mut self,
        helper_path: &Path,
        plaintext: &Path,
        passphrase: &SecretString,
    ) -> AppResult<()> {
        if matches!(
            self.state,
            SessionState::Decrypting | SessionState::TearingDown
        ) {
            return Err(SessionError::Busy.into());
        }
        if !plaintext.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", plaintext.display()),
            )
            .into());
        }
        helper::encrypt_in_place(helper_path, plaintext, passphrase)
    }

    fn run_decrypt(&mut self, ciphertext: &Path, passphrase: &SecretString) -> AppResult<()> {
        let mut workspace = Workspace::create(&self.temp_root)?;

        let outcome = Self::produce_candidate(&mut workspace, ciphertext, passphrase);
        // The workspace is adopted either way so teardown owns its fate.
        let artifact = match outcome {
            Ok(artifact) => artifact,
            Err(e) => {
                self.workspace = Some(workspace);
                return Err(e);
            }
        };

        let kind = classify(&artifact.path);
        debug!("Candidate classified as {}", kind);
        let bound = match self.sink.bind(&artifact.path, kind) {
            Ok(bound) => bound,
            Err(e) => {
                self.workspace = Some(workspace);
                return Err(e);
            }
        };
        if !bound {
            self.workspace = Some(workspace);
            return Err(SessionError::UnsupportedMedia {
                kind: kind.to_string(),
            }
            .into());
        }

        self.workspace = Some(workspace);
        self.displayed = Some(artifact);
        Ok(())
    }

    /// Install, run the helper, and pick out exactly one fresh plaintext.
    fn produce_candidate(
        workspace: &mut Workspace,
        ciphertext: &Path,
        passphrase: &SecretString,
    ) -> AppResult<Artifact> {
        let cipher_copy = workspace.install(ciphertext)?;
        helper::decrypt_in_workspace(workspace, &cipher_copy, passphrase)?;

        let mut candidates = workspace.list_fresh_default()?;
        match candidates.len() {
            0 => Err(HelperError::NoOutput.into()),
            1 => workspace.register_candidate(&candidates.remove(0)),
            n => Err(HelperError::AmbiguousOutput { count: n }.into()),
        }
    }

    /// Releases the sink, destroys the workspace, returns to idle.
    fn teardown(&mut self) -> AppResult<()> {
        self.state = SessionState::TearingDown;

        if self.displayed.take().is_some() {
            // The files still exist here; the sink can drop handles or stop
            // a media pipeline before they disappear.
            self.sink.release();
        }
        self.deadline = None;
        self.ciphertext_source = None;

        let result = match self.workspace.take() {
            Some(mut workspace) => workspace.destroy(),
            None => Ok(()),
        };

        self.state = SessionState::Idle;
        result
    }
}

impl Drop for SessionMachine {
    fn drop(&mut self) {
        if self.state != SessionState::Idle {
            if let Err(e) = self.teardown() {
                warn!("Session teardown during drop reported: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::viewer::MediaKind;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingState {
        bound: Vec<(PathBuf, MediaKind)>,
        released: usize,
    }

    struct RecordingSink {
        state: Rc<RefCell<RecordingState>>,
        accept: bool,
    }

    impl ViewerSink for RecordingSink {
        fn bind(&mut self, path: &Path, kind: MediaKind) -> AppResult<bool> {
            self.state.borrow_mut().bound.push((path.to_path_buf(), kind));
            Ok(self.accept)
        }

        fn release(&mut self) {
            self.state.borrow_mut().released += 1;
        }
    }

    fn machine_with_sink(accept: bool) -> (SessionMachine, Rc<RefCell<RecordingState>>) {
        let state = Rc::new(RefCell::new(RecordingState::default()));
        let sink = RecordingSink {
            state: Rc::clone(&state),
            accept,
        };
        let temp_root = tempdir().expect("create temp root");
        let machine = SessionMachine::new(temp_root.path().to_path_buf(), 600, Box::new(sink));
        // Leak the tempdir guard; the OS cleans /tmp and the workspace
        // beneath it shreds itself.
        std::mem::forget(temp_root);
        (machine, state)
    }

    #[test]
    fn test_starts_idle_with_no_timer() {
        let (machine, _) = machine_with_sink(true);
        assert_eq!(machine.state(), SessionState::Idle);
        assert!(machine.remaining_secs().is_none());
        assert!(machine.displayed_name().is_none());
    }

    #[test]
    fn test_clear_while_idle_is_noop() {
        let (mut machine, state) = machine_with_sink(true);
        machine.clear().expect("clear while idle");
        assert_eq!(machine.state(), SessionState::Idle);
        assert_eq!(state.borrow().released, 0);
    }

    #[test]
    fn test_tick_while_idle_does_nothing() {
        let (mut machine, _) = machine_with_sink(true);
        assert!(!machine.tick().expect("tick while idle"));
    }

    #[test]
    fn test_decrypt_missing_file_is_not_found() {
        let (mut machine, _) = machine_with_sink(true);
        let passphrase = SecretString::from("pw".to_string());
        let result = machine.decrypt(Path::new("/no/such/file.senc"), &passphrase);
        assert!(matches!(
            result,
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound
        ));
        assert_eq!(machine.state(), SessionState::Idle);
    }
}
