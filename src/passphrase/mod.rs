//! Transient passphrase handling.
//!
//! The buffer is the only durable holder of the user's passphrase. It is
//! never serialised, never logged, and cleared eagerly: encryption flows wipe
//! it as soon as the helper returns, decryption flows may retain it across
//! sessions at the user's option (so a sidebar double-click can reuse it).
//! `SecretString` zeroizes the backing memory on drop.

use crate::constants::{ENV_VAR_TEST_PASSPHRASE, MIN_ENCRYPT_PASSPHRASE_LEN};
use crate::errors::{AppResult, PassphraseError};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::debug;

/// Holds the current passphrase between prompts.
///
/// # Examples
///
/// ```
/// use secview::passphrase::PassphraseBuffer;
/// use secrecy::SecretString;
///
/// let mut buffer = PassphraseBuffer::new();
/// assert!(buffer.is_empty());
///
/// buffer.set(SecretString::from("correct horse".to_string()));
/// assert!(!buffer.is_empty());
///
/// buffer.clear();
/// assert!(buffer.is_empty());
/// ```
#[derive(Default)]
pub struct PassphraseBuffer {
    current: Option<SecretString>,
}

impl fmt::Debug for PassphraseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassphraseBuffer")
            .field("current", &self.current.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PassphraseBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffered passphrase, if any.
    pub fn get(&self) -> Option<&SecretString> {
        self.current.as_ref()
    }

    /// Replaces the buffered passphrase.
    pub fn set(&mut self, passphrase: SecretString) {
        self.current = Some(passphrase);
    }

    /// Drops the buffered passphrase; the backing memory is zeroized.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Whether no passphrase is buffered.
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Returns the buffered passphrase, prompting interactively if empty.
    ///
    /// # Errors
    ///
    /// Returns `PassphraseError::Prompt` if stdin cannot be read and
    /// `PassphraseError::Empty` if the user enters nothing.
    ///
    /// # Testing
    ///
    /// Set `SECVIEW_TEST_PASSPHRASE` to bypass interactive prompting.
    pub fn get_or_prompt(&mut self) -> AppResult<&SecretString> {
        if self.current.is_none() {
            debug!("No buffered passphrase, prompting");
            let passphrase = if let Ok(test) = std::env::var(ENV_VAR_TEST_PASSPHRASE) {
                debug!("Using {} for non-interactive testing", ENV_VAR_TEST_PASSPHRASE);
                SecretString::from(test)
            } else {
                Self::prompt("Enter decryption passphrase: ")?
            };
            self.current = Some(passphrase);
        }
        self.current
            .as_ref()
            .ok_or_else(|| PassphraseError::Unavailable.into())
    }

    /// Prompts for a new passphrase with confirmation, for encryption flows.
    ///
    /// Enforces the minimum length and that both entries match. The result
    /// is returned rather than buffered: the caller hands it to the helper
    /// and the buffer is expected to be cleared once encryption completes.
    ///
    /// # Errors
    ///
    /// - `PassphraseError::TooShort` if under the minimum length
    /// - `PassphraseError::Mismatch` if the confirmation differs
    pub fn prompt_confirmed() -> AppResult<SecretString> {
        if let Ok(test) = std::env::var(ENV_VAR_TEST_PASSPHRASE) {
            debug!("Using {} for non-interactive testing", ENV_VAR_TEST_PASSPHRASE);
            return Self::validate_for_encryption(SecretString::from(test));
        }

        let passphrase = Self::prompt("Enter encryption passphrase: ")?;
        let confirmation = Self::prompt("Verify passphrase: ")?;

        if passphrase.expose_secret() != confirmation.expose_secret() {
            return Err(PassphraseError::Mismatch.into());
        }
        Self::validate_for_encryption(passphrase)
    }

    fn validate_for_encryption(passphrase: SecretString) -> AppResult<SecretString> {
        let len = passphrase.expose_secret().chars().count();
        if len == 0 {
            return Err(PassphraseError::Empty.into());
        }
        if len < MIN_ENCRYPT_PASSPHRASE_LEN {
            return Err(PassphraseError::TooShort {
                min: MIN_ENCRYPT_PASSPHRASE_LEN,
            }
            .into());
        }
        Ok(passphrase)
    }

    fn prompt(message: &str) -> AppResult<SecretString> {
        let entered = rpassword::prompt_password(message)
            .map_err(|e| PassphraseError::Prompt(e.to_string()))?;
        if entered.is_empty() {
            return Err(PassphraseError::Empty.into());
        }
        Ok(SecretString::from(entered))
    }
}
