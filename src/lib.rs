/*!
# Secview

Secview is the core of a secure viewer for helper-encrypted `.senc` files.
A `.senc` file is a self-decrypting executable: run with the right
passphrase on stdin it rewrites itself into the original plaintext. Secview
drives that helper inside a private per-session workspace, classifies the
recovered plaintext, hands it to a display sink, and guarantees the
plaintext is overwritten and removed afterwards whatever happens.

## Core Features

- Private 0700 workspaces under the system temp directory, shredded on
  teardown (zero-overwrite then unlink)
- Helper invocation over a constrained surface: argv arrays, passphrase on
  stdin, bounded and redacted output capture
- A single-session state machine with a hard expiry timer
- A persistent, self-validating discovery cache with a cooperative
  filesystem scanner
- In-place encryption through a configured companion helper

## Architecture

The codebase follows a modular architecture with clear separation of
concerns:

- `cli`: Command-line interface handling using clap
- `config`: Configuration loading and validation
- `errors`: Error handling infrastructure
- `workspace`: Secure workspace lifecycle (create, install, shred, destroy)
- `helper`: External helper invocation for decryption and encryption
- `session`: The decryption session state machine
- `cache`: Discovery cache and paced filesystem scanning
- `viewer`: Media kind classification and the display sink seam
- `passphrase`: Transient passphrase buffering and prompting

## Usage Example

```rust,no_run
use secview::session::SessionMachine;
use secview::viewer::ConsoleSink;
use secview::{Config, PassphraseBuffer};
use std::path::Path;

fn main() -> secview::AppResult<()> {
    let config = Config::load()?;
    config.validate()?;

    let mut passphrases = PassphraseBuffer::new();
    let passphrase = passphrases.get_or_prompt()?.clone();

    let mut session = SessionMachine::new(
        config.temp_root.clone(),
        config.session_timeout_secs,
        Box::new(ConsoleSink::new()),
    );
    session.decrypt(Path::new("/home/user/photo.senc"), &passphrase)?;
    session.clear()
}
```
*/

/// Discovery cache and cooperative filesystem scanning
pub mod cache;
/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Constants used throughout the application
pub mod constants;
/// Error types and utilities for error handling
pub mod errors;
/// External helper invocation (decryption and encryption)
pub mod helper;
/// Transient passphrase buffering and prompting
pub mod passphrase;
/// The decryption session state machine
pub mod session;
/// Media kind classification and the display sink seam
pub mod viewer;
/// Secure workspace lifecycle
pub mod workspace;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use passphrase::PassphraseBuffer;
pub use session::{SessionMachine, SessionState};
pub use viewer::{MediaKind, ViewerSink};
