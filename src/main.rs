/*!
# Secview - Secure Viewer for Helper-Encrypted Files

Secview decrypts `.senc` files into a private, self-destructing workspace
and displays the result, or encrypts plaintext files in place through the
companion helper.

This file contains the main application flow, coordinating the session
state machine, the passphrase buffer, and the discovery cache.

## Usage

```
secview [OPTIONS] [FILE]

Arguments:
  [FILE]  A .senc file is decrypted and viewed, anything else is encrypted

Options:
  -s, --scan     Re-scan the filesystem for encrypted files
  -v, --verbose  Enable verbose output
  -h, --help     Print help information
  -V, --version  Print version information
```

## Configuration

The application can be configured with the following environment variables:
- `SECVIEW_HELPER`: Path to the encryption helper (defaults to `bin/senc`
  beside the executable)
- `SECVIEW_DATA_DIR`: Directory holding the discovery cache
- `SECVIEW_SCAN_ROOT`: Root directory for discovery scans (defaults to `$HOME`)
- `SECVIEW_SESSION_TIMEOUT`: Session expiry in seconds (defaults to 600)
*/

use secview::cache::{FileCache, ScanJob};
use secview::cli::{CliArgs, Invocation};
use secview::config::Config;
use secview::constants::SCAN_TICK_MS;
use secview::errors::AppResult;
use secview::passphrase::PassphraseBuffer;
use secview::session::{SessionMachine, SessionState};
use secview::viewer::ConsoleSink;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// The main entry point for the secview application.
///
/// Initializes logging, loads configuration, and dispatches to the view,
/// encrypt, scan, or list flow based on the argument shape.
///
/// # Errors
///
/// Surfaces configuration errors, I/O errors, and the session error
/// taxonomy (workspace, helper, passphrase) from whichever flow runs.
fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting secview");
    debug!("CLI arguments: {:?}", args);

    let config = Config::load()?;
    config.validate()?;

    match args.invocation() {
        Invocation::View(path) => view(&config, &path),
        Invocation::Encrypt(path) => encrypt(&config, &path),
        Invocation::Scan => scan(&config),
        Invocation::List => list(&config),
    }
}

/// Decrypts `ciphertext`, keeps it displayed until the user presses Enter
/// or the session expires, then tears everything down.
fn view(config: &Config, ciphertext: &Path) -> AppResult<()> {
    let mut passphrases = PassphraseBuffer::new();
    let passphrase = passphrases.get_or_prompt()?.clone();

    let mut session = SessionMachine::new(
        config.temp_root.clone(),
        config.session_timeout_secs,
        Box::new(ConsoleSink::new()),
    );
    session.decrypt(ciphertext, &passphrase)?;

    if let Some(name) = session.displayed_name() {
        eprintln!("Displaying {} (press Enter to clear)", name);
    }

    // Stdin is read on its own thread so the expiry timer keeps ticking
    // while we wait.
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = sender.send(());
    });

    while session.state() == SessionState::Displayed {
        if receiver.recv_timeout(Duration::from_secs(1)).is_ok() {
            session.clear()?;
            break;
        }
        if session.tick()? {
            eprintln!("Session expired");
            break;
        }
        if let Some(remaining) = session.remaining_secs() {
            debug!("Session expires in {}s", remaining);
        }
    }

    info!("Session cleared");
    Ok(())
}

/// Encrypts `plaintext` in place and records the result in the cache.
fn encrypt(config: &Config, plaintext: &Path) -> AppResult<()> {
    let passphrase = PassphraseBuffer::prompt_confirmed()?;

    let mut session = SessionMachine::new(
        config.temp_root.clone(),
        config.session_timeout_secs,
        Box::new(ConsoleSink::new()),
    );
    session.encrypt(&config.helper_path, plaintext, &passphrase)?;
    drop(passphrase);

    // The helper replaces the plaintext with an encrypted sibling.
    let mut encrypted_name = plaintext.as_os_str().to_os_string();
    encrypted_name.push(secview::constants::ENCRYPTED_SUFFIX);
    let encrypted = std::path::PathBuf::from(encrypted_name);
    if encrypted.exists() {
        let mut cache = FileCache::load(config.cache_file());
        cache.observe(&encrypted);
        if let Err(e) = cache.save() {
            debug!("Cache save after encryption failed: {}", e);
        }
        println!("Encrypted: {}", encrypted.display());
    } else {
        println!("Encrypted {}", plaintext.display());
    }
    Ok(())
}

/// Walks the scan root one directory per tick, reporting progress.
fn scan(config: &Config) -> AppResult<()> {
    let mut cache = FileCache::load(config.cache_file());
    let mut job = ScanJob::new(&config.scan_root);

    eprintln!("Scanning {}...", config.scan_root.display());
    while job.step(&mut cache) {
        let (visited, queued) = job.progress();
        eprint!("\r  {} directories visited, {} queued   ", visited, queued);
        thread::sleep(Duration::from_millis(SCAN_TICK_MS));
    }
    eprintln!();
    // Cache persistence is best-effort; the in-memory results still stand.
    if let Err(e) = cache.save() {
        warn!("Failed to save discovery cache: {}", e);
    }

    println!("Found {} encrypted files", job.found());
    for path in cache.query(&config.scan_root) {
        println!("{}", path.display());
    }
    Ok(())
}

/// Prints what the cache currently knows under the scan root.
fn list(config: &Config) -> AppResult<()> {
    let cache = FileCache::load(config.cache_file());
    let hits = cache.query(&config.scan_root);
    if hits.is_empty() {
        println!("No encrypted files known; run with --scan to search");
        return Ok(());
    }
    for path in hits {
        println!("{}", path.display());
    }
    Ok(())
}
