use crate::cache::has_encrypted_suffix;
use crate::constants::APP_DESCRIPTION;
use clap::Parser;
use std::path::PathBuf;

/// Secure viewer core for helper-encrypted files
#[derive(Parser, Debug)]
#[clap(name = "secview", about = APP_DESCRIPTION)]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    /// File to open: a .senc file is decrypted and viewed, anything else is
    /// encrypted in place
    pub file: Option<PathBuf>,

    /// Re-scan the filesystem for encrypted files and refresh the cache
    #[clap(short = 's', long, conflicts_with = "file")]
    pub scan: bool,

    /// Print verbose output
    #[clap(short = 'v', long)]
    pub verbose: bool,
}

/// What the invocation asks for, resolved from the argument shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Decrypt and display an encrypted file.
    View(PathBuf),
    /// Encrypt a plaintext file in place.
    Encrypt(PathBuf),
    /// Walk the scan root and refresh the discovery cache.
    Scan,
    /// No argument: list what the cache knows.
    List,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Self {
        CliArgs::parse_from(std::env::args())
    }

    /// Resolves the requested operation.
    ///
    /// The encrypted suffix decides view vs encrypt; the check is
    /// case-insensitive to match discovery.
    pub fn invocation(&self) -> Invocation {
        if self.scan {
            return Invocation::Scan;
        }
        match &self.file {
            Some(path) if has_encrypted_suffix(path) => Invocation::View(path.clone()),
            Some(path) => Invocation::Encrypt(path.clone()),
            None => Invocation::List,
        }
    }
}
