//! Secure per-session workspaces.
//!
//! A workspace is an exclusively-owned private directory under the system
//! temp location. The ciphertext is copied into it so the helper only ever
//! operates on disposable bytes, and the plaintext the helper produces never
//! leaves it. On teardown every regular file is overwritten with zeros before
//! being unlinked, then the directory is removed.
//!
//! The overwrite pass is the core's only local protection. It is a defence
//! against casual recovery, not against journalled filesystems, swap, or
//! hardware-level attacks.

use crate::constants::{
    FRESHNESS_WINDOW_SECS, SHRED_CHUNK_BYTES, WORKSPACE_CHARSET, WORKSPACE_PREFIX,
    WORKSPACE_RANDOM_LEN,
};
use crate::errors::{AppResult, WorkspaceError};
use rand::rngs::OsRng;
use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Role of a file inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The disposable copy of the user's encrypted file.
    CiphertextCopy,
    /// A plaintext file the helper produced.
    PlaintextCandidate,
}

/// A file owned by a workspace.
///
/// Artifacts are never referenced by any path outside their workspace; they
/// cease to exist when the workspace is destroyed.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Absolute path inside the owning workspace.
    pub path: PathBuf,
    /// Role of the file.
    pub kind: ArtifactKind,
    /// Size at registration time.
    pub size_bytes: u64,
}

/// An exclusively-owned private directory holding one session's files.
///
/// Created with owner-only permissions; destroyed synchronously on session
/// end and, as a last resort, on drop, so plaintext cannot outlive the
/// process even on panic unwinds.
///
/// # Examples
///
/// ```no_run
/// use secview::workspace::Workspace;
///
/// let mut workspace = Workspace::create(&std::env::temp_dir())?;
/// let artifact = workspace.install(std::path::Path::new("/files/photo.senc"))?;
/// // ... run the helper inside workspace.path() ...
/// workspace.destroy()?;
/// # Ok::<(), secview::AppError>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    created_at: SystemTime,
    artifacts: Vec<Artifact>,
    destroyed: bool,
}

impl Workspace {
    /// Creates a fresh private directory under `temp_root`.
    ///
    /// The directory name is `secview_` followed by 12 characters drawn
    /// uniformly from `[a-z0-9]` using the operating system's cryptographic
    /// random source. Permissions are owner-only (0o700) from the moment of
    /// creation; no second attempt is made if that fails.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::Creation` if the directory cannot be created
    /// with the required permissions.
    pub fn create(temp_root: &Path) -> AppResult<Self> {
        let path = temp_root.join(random_name());

        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(crate::constants::WORKSPACE_PERMISSIONS);
        builder.create(&path).map_err(|e| WorkspaceError::Creation {
            path: path.clone(),
            source: e,
        })?;

        debug!("Created session workspace");
        Ok(Workspace {
            path,
            created_at: SystemTime::now(),
            artifacts: Vec::new(),
            destroyed: false,
        })
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the workspace was created.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Whether `destroy` has already completed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Copies `source` into the workspace, preserving the filename.
    ///
    /// The copy gets owner-only permissions reapplied; for decryption the
    /// copy is itself the helper executable, so it needs the execute bit.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::Install` if the copy or the permission change
    /// fails.
    pub fn install(&mut self, source: &Path) -> AppResult<Artifact> {
        let file_name = source.file_name().ok_or_else(|| WorkspaceError::Install {
            path: source.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no filename"),
        })?;
        let dest = self.path.join(file_name);

        let size_bytes = fs::copy(source, &dest).map_err(|e| WorkspaceError::Install {
            path: source.to_path_buf(),
            source: e,
        })?;

        #[cfg(unix)]
        fs::set_permissions(
            &dest,
            fs::Permissions::from_mode(crate::constants::WORKSPACE_PERMISSIONS),
        )
        .map_err(|e| WorkspaceError::Install {
            path: dest.clone(),
            source: e,
        })?;

        let artifact = Artifact {
            path: dest,
            kind: ArtifactKind::CiphertextCopy,
            size_bytes,
        };
        self.artifacts.push(artifact.clone());
        Ok(artifact)
    }

    /// Records a helper-produced plaintext file as an owned artifact.
    pub fn register_candidate(&mut self, path: &Path) -> AppResult<Artifact> {
        let size_bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let artifact = Artifact {
            path: path.to_path_buf(),
            kind: ArtifactKind::PlaintextCandidate,
            size_bytes,
        };
        self.artifacts.push(artifact.clone());
        Ok(artifact)
    }

    /// Enumerates regular files written within `since_secs` of now, skipping
    /// installed ciphertext copies.
    ///
    /// The helper chooses the plaintext filename itself, so discovery goes by
    /// write time rather than trusting filename conventions.
    pub fn list_fresh(&self, since_secs: u64) -> AppResult<Vec<PathBuf>> {
        let now = SystemTime::now();
        let mut fresh = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let path = entry.path();
            if self.is_ciphertext_copy(&path) {
                continue;
            }
            let modified = metadata.modified()?;
            // A write time in the future still counts as fresh.
            let age = now.duration_since(modified).unwrap_or_default();
            if age.as_secs() <= since_secs {
                fresh.push(path);
            }
        }

        fresh.sort();
        Ok(fresh)
    }

    /// Enumerates fresh files using the default freshness window.
    pub fn list_fresh_default(&self) -> AppResult<Vec<PathBuf>> {
        self.list_fresh(FRESHNESS_WINDOW_SECS)
    }

    /// Overwrites every regular file with zeros, unlinks it, then removes
    /// the directory tree.
    ///
    /// Idempotent: a second call (or a call after the directory has already
    /// vanished) succeeds silently. Individual overwrite failures do not
    /// abort the pass; the first failure is reported after the full teardown
    /// has run.
    pub fn destroy(&mut self) -> AppResult<()> {
        if self.destroyed {
            return Ok(());
        }

        let mut first_failure: Option<String> = None;

        match fs::read_dir(&self.path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let is_file = entry.metadata().map(|m| m.is_file()).unwrap_or(false);
                    if !is_file {
                        continue;
                    }
                    if let Err(e) = shred_file(&path) {
                        warn!("Failed to shred a workspace file: {}", e);
                        first_failure.get_or_insert_with(|| e.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Already gone; nothing to shred.
            }
            Err(e) => {
                first_failure.get_or_insert_with(|| e.to_string());
            }
        }

        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                first_failure.get_or_insert_with(|| e.to_string());
            }
        }

        self.destroyed = true;
        self.artifacts.clear();
        debug!("Destroyed session workspace");

        match first_failure {
            None => Ok(()),
            Some(detail) => Err(WorkspaceError::Teardown {
                path: self.path.clone(),
                detail,
            }
            .into()),
        }
    }

    fn is_ciphertext_copy(&self, path: &Path) -> bool {
        self.artifacts
            .iter()
            .any(|a| a.kind == ArtifactKind::CiphertextCopy && a.path == *path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.destroyed {
            if let Err(e) = self.destroy() {
                warn!("Workspace teardown during drop reported: {}", e);
            }
        }
    }
}

/// Generates a `secview_` name with a random `[a-z0-9]` suffix.
fn random_name() -> String {
    let mut name = String::with_capacity(WORKSPACE_PREFIX.len() + WORKSPACE_RANDOM_LEN);
    name.push_str(WORKSPACE_PREFIX);
    for _ in 0..WORKSPACE_RANDOM_LEN {
        let index = OsRng.gen_range(0..WORKSPACE_CHARSET.len());
        name.push(WORKSPACE_CHARSET[index] as char);
    }
    name
}

/// Overwrites the file's full byte length with zeros in 4 KiB chunks, then
/// unlinks it. Missing files are not an error.
fn shred_file(path: &Path) -> std::io::Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut remaining = metadata.len();
    let zeros = [0u8; SHRED_CHUNK_BYTES];

    {
        let mut file = OpenOptions::new().write(true).open(path)?;
        while remaining > 0 {
            let chunk = remaining.min(SHRED_CHUNK_BYTES as u64) as usize;
            file.write_all(&zeros[..chunk])?;
            remaining -= chunk as u64;
        }
        file.flush()?;
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
