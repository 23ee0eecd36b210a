//! Media kind classification and the viewer sink seam.
//!
//! The classifier is a pure function of the lowercase path suffix; it never
//! reads file contents. The `ViewerSink` trait is the boundary between the
//! session core and whatever renders the plaintext: the core calls `bind` and
//! `release` and trusts only the returned displayed/not-displayed result. The
//! core never imports UI types.

use crate::errors::AppResult;
use std::fmt;
use std::fs;
use std::path::Path;

/// Display kind assigned to a decrypted artifact.
///
/// Each variant corresponds to one renderer in the viewer shell. Anything the
/// suffix table does not recognise is `Text` and is loaded as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Raster images: png, jpg, jpeg, gif, bmp, webp.
    Image,
    /// Video containers: mp4, avi, mkv, mov, webm.
    Video,
    /// PDF documents.
    Pdf,
    /// Everything else, rendered as a character stream.
    Text,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Pdf => "pdf",
            MediaKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Classifies a path by its suffix, case-insensitively.
///
/// Depends only on the lowercase extension of `path`; the file need not
/// exist and its contents are never read.
///
/// # Examples
///
/// ```
/// use secview::viewer::{classify, MediaKind};
/// use std::path::Path;
///
/// assert_eq!(classify(Path::new("/tmp/a.JPG")), MediaKind::Image);
/// assert_eq!(classify(Path::new("/tmp/a.tar.gz")), MediaKind::Text);
/// assert_eq!(classify(Path::new("/tmp/a.Mp4")), MediaKind::Video);
/// ```
pub fn classify(path: &Path) -> MediaKind {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp") => MediaKind::Image,
        Some("mp4" | "avi" | "mkv" | "mov" | "webm") => MediaKind::Video,
        Some("pdf") => MediaKind::Pdf,
        _ => MediaKind::Text,
    }
}

/// The renderer boundary consumed by the session state machine.
///
/// Implementations receive `bind` strictly after helper success and strictly
/// before the expiry timer starts, and `release` strictly before the
/// workspace teardown begins, so they can drop file handles or stop media
/// pipelines while the files still exist.
///
/// # Examples
///
/// ```
/// use secview::viewer::{MediaKind, ViewerSink};
/// use secview::errors::AppResult;
/// use std::path::Path;
///
/// struct NullSink;
///
/// impl ViewerSink for NullSink {
///     fn bind(&mut self, _path: &Path, _kind: MediaKind) -> AppResult<bool> {
///         Ok(true)
///     }
///     fn release(&mut self) {}
/// }
/// ```
pub trait ViewerSink {
    /// Offers a plaintext artifact for display.
    ///
    /// Returns `Ok(true)` if the artifact is now displayed, `Ok(false)` if
    /// the sink cannot decode it. The artifact must be treated as read-only.
    fn bind(&mut self, path: &Path, kind: MediaKind) -> AppResult<bool>;

    /// Tells the sink the bound artifact is about to disappear.
    ///
    /// Called before any file in the workspace is overwritten or unlinked.
    /// Must be idempotent.
    fn release(&mut self);
}

/// A terminal-backed sink used by the thin shell.
///
/// Text artifacts are printed to stdout; other kinds are announced by path
/// and kind (a terminal cannot render them). Stands in for the stacked
/// widget of a graphical shell.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    bound: bool,
}

impl ConsoleSink {
    /// Creates a sink with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewerSink for ConsoleSink {
    fn bind(&mut self, path: &Path, kind: MediaKind) -> AppResult<bool> {
        match kind {
            MediaKind::Text => {
                let bytes = fs::read(path)?;
                println!("{}", String::from_utf8_lossy(&bytes));
            }
            other => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("[{} ready: {}]", other, name);
            }
        }
        self.bound = true;
        Ok(true)
    }

    fn release(&mut self) {
        if self.bound {
            println!("[content cleared]");
            self.bound = false;
        }
    }
}
