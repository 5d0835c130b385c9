//! Delivery of finished exports: downloads, clipboard, and the latch that
//! keeps two exports from running at once.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;
use log::info;

use crate::error::{Action, ClipboardError};
use crate::settings::ExportFormat;

// ============================================================================
// ExportedFile
// ============================================================================

/// An encoded export, ready to hand to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format.file_name(),
            format,
            bytes,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

// ============================================================================
// Downloads
// ============================================================================

/// Receives finished exports.
pub trait DownloadSink {
    fn deliver(&mut self, file: &ExportedFile) -> io::Result<()>;
}

/// Collects exports in memory.
impl DownloadSink for Vec<ExportedFile> {
    fn deliver(&mut self, file: &ExportedFile) -> io::Result<()> {
        self.push(file.clone());
        Ok(())
    }
}

/// Writes exports to disk.
#[derive(Debug, Clone)]
pub enum FileDownload {
    /// Writes `<dir>/<file name>` using the export's own file name.
    Directory(PathBuf),
    /// Writes to exactly this path.
    File(PathBuf),
}

impl FileDownload {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::Directory(dir.into())
    }

    pub fn to_path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Where `file` would be written.
    pub fn target(&self, file: &ExportedFile) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.join(&file.file_name),
            Self::File(path) => path.clone(),
        }
    }
}

impl DownloadSink for FileDownload {
    fn deliver(&mut self, file: &ExportedFile) -> io::Result<()> {
        let target = self.target(file);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_atomically(&target, &file.bytes)?;
        info!("wrote {} ({} bytes)", target.display(), file.bytes.len());
        Ok(())
    }
}

/// Writes through a sibling temp file so a failed write leaves nothing behind.
fn write_atomically(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);
    if let Err(err) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, target)) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// Clipboard
// ============================================================================

/// A rendered frame as placed on the clipboard: raw pixels plus the encoded
/// file, so receivers can pick either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub pixels: RgbaImage,
    pub format: ExportFormat,
    pub encoded: Vec<u8>,
}

impl ClipboardImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Receives images for the clipboard.
pub trait ClipboardSink {
    fn write_image(&mut self, item: &ClipboardImage) -> Result<(), ClipboardError>;
}

/// The operating system clipboard.
#[cfg(feature = "clipboard")]
#[derive(Debug, Default)]
pub struct SystemClipboard;

#[cfg(feature = "clipboard")]
impl ClipboardSink for SystemClipboard {
    fn write_image(&mut self, item: &ClipboardImage) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        let data = arboard::ImageData {
            width: item.pixels.width() as usize,
            height: item.pixels.height() as usize,
            bytes: std::borrow::Cow::Borrowed(item.pixels.as_raw()),
        };
        clipboard
            .set_image(data)
            .map_err(|err| ClipboardError::WriteFailed(err.to_string()))
    }
}

/// Which export formats may be copied to the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPolicy {
    allowed: Vec<ExportFormat>,
}

impl Default for ClipboardPolicy {
    /// Copying is offered for PNG only.
    fn default() -> Self {
        Self {
            allowed: vec![ExportFormat::Png],
        }
    }
}

impl ClipboardPolicy {
    pub fn new(allowed: impl IntoIterator<Item = ExportFormat>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn allow_all() -> Self {
        Self::new([ExportFormat::Png, ExportFormat::Jpg, ExportFormat::Webp])
    }

    pub fn allows(&self, format: ExportFormat) -> bool {
        self.allowed.contains(&format)
    }

    /// Returns an error if copying `format` is not offered.
    pub fn check(&self, format: ExportFormat) -> Result<(), ClipboardError> {
        if self.allows(format) {
            Ok(())
        } else {
            Err(ClipboardError::FormatNotAllowed(format))
        }
    }
}

// ============================================================================
// ActionLatch
// ============================================================================

/// An in-progress flag for one kind of action.
///
/// Clones share the flag. [`try_acquire`](Self::try_acquire) sets it and
/// returns a guard that clears it on drop.
#[derive(Debug, Clone)]
pub struct ActionLatch {
    action: Action,
    busy: Arc<AtomicBool>,
}

impl ActionLatch {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Takes the latch, or returns `None` if it is already held.
    pub fn try_acquire(&self) -> Option<LatchGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LatchGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Holds an [`ActionLatch`] until dropped.
#[derive(Debug)]
pub struct LatchGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
