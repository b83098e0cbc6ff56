//! # Sources Module
//!
//! Turns a place where creatives live into a batch of encoded images.
//!
//! Every collaborator (a local folder, a cloud drive mirror, an ad-platform
//! export) yields the same [`ImageInput`] shape, so hashing and matching
//! never care where the bytes came from.
//!
//! ## Supported Formats
//! - PNG (.png)
//! - JPEG (.jpg, .jpeg)
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//! - WebP (.webp)
//!
//! ## Example
//! ```rust,ignore
//! use creative_match::core::sources::{ImageSource, LocalFolderSource};
//!
//! let batch = LocalFolderSource::new("/creatives/summer").recursive(true).collect()?;
//! println!("{} images, {} skipped", batch.inputs.len(), batch.skipped.len());
//! ```

mod local;

pub use local::{FolderKind, LocalFolderSource};

use crate::core::normalizer::ImageFormat;
use crate::core::store::SourceMetadata;
use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};

/// One encoded image ready for fingerprinting
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Source-unique identifier
    pub identifier: String,
    /// Declared encoding of `bytes`
    pub format: ImageFormat,
    /// Encoded image data
    pub bytes: Vec<u8>,
    /// Metadata to carry onto the resulting record
    pub metadata: SourceMetadata,
}

/// An item that was passed over, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedImage {
    pub identifier: String,
    pub reason: String,
}

impl SkippedImage {
    pub fn new(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

/// Result of collecting a source
#[derive(Debug, Default)]
pub struct SourceBatch {
    /// Images ready to hash, in a stable order
    pub inputs: Vec<ImageInput>,
    /// Items that could not be read (non-fatal)
    pub skipped: Vec<SkippedImage>,
}

/// Something that can produce a batch of images.
///
/// Implement this for each place creatives are fetched from.
pub trait ImageSource: Send + Sync {
    /// Collect every image the source holds
    fn collect(&self) -> Result<SourceBatch, ScanError> {
        self.collect_with_events(&crate::events::null_sender())
    }

    /// Collect with progress reporting via events
    fn collect_with_events(&self, events: &EventSender) -> Result<SourceBatch, ScanError>;
}
