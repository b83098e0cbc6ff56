//! Folder collection using walkdir.

use super::{ImageInput, ImageSource, SkippedImage, SourceBatch};
use crate::core::normalizer::{ImageFormat, DEFAULT_MAX_INPUT_BYTES};
use crate::core::store::SourceMetadata;
use crate::error::{HashError, ScanError};
use crate::events::{Event, EventSender, ScanEvent};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What a folder on disk stands in for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderKind {
    /// A plain local creative folder
    #[default]
    Local,
    /// A synced copy of a cloud drive folder
    CloudMirror,
}

/// Reads every image file in a folder
#[derive(Debug, Clone)]
pub struct LocalFolderSource {
    root: PathBuf,
    recursive: bool,
    include_hidden: bool,
    kind: FolderKind,
    max_file_bytes: u64,
}

impl LocalFolderSource {
    /// Collect from `root`, top level only
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            include_hidden: false,
            kind: FolderKind::Local,
            max_file_bytes: DEFAULT_MAX_INPUT_BYTES as u64,
        }
    }

    /// Descend into subfolders
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Include files and folders whose names start with `.`
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Set what the folder stands in for
    pub fn kind(mut self, kind: FolderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Skip files larger than `limit` bytes without reading them
    pub fn max_file_bytes(mut self, limit: u64) -> Self {
        self.max_file_bytes = limit;
        self
    }

    fn is_hidden(&self, path: &Path) -> bool {
        path != self.root
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with('.'))
    }

    /// Identifier relative to the root, `/`-separated
    fn identifier(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn metadata(&self, identifier: &str, path: &Path, file_size: u64) -> SourceMetadata {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| identifier.to_string());

        match self.kind {
            FolderKind::Local => SourceMetadata::LocalFile {
                file_name,
                file_path: path.to_path_buf(),
                file_size,
            },
            FolderKind::CloudMirror => SourceMetadata::CloudFile {
                file_name,
                file_id: identifier.to_string(),
                file_size,
                web_link: None,
            },
        }
    }

    fn check_root(&self) -> Result<(), ScanError> {
        if !self.root.exists() {
            return Err(ScanError::DirectoryNotFound {
                path: self.root.clone(),
            });
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: self.root.clone(),
            });
        }
        fs::read_dir(&self.root).map_err(|source| ScanError::ReadDirectory {
            path: self.root.clone(),
            source,
        })?;
        Ok(())
    }
}

impl ImageSource for LocalFolderSource {
    fn collect_with_events(&self, events: &EventSender) -> Result<SourceBatch, ScanError> {
        self.check_root()?;

        events.send(Event::Scan(ScanEvent::Started {
            root: self.root.clone(),
        }));

        let mut batch = SourceBatch::default();
        let skip = |batch: &mut SourceBatch, path: &Path, identifier: String, reason: String| {
            warn!(path = %path.display(), %reason, "skipping file");
            events.send(Event::Scan(ScanEvent::Skipped {
                path: path.to_path_buf(),
                reason: reason.clone(),
            }));
            batch.skipped.push(SkippedImage::new(identifier, reason));
        };

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.include_hidden || !self.is_hidden(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let identifier = self.identifier(&path);
                    skip(&mut batch, &path, identifier, e.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let format = match ImageFormat::detect(path) {
                Ok(Some(format)) => format,
                Ok(None) => {
                    debug!(path = %path.display(), "ignoring non-image file");
                    continue;
                }
                Err(e) => {
                    skip(&mut batch, path, self.identifier(path), e.skip_reason());
                    continue;
                }
            };

            let identifier = self.identifier(path);
            let read_error = |source| HashError::Io {
                path: path.to_path_buf(),
                source,
            };

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    let reason = match e.into_io_error() {
                        Some(source) => read_error(source).skip_reason(),
                        None => "io_error: file metadata unavailable".to_string(),
                    };
                    skip(&mut batch, path, identifier, reason);
                    continue;
                }
            };
            if size > self.max_file_bytes {
                let error = HashError::InvalidImage {
                    reason: format!(
                        "file of {} bytes exceeds the {} byte limit",
                        size, self.max_file_bytes
                    ),
                };
                skip(&mut batch, path, identifier, error.skip_reason());
                continue;
            }

            match fs::read(path) {
                Ok(bytes) => {
                    let metadata = self.metadata(&identifier, path, bytes.len() as u64);
                    batch.inputs.push(ImageInput {
                        identifier,
                        format,
                        bytes,
                        metadata,
                    });
                }
                Err(e) => skip(&mut batch, path, identifier, read_error(e).skip_reason()),
            }
        }

        events.send(Event::Scan(ScanEvent::Completed {
            total_images: batch.inputs.len(),
            skipped: batch.skipped.len(),
        }));
        debug!(
            root = %self.root.display(),
            images = batch.inputs.len(),
            skipped = batch.skipped.len(),
            "folder collected"
        );

        Ok(batch)
    }
}
