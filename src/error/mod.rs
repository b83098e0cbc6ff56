//! # Error Module
//!
//! Error types for the creative matcher.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - identifiers, paths, what went wrong
//! - **Per-image failures are not fatal** - the pipeline records them as
//!   skipped entries and keeps going
//! - **Matching errors abort only that invocation**

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CreativeMatchError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Matching error: {0}")]
    Compare(#[from] CompareError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Invalid fingerprint: {0}")]
    Fingerprint(#[from] FingerprintParseError),
}

/// Errors that occur while walking a source for images
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while normalizing or hashing one image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to decode {format} image: {reason}")]
    DecodeError { format: String, reason: String },

    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("Unsupported hash dimensions: grid {grid}x{grid}, block {block}x{block}")]
    UnsupportedDimensions { grid: u32, block: u32 },

    #[error("Failed to read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Short machine-friendly reason used in skip reports
    pub fn kind(&self) -> &'static str {
        match self {
            HashError::UnsupportedFormat { .. } => "unsupported_format",
            HashError::DecodeError { .. } => "decode_error",
            HashError::InvalidImage { .. } => "invalid_image",
            HashError::UnsupportedDimensions { .. } => "unsupported_dimensions",
            HashError::Io { .. } => "io_error",
        }
    }

    /// `kind: message`, as recorded on skipped images
    pub fn skip_reason(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

/// Errors raised by the hash record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Identifier '{identifier}' already exists in the {source_tag} collection")]
    DuplicateIdentifier {
        identifier: String,
        source_tag: String,
    },

    #[error("Record '{identifier}' belongs to {found}, not to the {expected} collection")]
    SourceMismatch {
        identifier: String,
        expected: String,
        found: String,
    },

    #[error("Invalid metadata for '{identifier}': {reason}")]
    InvalidMetadata { identifier: String, reason: String },

    #[error("Failed to access hash file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize hash file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed CSV hash file at line {line}: {reason}")]
    Csv { line: usize, reason: String },
}

/// Errors that occur when setting up or running a matching invocation
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Invalid threshold: {value} (must be 0-64)")]
    InvalidThreshold { value: i64 },

    #[error("Cannot compare fingerprints from {reference} with fingerprints from {candidate}")]
    IncompatibleAlgorithm { reference: String, candidate: String },
}

/// Errors that occur while building or exporting a report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("No metadata found for record '{identifier}'")]
    MissingMetadata { identifier: String },

    #[error("Failed to write report: {0}")]
    Write(String),
}

/// Errors that occur when parsing a serialized fingerprint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintParseError {
    #[error("Expected 16 hex digits or 64 binary digits, got {length} characters")]
    InvalidLength { length: usize },

    #[error("Invalid digit '{digit}' at position {position}")]
    InvalidDigit { digit: char, position: usize },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CreativeMatchError>;
