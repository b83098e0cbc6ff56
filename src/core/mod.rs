//! # Core Module
//!
//! The matching engine, free of any front end.
//!
//! ## Modules
//! - `sources` - Reads encoded images from where creatives live
//! - `normalizer` - Decodes images into fixed-size grayscale grids
//! - `hasher` - Computes 64-bit perceptual fingerprints
//! - `store` - Holds fingerprinted records per source
//! - `pipeline` - Fingerprints whole batches in parallel
//! - `matcher` - Pairs references with candidates one-to-one
//! - `report` - Builds and exports match reports

pub mod hasher;
pub mod matcher;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod store;

// Re-export commonly used types
pub use hasher::Fingerprint;
pub use matcher::{MatchAssignment, MatchingEngine};
pub use report::{MatchReport, ReportBuilder};
pub use store::{HashRecord, RecordCollection, SourceTag};
