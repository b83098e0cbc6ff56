//! # Creative Match
//!
//! Finds the same ad creative across the places it lives: a local design
//! folder, a cloud drive, and the ad platforms it was uploaded to.
//!
//! ## How It Works
//! Every image is reduced to a 64-bit perceptual fingerprint that survives
//! re-encoding, resizing and light edits. Fingerprints from two sources are
//! then paired one-to-one by Hamming distance, and whatever stays unpaired
//! is reported (local "ghost" files that never made it to a platform, or
//! platform creatives with no source file).
//!
//! ## Architecture
//! - `core` - Normalizing, hashing, storing, matching and reporting
//! - `events` - Channel-based progress reporting
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CreativeMatchError, Result};

/// Initialize tracing for the library.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"`)
/// is used. Calling this twice keeps the first subscriber.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
