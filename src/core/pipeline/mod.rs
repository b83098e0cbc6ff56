//! # Pipeline Module
//!
//! Turns sources into record collections.
//!
//! ## Pipeline Stages
//! 1. **Collect** - Read encoded images from a source
//! 2. **Hash** - Fingerprint every image, skipping the ones that fail
//! 3. **Store** - Insert records in input order under the duplicate policy
//!
//! Matching and reporting run on the collections afterwards, usually from
//! hash files written by separate runs.
//!
//! ## Parallelism
//! Uses rayon for parallel hashing across multiple CPU cores.

mod executor;

pub use executor::{BatchResult, DuplicatePolicy, Pipeline, PipelineBuilder};
