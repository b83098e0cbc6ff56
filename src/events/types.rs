//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while fingerprinting and matching creatives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Source collection events
    Scan(ScanEvent),
    /// Hashing phase events
    Hash(HashEvent),
    /// Matching phase events
    Match(MatchEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events while collecting images from a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Collection has started
    Started { root: PathBuf },
    /// An unreadable or unsupported file was passed over
    Skipped { path: PathBuf, reason: String },
    /// Collection completed
    Completed { total_images: usize, skipped: usize },
}

/// Events during the hashing phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started { total_images: usize },
    /// Progress update during hashing
    Progress(HashProgress),
    /// An image could not be fingerprinted; the batch continues
    Skipped { identifier: String, reason: String },
    /// Hashing completed
    Completed { total_hashed: usize, skipped: usize },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of images processed so far
    pub completed: usize,
    /// Total number of images to hash
    pub total: usize,
    /// Identifier of the image just processed
    pub current: String,
}

/// Events during the matching phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Matching has started
    Started {
        references: usize,
        candidates: usize,
        threshold: u32,
    },
    /// Progress update during candidate search
    Progress(MatchProgress),
    /// Candidate search finished; the assignment walk follows
    CandidatesFound { pairs: usize },
    /// Matching completed
    Completed {
        matched: usize,
        unmatched_references: usize,
        unmatched_candidates: usize,
    },
}

/// Progress information during candidate search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchProgress {
    /// References searched so far
    pub references_searched: usize,
    /// Total number of references
    pub total_references: usize,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed
    Completed {
        processed: usize,
        skipped: usize,
        duration_ms: u64,
    },
}

/// Phases of a fingerprinting run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Collecting,
    Hashing,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Collecting => write!(f, "Collecting"),
            PipelinePhase::Hashing => write!(f, "Hashing"),
        }
    }
}
