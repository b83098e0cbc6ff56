//! # Matcher Module
//!
//! Pairs reference creatives with candidate creatives by fingerprint distance.
//!
//! ## How It Works
//! 1. Find every (reference, candidate) pair within the threshold
//! 2. Sort the pairs by `(distance, reference id, candidate id)`
//! 3. Walk the sorted list, confirming a pair only when neither side is taken
//! 4. Whatever is left on either side is a residual
//!
//! The walk is a greedy approximation of minimum-weight bipartite matching.
//! It is not globally optimal, but it is deterministic, injective and
//! monotone in the threshold: raising `T` only appends pairs after the ones
//! already considered, so earlier confirmations are kept.
//!
//! ## Distance Classes
//! | Distance | Classification |
//! |----------|---------------|
//! | 0        | Exact         |
//! | 1-4      | Near-exact    |
//! | 5-10     | Similar       |
//! | 11+      | Loose         |

mod banded;
mod traits;

pub use banded::BandedIndexSearch;
pub use traits::{AllPairsSearch, CandidateSearch, MatchCandidate};

use crate::core::hasher::Fingerprint;
use crate::core::store::{HashRecord, RecordCollection};
use crate::error::CompareError;
use crate::events::{null_sender, Event, EventSender, MatchEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Default maximum Hamming distance for a match
pub const DEFAULT_THRESHOLD: u32 = 10;

/// Classification of a confirmed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    /// Distance 0, identical perceptual content
    Exact,
    /// Distance 1-4, re-encodes and light resizes
    NearExact,
    /// Distance 5-10, crops, overlays, color shifts
    Similar,
    /// Distance 11+, only reachable with a loose threshold
    Loose,
}

impl MatchQuality {
    /// Classify based on Hamming distance
    pub fn from_distance(distance: u32) -> Self {
        match distance {
            0 => MatchQuality::Exact,
            1..=4 => MatchQuality::NearExact,
            5..=10 => MatchQuality::Similar,
            _ => MatchQuality::Loose,
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchQuality::Exact => write!(f, "Exact"),
            MatchQuality::NearExact => write!(f, "Near-exact"),
            MatchQuality::Similar => write!(f, "Similar"),
            MatchQuality::Loose => write!(f, "Loose"),
        }
    }
}

/// Which candidate search to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Dense comparison of every pair
    #[default]
    AllPairs,
    /// Exact pigeonhole index over fingerprint bands
    Banded,
}

impl SearchStrategy {
    fn searcher(self) -> Box<dyn CandidateSearch> {
        match self {
            SearchStrategy::AllPairs => Box::new(AllPairsSearch),
            SearchStrategy::Banded => Box::new(BandedIndexSearch),
        }
    }
}

/// Validated matching parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    threshold: u32,
    strategy: SearchStrategy,
}

impl MatchConfig {
    /// Create a configuration with the default threshold and strategy
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strategy: SearchStrategy::default(),
        }
    }

    /// Set the threshold. Anything outside 0-64 is rejected.
    pub fn threshold(mut self, threshold: i64) -> Result<Self, CompareError> {
        self.threshold = u32::try_from(threshold)
            .ok()
            .filter(|t| *t <= Fingerprint::BITS)
            .ok_or(CompareError::InvalidThreshold { value: threshold })?;
        Ok(self)
    }

    /// Set the candidate search strategy
    pub fn strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The validated threshold
    pub fn threshold_value(&self) -> u32 {
        self.threshold
    }

    /// The configured search strategy
    pub fn search_strategy(&self) -> SearchStrategy {
        self.strategy
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A confirmed one-to-one pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedMatch {
    pub reference_id: String,
    pub candidate_id: String,
    pub distance: u32,
}

impl ConfirmedMatch {
    /// Classification of this match
    pub fn quality(&self) -> MatchQuality {
        MatchQuality::from_distance(self.distance)
    }

    /// Fraction of agreeing bits, 0-100
    pub fn similarity_percent(&self) -> f64 {
        (1.0 - self.distance as f64 / Fingerprint::BITS as f64) * 100.0
    }
}

/// Outcome of one matching run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAssignment {
    /// Confirmed pairs, in the order they were confirmed
    pub confirmed: Vec<ConfirmedMatch>,
    /// References with no confirmed partner, in input order
    pub unmatched_references: Vec<String>,
    /// Candidates with no confirmed partner, in input order
    pub unmatched_candidates: Vec<String>,
    /// The threshold the run used
    pub threshold: u32,
}

impl MatchAssignment {
    /// Candidate confirmed for `reference_id`, if any
    pub fn partner_of(&self, reference_id: &str) -> Option<&ConfirmedMatch> {
        self.confirmed.iter().find(|m| m.reference_id == reference_id)
    }
}

/// Runs candidate search and the greedy assignment
pub struct MatchingEngine {
    config: MatchConfig,
    search: Box<dyn CandidateSearch>,
}

impl MatchingEngine {
    /// Create an engine from a validated configuration
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            search: config.strategy.searcher(),
        }
    }

    /// Shorthand for an engine with `threshold` and the default strategy
    pub fn with_threshold(threshold: i64) -> Result<Self, CompareError> {
        Ok(Self::new(MatchConfig::new().threshold(threshold)?))
    }

    /// Swap in a custom candidate search
    pub fn with_search(mut self, search: Box<dyn CandidateSearch>) -> Self {
        self.search = search;
        self
    }

    /// The engine's configuration
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Match without progress events
    pub fn run(&self, references: &[HashRecord], candidates: &[HashRecord]) -> MatchAssignment {
        self.run_with_events(references, candidates, &null_sender())
    }

    /// Match two collections, refusing fingerprints from different algorithms
    pub fn run_collections(
        &self,
        references: &RecordCollection,
        candidates: &RecordCollection,
        events: &EventSender,
    ) -> Result<MatchAssignment, CompareError> {
        if references.algorithm() != candidates.algorithm() {
            return Err(CompareError::IncompatibleAlgorithm {
                reference: references.algorithm().to_string(),
                candidate: candidates.algorithm().to_string(),
            });
        }
        Ok(self.run_with_events(references.records(), candidates.records(), events))
    }

    /// Match with progress events
    pub fn run_with_events(
        &self,
        references: &[HashRecord],
        candidates: &[HashRecord],
        events: &EventSender,
    ) -> MatchAssignment {
        let threshold = self.config.threshold;

        events.send(Event::Match(MatchEvent::Started {
            references: references.len(),
            candidates: candidates.len(),
            threshold,
        }));
        debug!(
            references = references.len(),
            candidates = candidates.len(),
            threshold,
            search = self.search.name(),
            "matching started"
        );

        let mut pairs: Vec<MatchCandidate> = self
            .search
            .search(references, candidates, threshold, events)
            .into_iter()
            .filter(|m| m.distance <= threshold)
            .collect();

        events.send(Event::Match(MatchEvent::CandidatesFound { pairs: pairs.len() }));

        // Positions break ties between repeated identifiers so the order is total.
        pairs.sort_unstable_by(|a, b| {
            let reference_id = |m: &MatchCandidate| references[m.reference].identifier();
            let candidate_id = |m: &MatchCandidate| candidates[m.candidate].identifier();
            a.distance
                .cmp(&b.distance)
                .then_with(|| reference_id(a).cmp(reference_id(b)))
                .then_with(|| candidate_id(a).cmp(candidate_id(b)))
                .then_with(|| a.reference.cmp(&b.reference))
                .then_with(|| a.candidate.cmp(&b.candidate))
        });

        let mut reference_taken = vec![false; references.len()];
        let mut candidate_taken = vec![false; candidates.len()];
        let mut confirmed = Vec::new();

        for pair in pairs {
            if reference_taken[pair.reference] || candidate_taken[pair.candidate] {
                continue;
            }
            reference_taken[pair.reference] = true;
            candidate_taken[pair.candidate] = true;
            confirmed.push(ConfirmedMatch {
                reference_id: references[pair.reference].identifier().to_string(),
                candidate_id: candidates[pair.candidate].identifier().to_string(),
                distance: pair.distance,
            });
        }

        let residual = |records: &[HashRecord], taken: &[bool]| -> Vec<String> {
            records
                .iter()
                .zip(taken)
                .filter(|(_, &used)| !used)
                .map(|(record, _)| record.identifier().to_string())
                .collect()
        };

        let assignment = MatchAssignment {
            unmatched_references: residual(references, &reference_taken),
            unmatched_candidates: residual(candidates, &candidate_taken),
            confirmed,
            threshold,
        };

        events.send(Event::Match(MatchEvent::Completed {
            matched: assignment.confirmed.len(),
            unmatched_references: assignment.unmatched_references.len(),
            unmatched_candidates: assignment.unmatched_candidates.len(),
        }));
        info!(
            matched = assignment.confirmed.len(),
            unmatched_references = assignment.unmatched_references.len(),
            unmatched_candidates = assignment.unmatched_candidates.len(),
            "matching completed"
        );

        assignment
    }
}
