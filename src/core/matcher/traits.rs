//! Candidate search strategies.

use crate::core::store::HashRecord;
use crate::events::{Event, EventSender, MatchEvent, MatchProgress};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A reference/candidate pair within the threshold, by position in the
/// slices handed to the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    /// Index into the reference slice
    pub reference: usize,
    /// Index into the candidate slice
    pub candidate: usize,
    /// Hamming distance between the two fingerprints
    pub distance: u32,
}

/// Strategy for finding every pair within a threshold.
///
/// Implementations must return exactly the pairs with
/// `distance <= threshold`, each once, in any order.
pub trait CandidateSearch: Send + Sync {
    /// Find all pairs within `threshold`
    fn search(
        &self,
        references: &[HashRecord],
        candidates: &[HashRecord],
        threshold: u32,
        events: &EventSender,
    ) -> Vec<MatchCandidate>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Reports search progress every few references
pub(crate) struct SearchProgress<'a> {
    events: &'a EventSender,
    total: usize,
    interval: usize,
    completed: AtomicUsize,
}

impl<'a> SearchProgress<'a> {
    pub(crate) fn new(events: &'a EventSender, total: usize) -> Self {
        Self {
            events,
            total,
            interval: (total / 50).clamp(1, 1000),
            completed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn tick(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.interval == 0 || done == self.total {
            self.events.send(Event::Match(MatchEvent::Progress(MatchProgress {
                references_searched: done,
                total_references: self.total,
            })));
        }
    }
}

/// Compare every reference against every candidate.
///
/// O(|R|·|C|), parallel over references.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPairsSearch;

impl CandidateSearch for AllPairsSearch {
    fn search(
        &self,
        references: &[HashRecord],
        candidates: &[HashRecord],
        threshold: u32,
        events: &EventSender,
    ) -> Vec<MatchCandidate> {
        let progress = SearchProgress::new(events, references.len());

        references
            .par_iter()
            .enumerate()
            .flat_map_iter(|(r, reference)| {
                let fingerprint = reference.fingerprint();
                let found: Vec<_> = candidates
                    .iter()
                    .enumerate()
                    .filter_map(|(c, candidate)| {
                        let distance = fingerprint.distance(&candidate.fingerprint());
                        (distance <= threshold).then_some(MatchCandidate {
                            reference: r,
                            candidate: c,
                            distance,
                        })
                    })
                    .collect();
                progress.tick();
                found
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "all-pairs"
    }
}
