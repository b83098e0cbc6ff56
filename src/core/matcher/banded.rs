//! # Banded Index Search
//!
//! Finds every pair within threshold `T` without comparing all pairs.
//!
//! ## How It Works
//! 1. Split the 64 fingerprint bits into `T + 1` contiguous bands
//! 2. Bucket every candidate by each of its band values
//! 3. For each reference, gather the candidates sharing any band exactly
//! 4. Verify each gathered candidate by true Hamming distance
//!
//! Two fingerprints within distance `T` differ in at most `T` bits, so at
//! least one of the `T + 1` bands is identical. The search is exact, not
//! probabilistic. Small thresholds give wide, selective bands; as `T`
//! approaches 64 the bands shrink to single bits and every bucket holds
//! half the candidates, so from `T = 63` the all-pairs scan is used instead.

use super::traits::{AllPairsSearch, CandidateSearch, MatchCandidate, SearchProgress};
use crate::core::hasher::Fingerprint;
use crate::core::store::HashRecord;
use crate::events::EventSender;
use rayon::prelude::*;
use std::collections::HashMap;

/// Thresholds from here on gain nothing from banding
const ALL_PAIRS_FROM: u32 = 63;

/// A contiguous run of fingerprint bits
#[derive(Debug, Clone, Copy)]
struct Band {
    shift: u32,
    mask: u64,
}

impl Band {
    fn value(&self, fingerprint: Fingerprint) -> u64 {
        (fingerprint.as_u64() >> self.shift) & self.mask
    }
}

/// Split 64 bits into `count` bands whose widths differ by at most one
fn bands(count: u32) -> Vec<Band> {
    let count = count.clamp(1, Fingerprint::BITS);
    (0..count)
        .map(|k| {
            let start = k * Fingerprint::BITS / count;
            let end = (k + 1) * Fingerprint::BITS / count;
            let width = end - start;
            let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
            Band { shift: start, mask }
        })
        .collect()
}

/// Candidate positions bucketed per band
struct BandIndex {
    bands: Vec<Band>,
    tables: Vec<HashMap<u64, Vec<usize>>>,
}

impl BandIndex {
    fn build(bands: Vec<Band>, candidates: &[HashRecord]) -> Self {
        let mut tables: Vec<HashMap<u64, Vec<usize>>> = vec![HashMap::new(); bands.len()];
        for (position, candidate) in candidates.iter().enumerate() {
            for (band, table) in bands.iter().zip(tables.iter_mut()) {
                table
                    .entry(band.value(candidate.fingerprint()))
                    .or_default()
                    .push(position);
            }
        }
        Self { bands, tables }
    }

    /// Candidate positions sharing at least one band with `fingerprint`,
    /// ascending and without repeats
    fn lookup(&self, fingerprint: Fingerprint) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .bands
            .iter()
            .zip(&self.tables)
            .filter_map(|(band, table)| table.get(&band.value(fingerprint)))
            .flatten()
            .copied()
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

/// Exact banded index over the candidate set
#[derive(Debug, Clone, Copy, Default)]
pub struct BandedIndexSearch;

impl CandidateSearch for BandedIndexSearch {
    fn search(
        &self,
        references: &[HashRecord],
        candidates: &[HashRecord],
        threshold: u32,
        events: &EventSender,
    ) -> Vec<MatchCandidate> {
        if threshold >= ALL_PAIRS_FROM {
            return AllPairsSearch.search(references, candidates, threshold, events);
        }

        let index = BandIndex::build(bands(threshold + 1), candidates);
        let progress = SearchProgress::new(events, references.len());

        references
            .par_iter()
            .enumerate()
            .flat_map_iter(|(r, reference)| {
                let fingerprint = reference.fingerprint();
                let found: Vec<_> = index
                    .lookup(fingerprint)
                    .into_iter()
                    .filter_map(|c| {
                        let distance = fingerprint.distance(&candidates[c].fingerprint());
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
        "banded"
    }
}
