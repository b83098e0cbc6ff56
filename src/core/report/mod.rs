//! # Report Module
//!
//! Turns a match assignment into rows a person can act on.
//!
//! Each confirmed pair becomes a `Matched` row, each reference residual an
//! `UnmatchedReference` row (a "ghost" creative with no platform
//! counterpart) and each candidate residual an `UnmatchedCandidate` row.
//! Rows carry the metadata of the records involved so the report stands on
//! its own.
//!
//! An identifier with no record behind it costs only its own row: the error
//! is collected in [`MatchReport::errors`] and every other row is built.

mod export;

pub use export::{export_csv, export_json, export_to_file, ReportFormat};

use crate::core::hasher::Fingerprint;
use crate::core::matcher::{MatchAssignment, MatchQuality};
use crate::core::store::{HashRecord, RecordCollection, SourceTag};
use crate::error::ReportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Outcome class of a report row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Matched,
    UnmatchedReference,
    UnmatchedCandidate,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Matched => write!(f, "matched"),
            RowStatus::UnmatchedReference => write!(f, "unmatched_reference"),
            RowStatus::UnmatchedCandidate => write!(f, "unmatched_candidate"),
        }
    }
}

/// Flattened view of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub identifier: String,
    pub source: SourceTag,
    pub name: String,
    pub location: Option<String>,
    pub file_size: Option<u64>,
    pub fingerprint: Fingerprint,
}

impl From<&HashRecord> for RecordSummary {
    fn from(record: &HashRecord) -> Self {
        let metadata = record.metadata();
        Self {
            identifier: record.identifier().to_string(),
            source: record.source(),
            name: metadata.display_name().to_string(),
            location: metadata.location(),
            file_size: metadata.file_size(),
            fingerprint: record.fingerprint(),
        }
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub status: RowStatus,
    pub reference: Option<RecordSummary>,
    pub candidate: Option<RecordSummary>,
    pub distance: Option<u32>,
    pub quality: Option<MatchQuality>,
}

/// Counts for a run, available even when some inputs or rows failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records that took part in matching
    pub processed: usize,
    /// Inputs that never became records
    pub skipped: usize,
    pub references: usize,
    pub candidates: usize,
    pub matched: usize,
    pub unmatched_references: usize,
    pub unmatched_candidates: usize,
    pub threshold: u32,
}

impl RunSummary {
    /// Summarize an assignment over `references` and `candidates` records
    pub fn new(assignment: &MatchAssignment, references: usize, candidates: usize) -> Self {
        Self {
            processed: references + candidates,
            skipped: 0,
            references,
            candidates,
            matched: assignment.confirmed.len(),
            unmatched_references: assignment.unmatched_references.len(),
            unmatched_candidates: assignment.unmatched_candidates.len(),
            threshold: assignment.threshold,
        }
    }

    /// Add inputs that were skipped before matching
    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }
}

/// A complete match report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Unique identifier for this report
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub rows: Vec<ReportRow>,
    /// Rows that could not be built, exported as their messages
    #[serde(serialize_with = "error_messages", skip_deserializing)]
    pub errors: Vec<ReportError>,
}

fn error_messages<S: Serializer>(
    errors: &[ReportError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

impl MatchReport {
    /// Rows with the given status
    pub fn rows_with_status(&self, status: RowStatus) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |row| row.status == status)
    }

    /// Reference creatives with no counterpart
    pub fn ghosts(&self) -> impl Iterator<Item = &RecordSummary> {
        self.rows_with_status(RowStatus::UnmatchedReference)
            .filter_map(|row| row.reference.as_ref())
    }
}

/// Builds a [`MatchReport`] from an assignment and the records behind it
pub struct ReportBuilder<'a> {
    references: HashMap<&'a str, &'a HashRecord>,
    candidates: HashMap<&'a str, &'a HashRecord>,
    reference_count: usize,
    candidate_count: usize,
    skipped: usize,
}

impl<'a> ReportBuilder<'a> {
    /// Look up metadata in `references` and `candidates`
    pub fn new(references: &'a [HashRecord], candidates: &'a [HashRecord]) -> Self {
        let index = |records: &'a [HashRecord]| {
            records
                .iter()
                .map(|record| (record.identifier(), record))
                .collect::<HashMap<_, _>>()
        };

        Self {
            references: index(references),
            candidates: index(candidates),
            reference_count: references.len(),
            candidate_count: candidates.len(),
            skipped: 0,
        }
    }

    /// Look up metadata in two collections, counting the images either
    /// side skipped while it was fingerprinted
    pub fn from_collections(
        references: &'a RecordCollection,
        candidates: &'a RecordCollection,
    ) -> Self {
        Self::new(references.records(), candidates.records())
            .skipped(references.skipped().len() + candidates.skipped().len())
    }

    /// Count inputs skipped before matching in the summary
    pub fn skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    fn lookup(
        records: &HashMap<&'a str, &'a HashRecord>,
        identifier: &str,
    ) -> Result<RecordSummary, ReportError> {
        records
            .get(identifier)
            .map(|record| RecordSummary::from(*record))
            .ok_or_else(|| ReportError::MissingMetadata {
                identifier: identifier.to_string(),
            })
    }

    /// Build the report
    pub fn build(&self, assignment: &MatchAssignment) -> MatchReport {
        let mut rows = Vec::with_capacity(
            assignment.confirmed.len()
                + assignment.unmatched_references.len()
                + assignment.unmatched_candidates.len(),
        );
        let mut errors = Vec::new();

        for confirmed in &assignment.confirmed {
            let reference = Self::lookup(&self.references, &confirmed.reference_id);
            let candidate = Self::lookup(&self.candidates, &confirmed.candidate_id);
            match (reference, candidate) {
                (Ok(reference), Ok(candidate)) => rows.push(ReportRow {
                    status: RowStatus::Matched,
                    reference: Some(reference),
                    candidate: Some(candidate),
                    distance: Some(confirmed.distance),
                    quality: Some(confirmed.quality()),
                }),
                (reference, candidate) => {
                    errors.extend(reference.err());
                    errors.extend(candidate.err());
                }
            }
        }

        for identifier in &assignment.unmatched_references {
            match Self::lookup(&self.references, identifier) {
                Ok(reference) => rows.push(ReportRow {
                    status: RowStatus::UnmatchedReference,
                    reference: Some(reference),
                    candidate: None,
                    distance: None,
                    quality: None,
                }),
                Err(e) => errors.push(e),
            }
        }

        for identifier in &assignment.unmatched_candidates {
            match Self::lookup(&self.candidates, identifier) {
                Ok(candidate) => rows.push(ReportRow {
                    status: RowStatus::UnmatchedCandidate,
                    reference: None,
                    candidate: Some(candidate),
                    distance: None,
                    quality: None,
                }),
                Err(e) => errors.push(e),
            }
        }

        for error in &errors {
            warn!(%error, "report row omitted");
        }

        MatchReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary: RunSummary::new(assignment, self.reference_count, self.candidate_count)
                .with_skipped(self.skipped),
            rows,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matcher::ConfirmedMatch;
    use crate::core::store::{AdPlatform, SourceMetadata};
    use std::path::PathBuf;

    fn local(id: &str) -> HashRecord {
        HashRecord::new(
            id,
            Fingerprint::from_u64(0),
            SourceMetadata::LocalFile {
                file_name: id.to_string(),
                file_path: PathBuf::from(format!("/creatives/{}", id)),
                file_size: 4523,
            },
        )
        .unwrap()
    }

    fn meta(id: &str) -> HashRecord {
        HashRecord::new(
            id,
            Fingerprint::from_u64(7),
            SourceMetadata::PlatformCreative {
                platform: AdPlatform::Meta,
                creative_name: format!("Creative {}", id),
                thumbnail_url: Some(format!("https://example.com/{}.jpg", id)),
                asset_name: None,
                image_origin: None,
            },
        )
        .unwrap()
    }

    fn assignment() -> MatchAssignment {
        MatchAssignment {
            confirmed: vec![
                ConfirmedMatch {
                    reference_id: "a.png".to_string(),
                    candidate_id: "p".to_string(),
                    distance: 0,
                },
                ConfirmedMatch {
                    reference_id: "b.png".to_string(),
                    candidate_id: "q".to_string(),
                    distance: 3,
                },
            ],
            unmatched_references: vec!["c.png".to_string()],
            unmatched_candidates: vec!["r".to_string()],
            threshold: 10,
        }
    }

    #[test]
    fn rows_follow_matched_then_residual_order() {
        let refs = [local("a.png"), local("b.png"), local("c.png")];
        let cands = [meta("p"), meta("q"), meta("r")];

        let report = ReportBuilder::new(&refs, &cands).build(&assignment());

        let statuses: Vec<_> = report.rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                RowStatus::Matched,
                RowStatus::Matched,
                RowStatus::UnmatchedReference,
                RowStatus::UnmatchedCandidate
            ]
        );
        assert!(report.errors.is_empty());

        let second = &report.rows[1];
        assert_eq!(second.distance, Some(3));
        assert_eq!(second.quality, Some(MatchQuality::NearExact));
        let candidate = second.candidate.as_ref().unwrap();
        assert_eq!(candidate.name, "Creative q");
        assert_eq!(candidate.location.as_deref(), Some("https://example.com/q.jpg"));
        assert_eq!(candidate.source, SourceTag::Platform(AdPlatform::Meta));
    }

    #[test]
    fn ghosts_are_unmatched_references() {
        let refs = [local("a.png"), local("b.png"), local("c.png")];
        let cands = [meta("p"), meta("q"), meta("r")];

        let report = ReportBuilder::new(&refs, &cands).build(&assignment());
        let ghosts: Vec<_> = report.ghosts().map(|g| g.identifier.as_str()).collect();
        assert_eq!(ghosts, ["c.png"]);
    }

    #[test]
    fn missing_metadata_omits_only_that_row() {
        // "b.png" and "r" have no records.
        let refs = [local("a.png"), local("c.png")];
        let cands = [meta("p"), meta("q")];

        let report = ReportBuilder::new(&refs, &cands).build(&assignment());

        assert_eq!(report.rows.len(), 2);
        assert_eq!(
            report.errors,
            vec![
                ReportError::MissingMetadata {
                    identifier: "b.png".to_string()
                },
                ReportError::MissingMetadata {
                    identifier: "r".to_string()
                },
            ]
        );
        // Counts still describe the whole assignment.
        assert_eq!(report.summary.matched, 2);
        assert_eq!(report.summary.unmatched_candidates, 1);
    }

    #[test]
    fn summary_counts() {
        let refs = [local("a.png"), local("b.png"), local("c.png")];
        let cands = [meta("p"), meta("q"), meta("r")];

        let report = ReportBuilder::new(&refs, &cands).skipped(2).build(&assignment());
        assert_eq!(
            report.summary,
            RunSummary {
                processed: 6,
                skipped: 2,
                references: 3,
                candidates: 3,
                matched: 2,
                unmatched_references: 1,
                unmatched_candidates: 1,
                threshold: 10,
            }
        );
    }

    #[test]
    fn empty_assignment_gives_empty_report() {
        let empty = MatchAssignment {
            confirmed: Vec::new(),
            unmatched_references: Vec::new(),
            unmatched_candidates: Vec::new(),
            threshold: 10,
        };
        let report = ReportBuilder::new(&[], &[]).build(&empty);
        assert!(report.rows.is_empty());
        assert_eq!(report.summary.processed, 0);
    }

    #[test]
    fn skipped_images_of_both_collections_are_counted() {
        use crate::core::hasher::AlgorithmVersion;
        use crate::core::sources::SkippedImage;

        let mut references = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        for id in ["a.png", "b.png", "c.png"] {
            references.insert(local(id)).unwrap();
        }
        references.set_skipped(vec![SkippedImage::new("broken.png", "decode_error")]);

        let mut candidates =
            RecordCollection::new(SourceTag::Platform(AdPlatform::Meta), AlgorithmVersion::DctMedianV1);
        for id in ["p", "q", "r"] {
            candidates.insert(meta(id)).unwrap();
        }
        candidates.set_skipped(vec![
            SkippedImage::new("120004", "invalid_image: empty"),
            SkippedImage::new("120005", "invalid_image: empty"),
        ]);

        let report = ReportBuilder::from_collections(&references, &candidates).build(&assignment());
        assert_eq!(report.summary.skipped, 3);
        assert_eq!(report.summary.processed, 6);
    }

    #[test]
    fn row_errors_are_exported_as_messages() {
        let refs = [local("a.png"), local("c.png")];
        let cands = [meta("p"), meta("q"), meta("r")];
        let report = ReportBuilder::new(&refs, &cands).build(&assignment());

        let value = serde_json::to_value(&report).unwrap();
        let errors = value["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_str().unwrap().contains("b.png"));
    }
}
