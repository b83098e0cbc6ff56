//! Batch fingerprinting.

use crate::core::hasher::{HashAlgorithm, HasherConfig};
use crate::core::sources::{ImageInput, ImageSource, SkippedImage};
use crate::core::store::{RecordCollection, SourceTag, HashRecord};
use crate::error::{CreativeMatchError, HashError};
use crate::events::{
    null_sender, Event, EventSender, HashEvent, HashProgress, PipelineEvent, PipelinePhase,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// What to do when an identifier shows up twice in one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the first occurrence, report the rest as skipped
    #[default]
    Skip,
    /// Keep the last occurrence, in the first one's position
    Replace,
}

/// Result of fingerprinting one batch
#[derive(Debug)]
pub struct BatchResult {
    /// Records that were fingerprinted, in input order
    pub collection: RecordCollection,
    /// Inputs that were passed over, with the reason
    pub skipped: Vec<SkippedImage>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl BatchResult {
    /// Number of records produced
    pub fn processed(&self) -> usize {
        self.collection.len()
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    hasher: HasherConfig,
    duplicate_policy: DuplicatePolicy,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            hasher: HasherConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// Set the hasher configuration
    pub fn hasher(mut self, config: HasherConfig) -> Self {
        self.hasher = config;
        self
    }

    /// Largest encoded image accepted, in bytes
    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.hasher = self.hasher.max_input_bytes(limit);
        self
    }

    /// Set the duplicate identifier policy
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline, HashError> {
        Ok(Pipeline {
            hasher: self.hasher.build()?,
            duplicate_policy: self.duplicate_policy,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprints batches of images into record collections
pub struct Pipeline {
    hasher: Box<dyn HashAlgorithm>,
    duplicate_policy: DuplicatePolicy,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The hasher in use
    pub fn hasher(&self) -> &dyn HashAlgorithm {
        self.hasher.as_ref()
    }

    /// Fingerprint a batch without events
    pub fn hash_batch(&self, inputs: Vec<ImageInput>, source: SourceTag) -> BatchResult {
        self.hash_batch_with_events(inputs, source, &null_sender())
    }

    /// Fingerprint a batch.
    ///
    /// Images are hashed in parallel, then inserted in input order, so the
    /// result never depends on scheduling. Inputs that fail to decode, belong
    /// to another source or repeat an identifier are reported as skipped.
    pub fn hash_batch_with_events(
        &self,
        inputs: Vec<ImageInput>,
        source: SourceTag,
        events: &EventSender,
    ) -> BatchResult {
        let start_time = Instant::now();
        let total = inputs.len();

        events.send(Event::Hash(HashEvent::Started {
            total_images: total,
        }));

        let completed = AtomicUsize::new(0);

        let outcomes: Vec<(String, Result<HashRecord, String>)> = inputs
            .into_par_iter()
            .map(|input| {
                let outcome = self.fingerprint(input);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Hash(HashEvent::Progress(HashProgress {
                    completed: done,
                    total,
                    current: outcome.0.clone(),
                })));
                outcome
            })
            .collect();

        let mut collection = RecordCollection::new(source, self.hasher.version());
        let mut skipped = Vec::new();

        for (identifier, outcome) in outcomes {
            let inserted = outcome.and_then(|record| match self.duplicate_policy {
                DuplicatePolicy::Skip => collection.insert(record).map_err(|e| e.to_string()),
                DuplicatePolicy::Replace => collection
                    .replace(record)
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
            });

            if let Err(reason) = inserted {
                warn!(%identifier, %reason, "image skipped");
                events.send(Event::Hash(HashEvent::Skipped {
                    identifier: identifier.clone(),
                    reason: reason.clone(),
                }));
                skipped.push(SkippedImage::new(identifier, reason));
            }
        }

        events.send(Event::Hash(HashEvent::Completed {
            total_hashed: collection.len(),
            skipped: skipped.len(),
        }));
        info!(
            %source,
            processed = collection.len(),
            skipped = skipped.len(),
            "batch fingerprinted"
        );

        collection.set_skipped(skipped.clone());

        BatchResult {
            collection,
            skipped,
            duration_ms: start_time.elapsed().as_millis() as u64,
        }
    }

    /// Collect a source and fingerprint everything it yields.
    ///
    /// Items the source could not read are reported alongside images that
    /// failed to hash.
    pub fn hash_source(
        &self,
        images: &dyn ImageSource,
        source: SourceTag,
        events: &EventSender,
    ) -> Result<BatchResult, CreativeMatchError> {
        events.send(Event::Pipeline(PipelineEvent::Started));
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Collecting,
        }));
        let start_time = Instant::now();

        let batch = images.collect_with_events(events)?;

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Hashing,
        }));
        let mut result = self.hash_batch_with_events(batch.inputs, source, events);

        let mut skipped = batch.skipped;
        skipped.append(&mut result.skipped);
        result.collection.set_skipped(skipped.clone());
        result.skipped = skipped;
        result.duration_ms = start_time.elapsed().as_millis() as u64;

        events.send(Event::Pipeline(PipelineEvent::Completed {
            processed: result.processed(),
            skipped: result.skipped.len(),
            duration_ms: result.duration_ms,
        }));

        Ok(result)
    }

    fn fingerprint(&self, input: ImageInput) -> (String, Result<HashRecord, String>) {
        let ImageInput {
            identifier,
            format,
            bytes,
            metadata,
        } = input;

        let record = self
            .hasher
            .hash_bytes(&bytes, format)
            .map_err(|e| e.skip_reason())
            .and_then(|fingerprint| {
                HashRecord::new(identifier.clone(), fingerprint, metadata).map_err(|e| e.to_string())
            });

        (identifier, record)
    }
}
