//! # Store Module
//!
//! Holds fingerprinted images grouped by source.
//!
//! ## Guarantees
//! - Identifiers are unique within a source; duplicates are rejected,
//!   never silently overwritten
//! - Records enumerate in insertion order
//! - Every collection records the algorithm version of its fingerprints
//!
//! Cross-source reasoning is left to the matcher.
//!
//! ## Hash files
//! Collections persist as JSON with fingerprints as 16-digit hex strings,
//! so a local-folder run and a platform export can be matched later. The
//! images a run could not fingerprint travel with them. CSV hash files in
//! the `filename,phash` / `ad_id,platform,phash` layouts can be read too.

mod csv;
mod record;

pub use record::{AdPlatform, HashRecord, ImageOrigin, SourceMetadata, SourceTag};

use crate::core::hasher::AlgorithmVersion;
use crate::core::sources::SkippedImage;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Ordered records from a single source
#[derive(Debug, Clone)]
pub struct RecordCollection {
    source: SourceTag,
    algorithm: AlgorithmVersion,
    records: Vec<HashRecord>,
    index: HashMap<String, usize>,
    skipped: Vec<SkippedImage>,
}

/// On-disk shape of a collection
#[derive(Serialize, Deserialize)]
struct HashFile {
    source: SourceTag,
    algorithm: AlgorithmVersion,
    records: Vec<HashRecord>,
    #[serde(default)]
    skipped: Vec<SkippedImage>,
}

impl RecordCollection {
    /// Create an empty collection
    pub fn new(source: SourceTag, algorithm: AlgorithmVersion) -> Self {
        Self {
            source,
            algorithm,
            records: Vec::new(),
            index: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    /// The source every record in this collection belongs to
    pub fn source(&self) -> SourceTag {
        self.source
    }

    /// Algorithm version of every fingerprint in this collection
    pub fn algorithm(&self) -> AlgorithmVersion {
        self.algorithm
    }

    fn check_source(&self, record: &HashRecord) -> Result<(), StoreError> {
        if record.source() != self.source {
            return Err(StoreError::SourceMismatch {
                identifier: record.identifier().to_string(),
                expected: self.source.to_string(),
                found: record.source().to_string(),
            });
        }
        Ok(())
    }

    /// Append a record.
    ///
    /// Fails with `DuplicateIdentifier` if the identifier is already present;
    /// the existing record is left untouched.
    pub fn insert(&mut self, record: HashRecord) -> Result<(), StoreError> {
        self.check_source(&record)?;

        if self.index.contains_key(record.identifier()) {
            return Err(StoreError::DuplicateIdentifier {
                identifier: record.identifier().to_string(),
                source_tag: self.source.to_string(),
            });
        }

        self.index
            .insert(record.identifier().to_string(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Explicitly overwrite the record with the same identifier, keeping its
    /// position. Appends when absent. Returns the replaced record.
    pub fn replace(&mut self, record: HashRecord) -> Result<Option<HashRecord>, StoreError> {
        self.check_source(&record)?;

        match self.index.get(record.identifier()) {
            Some(&position) => Ok(Some(std::mem::replace(&mut self.records[position], record))),
            None => {
                self.insert(record)?;
                Ok(None)
            }
        }
    }

    /// Look up a record by identifier
    pub fn get(&self, identifier: &str) -> Option<&HashRecord> {
        self.index.get(identifier).map(|&i| &self.records[i])
    }

    /// Check whether an identifier is present
    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Records in insertion order
    pub fn records(&self) -> &[HashRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Images from this source that never became records
    pub fn skipped(&self) -> &[SkippedImage] {
        &self.skipped
    }

    /// Replace the list of images that never became records
    pub fn set_skipped(&mut self, skipped: Vec<SkippedImage>) {
        self.skipped = skipped;
    }

    /// Serialize to JSON
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        let file = HashFile {
            source: self.source,
            algorithm: self.algorithm,
            records: self.records.clone(),
            skipped: self.skipped.clone(),
        };
        serde_json::to_writer_pretty(writer, &file)?;
        Ok(())
    }

    /// Deserialize from JSON, re-applying every construction check
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StoreError> {
        let file: HashFile = serde_json::from_reader(reader)?;
        let mut collection = Self::new(file.source, file.algorithm);
        for record in file.records {
            collection.insert(record.revalidate()?)?;
        }
        collection.skipped = file.skipped;
        Ok(collection)
    }

    /// Write the collection to a JSON hash file
    pub fn write_json(&self, path: &Path) -> Result<(), StoreError> {
        let file = File::create(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush().map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), records = self.len(), "wrote hash file");
        Ok(())
    }

    /// Read a collection from a JSON hash file
    pub fn read_json(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let collection = Self::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), records = collection.len(), "read hash file");
        Ok(collection)
    }

    /// Read a hash file, as CSV when the extension says so and JSON otherwise
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            Self::read_csv(path)
        } else {
            Self::read_json(path)
        }
    }
}

/// All collections of a run, keyed by source
#[derive(Debug, Clone)]
pub struct HashStore {
    algorithm: AlgorithmVersion,
    collections: BTreeMap<SourceTag, RecordCollection>,
}

impl HashStore {
    /// Create an empty store for fingerprints of `algorithm`
    pub fn new(algorithm: AlgorithmVersion) -> Self {
        Self {
            algorithm,
            collections: BTreeMap::new(),
        }
    }

    /// The collection for `source`, if any record was ever added to it
    pub fn collection(&self, source: SourceTag) -> Option<&RecordCollection> {
        self.collections.get(&source)
    }

    /// The collection for `source`, created on first use
    pub fn collection_mut(&mut self, source: SourceTag) -> &mut RecordCollection {
        let algorithm = self.algorithm;
        self.collections
            .entry(source)
            .or_insert_with(|| RecordCollection::new(source, algorithm))
    }

    /// Route a record to its source's collection
    pub fn insert(&mut self, record: HashRecord) -> Result<(), StoreError> {
        self.collection_mut(record.source()).insert(record)
    }

    /// Sources that have a collection, in a stable order
    pub fn sources(&self) -> impl Iterator<Item = SourceTag> + '_ {
        self.collections.keys().copied()
    }

    /// Records across every source
    pub fn total_records(&self) -> usize {
        self.collections.values().map(RecordCollection::len).sum()
    }
}

impl Default for HashStore {
    fn default() -> Self {
        Self::new(AlgorithmVersion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::Fingerprint;
    use std::path::PathBuf;

    fn local(id: &str, hash: u64) -> HashRecord {
        HashRecord::new(
            id,
            Fingerprint::from_u64(hash),
            SourceMetadata::LocalFile {
                file_name: id.to_string(),
                file_path: PathBuf::from(format!("test_images/{}", id)),
                file_size: 3000,
            },
        )
        .unwrap()
    }

    fn google(id: &str, hash: u64) -> HashRecord {
        HashRecord::new(
            id,
            Fingerprint::from_u64(hash),
            SourceMetadata::PlatformCreative {
                platform: AdPlatform::Google,
                creative_name: format!("Ad {}", id),
                thumbnail_url: None,
                asset_name: Some(format!("Asset {}", id)),
                image_origin: Some(ImageOrigin::Embedded),
            },
        )
        .unwrap()
    }

    #[test]
    fn records_keep_insertion_order() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        for id in ["c.png", "a.png", "b.png"] {
            collection.insert(local(id, 1)).unwrap();
        }
        let ids: Vec<_> = collection.records().iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, ["c.png", "a.png", "b.png"]);
    }

    #[test]
    fn duplicate_identifier_is_rejected_without_overwrite() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        collection.insert(local("a.png", 1)).unwrap();

        let err = collection.insert(local("a.png", 2)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentifier { .. }));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("a.png").unwrap().fingerprint().as_u64(), 1);
    }

    #[test]
    fn replace_overwrites_in_place() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        collection.insert(local("a.png", 1)).unwrap();
        collection.insert(local("b.png", 2)).unwrap();

        let old = collection.replace(local("a.png", 9)).unwrap();
        assert_eq!(old.unwrap().fingerprint().as_u64(), 1);
        assert_eq!(collection.records()[0].fingerprint().as_u64(), 9);

        assert!(collection.replace(local("c.png", 3)).unwrap().is_none());
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn wrong_source_is_rejected() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        let err = collection.insert(google("42", 1)).unwrap_err();
        assert!(matches!(err, StoreError::SourceMismatch { .. }));
    }

    #[test]
    fn lookup_by_identifier() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        collection.insert(local("a.png", 7)).unwrap();
        assert!(collection.contains("a.png"));
        assert!(collection.get("missing.png").is_none());
    }

    #[test]
    fn store_routes_records_by_source() {
        let mut store = HashStore::default();
        store.insert(local("a.png", 1)).unwrap();
        store.insert(google("42", 2)).unwrap();
        // Same identifier in a different source is fine.
        store.insert(google("a.png", 3)).unwrap();

        assert_eq!(store.total_records(), 3);
        assert_eq!(store.collection(SourceTag::Local).unwrap().len(), 1);
        assert_eq!(
            store.collection(SourceTag::Platform(AdPlatform::Google)).unwrap().len(),
            2
        );
        assert!(store.collection(SourceTag::Cloud).is_none());
        let sources: Vec<_> = store.sources().collect();
        assert_eq!(sources, [SourceTag::Local, SourceTag::Platform(AdPlatform::Google)]);
    }

    #[test]
    fn json_round_trip_preserves_order_and_fingerprints() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        collection.insert(local("b.png", 0x9a65_659a_9a65_659a)).unwrap();
        collection.insert(local("a.png", 0x1234_5678_9abc_def0)).unwrap();

        let mut buffer = Vec::new();
        collection.to_writer(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains("\"9a65659a9a65659a\""));

        let back = RecordCollection::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(back.source(), SourceTag::Local);
        assert_eq!(back.records(), collection.records());
    }

    #[test]
    fn json_with_duplicates_is_rejected() {
        let json = r#"{
            "source": "local",
            "algorithm": "dct-median-v1",
            "records": [
                {"identifier": "a.png", "fingerprint": "0000000000000001",
                 "metadata": {"kind": "local_file", "file_name": "a.png", "file_path": "a.png", "file_size": 1}},
                {"identifier": "a.png", "fingerprint": "0000000000000002",
                 "metadata": {"kind": "local_file", "file_name": "a.png", "file_path": "a.png", "file_size": 1}}
            ]
        }"#;
        let err = RecordCollection::from_reader(json.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentifier { .. }));
    }

    #[test]
    fn skipped_images_travel_with_the_hash_file() {
        let mut collection = RecordCollection::new(SourceTag::Local, AlgorithmVersion::DctMedianV1);
        collection.insert(local("a.png", 1)).unwrap();
        collection.set_skipped(vec![SkippedImage::new("broken.png", "decode_error: truncated")]);

        let mut buffer = Vec::new();
        collection.to_writer(&mut buffer).unwrap();
        let back = RecordCollection::from_reader(buffer.as_slice()).unwrap();

        assert_eq!(back.skipped(), collection.skipped());
        assert_eq!(back.skipped()[0].identifier, "broken.png");
    }

    #[test]
    fn hash_files_without_skipped_entries_still_load() {
        let json = r#"{"source": "cloud", "algorithm": "dct-median-v1", "records": []}"#;
        let collection = RecordCollection::from_reader(json.as_bytes()).unwrap();
        assert!(collection.skipped().is_empty());
        assert_eq!(collection.source(), SourceTag::Cloud);
    }
}
