//! CSV hash files.
//!
//! The layout is chosen from the header row:
//! - `ad_id,platform,phash,...` holds ad-platform creatives
//! - `file_id,...,phash` holds cloud files
//! - `filename,phash,...` holds local files
//!
//! Column order does not matter and unknown columns are ignored. Optional
//! columns (`creative_name`, `thumbnail_url`, `file_path`, `file_size`, ...)
//! fall back to defaults when absent or empty.

use super::record::{AdPlatform, HashRecord, ImageOrigin, SourceMetadata, SourceTag};
use super::RecordCollection;
use crate::core::hasher::{AlgorithmVersion, Fingerprint};
use crate::error::StoreError;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One parsed CSV record with the line it started on
struct Row {
    line: usize,
    fields: Vec<String>,
}

/// Split CSV text into records (RFC 4180: quoted fields may hold commas,
/// doubled quotes and line breaks). Blank lines are dropped.
fn parse_rows(text: &str) -> Result<Vec<Row>, StoreError> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, start_line, std::mem::take(&mut fields));
                line += 1;
                start_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StoreError::Csv {
            line: start_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_row(&mut rows, start_line, fields);
    }

    Ok(rows)
}

fn push_row(rows: &mut Vec<Row>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        rows.push(Row { line, fields });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Platform,
    Cloud,
    Local,
}

/// Column positions by lowercase header name
struct Header {
    layout: Layout,
    columns: HashMap<String, usize>,
}

impl Header {
    fn parse(row: &Row) -> Result<Self, StoreError> {
        let columns: HashMap<String, usize> = row
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().trim_start_matches('\u{feff}').to_lowercase(), i))
            .collect();

        let has = |name: &str| columns.contains_key(name);
        let layout = if has("ad_id") && has("platform") {
            Layout::Platform
        } else if has("file_id") {
            Layout::Cloud
        } else if has("filename") {
            Layout::Local
        } else {
            return Err(StoreError::Csv {
                line: row.line,
                reason: "header needs ad_id and platform, file_id, or filename".to_string(),
            });
        };

        if !has("phash") {
            return Err(StoreError::Csv {
                line: row.line,
                reason: "header has no phash column".to_string(),
            });
        }

        Ok(Self { layout, columns })
    }

    /// Trimmed value of `name`, `None` when the column is absent or empty
    fn get<'r>(&self, row: &'r Row, name: &str) -> Option<&'r str> {
        self.columns
            .get(name)
            .and_then(|&i| row.fields.get(i))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn require<'r>(&self, row: &'r Row, name: &str) -> Result<&'r str, StoreError> {
        self.get(row, name).ok_or_else(|| StoreError::Csv {
            line: row.line,
            reason: format!("missing {}", name),
        })
    }

    fn size(&self, row: &Row) -> Result<u64, StoreError> {
        match self.get(row, "file_size") {
            Some(value) => value.parse().map_err(|_| StoreError::Csv {
                line: row.line,
                reason: format!("file_size '{}' is not a byte count", value),
            }),
            None => Ok(0),
        }
    }

    fn record(&self, row: &Row) -> Result<HashRecord, StoreError> {
        let phash = self.require(row, "phash")?;
        let fingerprint: Fingerprint = phash.parse().map_err(|e| StoreError::Csv {
            line: row.line,
            reason: format!("phash '{}': {}", phash, e),
        })?;

        let (identifier, metadata) = match self.layout {
            Layout::Platform => {
                let ad_id = self.require(row, "ad_id")?;
                let platform = parse_platform(self.require(row, "platform")?, row.line)?;
                let image_origin = self
                    .get(row, "image_source")
                    .map(|value| parse_origin(value, row.line))
                    .transpose()?;
                let metadata = SourceMetadata::PlatformCreative {
                    platform,
                    creative_name: self.get(row, "creative_name").unwrap_or(ad_id).to_string(),
                    thumbnail_url: self.get(row, "thumbnail_url").map(str::to_string),
                    asset_name: self.get(row, "asset_name").map(str::to_string),
                    image_origin,
                };
                (ad_id, metadata)
            }
            Layout::Cloud => {
                let file_id = self.require(row, "file_id")?;
                let file_name = self
                    .get(row, "filename")
                    .or_else(|| self.get(row, "file_name"))
                    .unwrap_or(file_id);
                let metadata = SourceMetadata::CloudFile {
                    file_name: file_name.to_string(),
                    file_id: file_id.to_string(),
                    file_size: self.size(row)?,
                    web_link: self.get(row, "web_link").map(str::to_string),
                };
                (file_id, metadata)
            }
            Layout::Local => {
                let file_name = self.require(row, "filename")?;
                let metadata = SourceMetadata::LocalFile {
                    file_name: file_name.to_string(),
                    file_path: PathBuf::from(self.get(row, "file_path").unwrap_or(file_name)),
                    file_size: self.size(row)?,
                };
                (file_name, metadata)
            }
        };

        HashRecord::new(identifier, fingerprint, metadata)
    }
}

fn parse_platform(value: &str, line: usize) -> Result<AdPlatform, StoreError> {
    match value.to_lowercase().as_str() {
        "meta" => Ok(AdPlatform::Meta),
        "google" => Ok(AdPlatform::Google),
        _ => Err(StoreError::Csv {
            line,
            reason: format!("unknown platform '{}'", value),
        }),
    }
}

fn parse_origin(value: &str, line: usize) -> Result<ImageOrigin, StoreError> {
    match value.to_lowercase().as_str() {
        "url" => Ok(ImageOrigin::Url),
        "base64" | "embedded" => Ok(ImageOrigin::Embedded),
        _ => Err(StoreError::Csv {
            line,
            reason: format!("unknown image_source '{}'", value),
        }),
    }
}

impl RecordCollection {
    /// Parse a CSV hash file.
    ///
    /// Every row must belong to one source; a platform file mixing Meta and
    /// Google rows fails with `SourceMismatch`. Duplicate identifiers fail
    /// the same way they do on insert.
    pub fn from_csv_reader<R: Read>(mut reader: R) -> Result<Self, StoreError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| StoreError::Csv {
                line: 0,
                reason: e.to_string(),
            })?;

        let mut rows = parse_rows(&text)?.into_iter();
        let header = match rows.next() {
            Some(row) => Header::parse(&row)?,
            None => {
                return Err(StoreError::Csv {
                    line: 1,
                    reason: "file is empty".to_string(),
                })
            }
        };

        let records = rows
            .map(|row| header.record(&row))
            .collect::<Result<Vec<_>, _>>()?;

        let source = match (header.layout, records.first()) {
            (_, Some(first)) => first.source(),
            (Layout::Cloud, None) => SourceTag::Cloud,
            (Layout::Local, None) => SourceTag::Local,
            (Layout::Platform, None) => {
                return Err(StoreError::Csv {
                    line: 1,
                    reason: "platform file has no rows to tell the platform from".to_string(),
                })
            }
        };

        let mut collection = Self::new(source, AlgorithmVersion::DctMedianV1);
        for record in records {
            collection.insert(record)?;
        }
        Ok(collection)
    }

    /// Read a collection from a CSV hash file
    pub fn read_csv(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let collection = Self::from_csv_reader(file)?;
        debug!(path = %path.display(), records = collection.len(), "read CSV hash file");
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matcher::MatchingEngine;
    use std::io::Write;

    const LOCAL_HASHES: &str = "\
filename,phash,file_path,file_size
ad_creative_1.png,9a65659a9a65659a,test_images/ad_creative_1.png,4523
ad_creative_2.jpg,cb2434dbcb2434db,test_images/ad_creative_2.jpg,5635
banner_ad.png,cc3333cccc3333cc,test_images/banner_ad.png,3785
product_image.jpg,857a7a85c57a3a85,test_images/product_image.jpg,7981
unmatched_local.png,123456789abcdef0,test_images/unmatched_local.png,3000
";

    const META_HASHES: &str = "\
ad_id,platform,phash,creative_name,thumbnail_url
123456789,Meta,9a65659a9a65659a,Summer Sale Banner,https://example.com/thumb1.jpg
987654321,Meta,cb2434dbcb2434db,Product Showcase,https://example.com/thumb2.jpg
555666777,Meta,cc3333cccc3333cc,Banner Ad,https://example.com/thumb3.jpg
111222333,Meta,857a7a85c57a3a85,Product Image,https://example.com/thumb4.jpg
999888777,Meta,abcdef1234567890,Unmatched Platform Ad,https://example.com/thumb5.jpg
";

    fn read(text: &str) -> Result<RecordCollection, StoreError> {
        RecordCollection::from_csv_reader(text.as_bytes())
    }

    #[test]
    fn local_layout_reads_file_metadata() {
        let local = read(LOCAL_HASHES).unwrap();

        assert_eq!(local.source(), SourceTag::Local);
        assert_eq!(local.len(), 5);
        let record = local.get("ad_creative_1.png").unwrap();
        assert_eq!(record.fingerprint().to_hex(), "9a65659a9a65659a");
        assert_eq!(
            record.metadata(),
            &SourceMetadata::LocalFile {
                file_name: "ad_creative_1.png".to_string(),
                file_path: PathBuf::from("test_images/ad_creative_1.png"),
                file_size: 4523,
            }
        );
    }

    #[test]
    fn platform_layout_reads_creatives() {
        let meta = read(META_HASHES).unwrap();

        assert_eq!(meta.source(), SourceTag::Platform(AdPlatform::Meta));
        let record = meta.get("999888777").unwrap();
        assert_eq!(record.metadata().display_name(), "Unmatched Platform Ad");
        assert_eq!(
            record.metadata().location().as_deref(),
            Some("https://example.com/thumb5.jpg")
        );
    }

    #[test]
    fn fixture_hash_files_give_four_matches_and_one_ghost() {
        let local = read(LOCAL_HASHES).unwrap();
        let meta = read(META_HASHES).unwrap();

        let assignment = MatchingEngine::with_threshold(10)
            .unwrap()
            .run(local.records(), meta.records());

        let mut pairs: Vec<_> = assignment
            .confirmed
            .iter()
            .map(|m| (m.reference_id.as_str(), m.candidate_id.as_str(), m.distance))
            .collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("ad_creative_1.png", "123456789", 0),
                ("ad_creative_2.jpg", "987654321", 0),
                ("banner_ad.png", "555666777", 0),
                ("product_image.jpg", "111222333", 0),
            ]
        );
        assert_eq!(assignment.unmatched_references, vec!["unmatched_local.png"]);
        assert_eq!(assignment.unmatched_candidates, vec!["999888777"]);
    }

    #[test]
    fn cloud_layout_uses_file_id_as_identifier() {
        let cloud = read(
            "filename,phash,file_id,file_size,web_link\r\n\
             hero.png,00000000000000ff,1AbC,2048,https://drive.example.com/1AbC\r\n",
        )
        .unwrap();

        assert_eq!(cloud.source(), SourceTag::Cloud);
        let record = cloud.get("1AbC").unwrap();
        assert_eq!(record.metadata().display_name(), "hero.png");
        assert_eq!(record.metadata().file_size(), Some(2048));
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let meta = read(
            "ad_id,platform,phash,creative_name,image_source\n\
             42,google,0000000000000001,\"Sale, \"\"50%\"\" off\nthis week\",base64\n",
        )
        .unwrap();

        let record = meta.get("42").unwrap();
        assert_eq!(record.metadata().display_name(), "Sale, \"50%\" off\nthis week");
        assert!(matches!(
            record.metadata(),
            SourceMetadata::PlatformCreative {
                platform: AdPlatform::Google,
                image_origin: Some(ImageOrigin::Embedded),
                ..
            }
        ));
    }

    #[test]
    fn missing_optional_columns_fall_back_to_defaults() {
        let local = read("phash,filename\n0000000000000000,a.png\n\n").unwrap();

        assert_eq!(
            local.get("a.png").unwrap().metadata(),
            &SourceMetadata::LocalFile {
                file_name: "a.png".to_string(),
                file_path: PathBuf::from("a.png"),
                file_size: 0,
            }
        );
    }

    #[test]
    fn bad_rows_name_their_line() {
        let err = read("filename,phash\na.png,0000000000000000\nb.png,not-a-hash\n").unwrap_err();
        match err {
            StoreError::Csv { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("not-a-hash"), "{}", reason);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            read("name,phash\nx,0000000000000000\n"),
            Err(StoreError::Csv { line: 1, .. })
        ));
        assert!(matches!(
            read("filename,file_size\na.png,1\n"),
            Err(StoreError::Csv { line: 1, .. })
        ));
        assert!(matches!(
            read("filename,phash\n\"a.png,0000000000000000\n"),
            Err(StoreError::Csv { line: 2, .. })
        ));
    }

    #[test]
    fn mixed_platforms_and_duplicates_are_rejected() {
        let mixed = "ad_id,platform,phash\n1,Meta,0000000000000000\n2,Google,0000000000000001\n";
        assert!(matches!(read(mixed), Err(StoreError::SourceMismatch { .. })));

        let duplicated = "filename,phash\na.png,0000000000000000\na.png,0000000000000001\n";
        assert!(matches!(
            read(duplicated),
            Err(StoreError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn hash_files_are_read_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("local_creative_hashes.csv");
        std::fs::File::create(&csv_path)
            .unwrap()
            .write_all(LOCAL_HASHES.as_bytes())
            .unwrap();
        let json_path = dir.path().join("local.json");
        read(LOCAL_HASHES).unwrap().write_json(&json_path).unwrap();

        let from_csv = RecordCollection::read(&csv_path).unwrap();
        let from_json = RecordCollection::read(&json_path).unwrap();
        assert_eq!(from_csv.records(), from_json.records());
    }
}
