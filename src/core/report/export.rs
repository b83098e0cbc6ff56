//! Export functionality for match reports.
//!
//! Supports CSV for spreadsheets and JSON for other tools.

use super::{MatchReport, RecordSummary};
use crate::error::ReportError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    /// Guess the format from a file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Csv,
        }
    }
}

const CSV_HEADER: &str = "status,reference_id,reference_name,reference_location,reference_size,\
candidate_id,candidate_source,candidate_name,candidate_location,distance,quality,similarity_percent";

/// Quote a field if it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn column(summary: Option<&RecordSummary>, get: impl Fn(&RecordSummary) -> String) -> String {
    csv_field(&summary.map(get).unwrap_or_default())
}

/// Export rows to CSV, one line per row
pub fn export_csv<W: Write>(report: &MatchReport, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;

    for row in &report.rows {
        let reference = row.reference.as_ref();
        let candidate = row.candidate.as_ref();
        let similarity = row
            .distance
            .map(|d| format!("{:.1}", (1.0 - d as f64 / 64.0) * 100.0));

        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            row.status,
            column(reference, |s| s.identifier.clone()),
            column(reference, |s| s.name.clone()),
            column(reference, |s| optional(s.location.as_ref())),
            column(reference, |s| optional(s.file_size)),
            column(candidate, |s| s.identifier.clone()),
            column(candidate, |s| s.source.to_string()),
            column(candidate, |s| s.name.clone()),
            column(candidate, |s| optional(s.location.as_ref())),
            optional(row.distance),
            optional(row.quality),
            optional(similarity),
        )?;
    }

    Ok(())
}

/// Export the whole report, summary included, as pretty JSON
pub fn export_json<W: Write>(report: &MatchReport, writer: W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(writer, report).map_err(std::io::Error::from)
}

/// Export a report to a file
pub fn export_to_file(
    report: &MatchReport,
    path: &Path,
    format: ReportFormat,
) -> Result<(), ReportError> {
    let write = || -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        match format {
            ReportFormat::Csv => export_csv(report, &mut writer)?,
            ReportFormat::Json => export_json(report, &mut writer)?,
        }
        writer.flush()
    };

    write().map_err(|e| ReportError::Write(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::Fingerprint;
    use crate::core::matcher::MatchQuality;
    use crate::core::report::{ReportRow, RowStatus, RunSummary};
    use crate::core::store::{AdPlatform, SourceTag};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn summary(identifier: &str, source: SourceTag, name: &str, location: Option<&str>) -> RecordSummary {
        RecordSummary {
            identifier: identifier.to_string(),
            source,
            name: name.to_string(),
            location: location.map(str::to_string),
            file_size: matches!(source, SourceTag::Local).then_some(4523),
            fingerprint: Fingerprint::from_u64(0x9a65_659a_9a65_659a),
        }
    }

    fn create_test_report() -> MatchReport {
        MatchReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary: RunSummary::default(),
            rows: vec![
                ReportRow {
                    status: RowStatus::Matched,
                    reference: Some(summary("banner_ad.png", SourceTag::Local, "banner_ad.png", Some("/creatives/banner_ad.png"))),
                    candidate: Some(summary(
                        "123456789",
                        SourceTag::Platform(AdPlatform::Meta),
                        "Summer Sale, \"Hero\"",
                        Some("https://example.com/thumb1.jpg"),
                    )),
                    distance: Some(3),
                    quality: Some(MatchQuality::NearExact),
                },
                ReportRow {
                    status: RowStatus::UnmatchedReference,
                    reference: Some(summary("ghost.png", SourceTag::Local, "ghost.png", Some("/creatives/ghost.png"))),
                    candidate: None,
                    distance: None,
                    quality: None,
                },
            ],
            errors: Vec::new(),
        }
    }

    #[test]
    fn csv_field_quotes_only_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn csv_export_includes_header() {
        let mut output = Vec::new();
        export_csv(&create_test_report(), &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        assert!(csv.starts_with("status,reference_id,reference_name"));
    }

    #[test]
    fn csv_export_writes_one_line_per_row() {
        let mut output = Vec::new();
        export_csv(&create_test_report(), &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "matched,banner_ad.png,banner_ad.png,/creatives/banner_ad.png,4523,123456789,meta,\
\"Summer Sale, \"\"Hero\"\"\",https://example.com/thumb1.jpg,3,Near-exact,95.3"
        );
        assert_eq!(lines[2], "unmatched_reference,ghost.png,ghost.png,/creatives/ghost.png,4523,,,,,,,");
    }

    #[test]
    fn json_export_includes_summary_and_rows() {
        let mut output = Vec::new();
        export_json(&create_test_report(), &mut output).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["rows"].as_array().unwrap().len(), 2);
        assert_eq!(value["rows"][0]["status"], "matched");
        assert_eq!(value["rows"][0]["candidate"]["fingerprint"], "9a65659a9a65659a");
        assert!(value["summary"]["threshold"].is_number());
    }

    #[test]
    fn export_to_file_writes_selected_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        export_to_file(&create_test_report(), &path, ReportFormat::from_path(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('{'));
    }

    #[test]
    fn export_to_missing_folder_is_a_write_error() {
        let result = export_to_file(
            &create_test_report(),
            Path::new("/definitely/not/here/report.csv"),
            ReportFormat::Csv,
        );
        assert!(matches!(result, Err(ReportError::Write(_))));
    }

    #[test]
    fn format_from_path() {
        assert_eq!(ReportFormat::from_path(Path::new("r.JSON")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("r.csv")), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_path(Path::new("report")), ReportFormat::Csv);
    }
}
