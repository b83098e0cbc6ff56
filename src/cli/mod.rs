//! # CLI Module
//!
//! Command-line interface for creative matching.
//!
//! ## Usage
//! ```bash
//! # Fingerprint a local creative folder
//! creative-match hash ./creatives -o local.json
//!
//! # Fingerprint a synced cloud drive folder, including subfolders
//! creative-match hash ~/Drive/Ads --source cloud --recursive -o drive.json
//!
//! # Match two hash files and write a CSV report
//! creative-match match --reference local.json --candidate meta.json -o report.csv
//!
//! # Stricter threshold, JSON summary on stdout
//! creative-match match -r local.json -c meta.json --threshold 5 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use creative_match::core::matcher::{MatchConfig, MatchingEngine, SearchStrategy};
use creative_match::core::pipeline::{BatchResult, DuplicatePolicy, Pipeline};
use creative_match::core::report::{
    export_json, export_to_file, MatchReport, ReportBuilder, ReportFormat,
};
use creative_match::core::sources::{FolderKind, LocalFolderSource};
use creative_match::core::store::{RecordCollection, SourceTag};
use creative_match::error::{ReportError, Result, StoreError};
use creative_match::events::{
    Event, EventChannel, EventSender, HashEvent, MatchEvent, PipelineEvent, ScanEvent,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Creative Match - find the same ad creative across sources
#[derive(Parser, Debug)]
#[command(name = "creative-match")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint every image in a folder and write a hash file
    Hash {
        /// Folder holding the creatives
        folder: PathBuf,

        /// What the folder is
        #[arg(short, long, default_value = "local")]
        source: FolderSource,

        /// Descend into subfolders
        #[arg(long)]
        recursive: bool,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Keep the last image when an identifier repeats
        #[arg(long)]
        replace_duplicates: bool,

        /// Hash file to write
        #[arg(short = 'o', long = "out", default_value = "hashes.json")]
        out: PathBuf,

        /// Output format
        #[arg(long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Match a reference hash file against a candidate hash file
    Match {
        /// Hash file (JSON or CSV) of the reference side (e.g. local creatives)
        #[arg(short, long)]
        reference: PathBuf,

        /// Hash file (JSON or CSV) of the candidate side (e.g. a platform export)
        #[arg(short, long)]
        candidate: PathBuf,

        /// Maximum Hamming distance for a match (0-64)
        #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
        threshold: i64,

        /// Candidate search strategy
        #[arg(long, default_value = "all-pairs")]
        strategy: Strategy,

        /// Report file to write
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,

        /// Report file format (defaults to the file extension)
        #[arg(short, long)]
        format: Option<ReportFileFormat>,

        /// Output format
        #[arg(long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FolderSource {
    /// A local design folder
    Local,
    /// A synced cloud drive folder
    Cloud,
}

impl FolderSource {
    fn kind(self) -> FolderKind {
        match self {
            FolderSource::Local => FolderKind::Local,
            FolderSource::Cloud => FolderKind::CloudMirror,
        }
    }

    fn tag(self) -> SourceTag {
        match self {
            FolderSource::Local => SourceTag::Local,
            FolderSource::Cloud => SourceTag::Cloud,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Compare every pair (default)
    AllPairs,
    /// Exact banded index, faster on large sets
    Banded,
}

impl From<Strategy> for SearchStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::AllPairs => SearchStrategy::AllPairs,
            Strategy::Banded => SearchStrategy::Banded,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFileFormat {
    Csv,
    Json,
}

impl From<ReportFileFormat> for ReportFormat {
    fn from(format: ReportFileFormat) -> Self {
        match format {
            ReportFileFormat::Csv => ReportFormat::Csv,
            ReportFileFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    creative_match::init_tracing(if cli.verbose { "debug" } else { "warn" });

    match cli.command {
        Commands::Hash {
            folder,
            source,
            recursive,
            include_hidden,
            replace_duplicates,
            out,
            output,
        } => {
            let images = LocalFolderSource::new(folder)
                .recursive(recursive)
                .include_hidden(include_hidden)
                .kind(source.kind());
            let policy = if replace_duplicates {
                DuplicatePolicy::Replace
            } else {
                DuplicatePolicy::Skip
            };
            run_hash(&images, source.tag(), policy, &out, output)
        }
        Commands::Match {
            reference,
            candidate,
            threshold,
            strategy,
            out,
            format,
            output,
        } => {
            let config = MatchConfig::new().threshold(threshold)?.strategy(strategy.into());
            let format = match (&out, format) {
                (_, Some(format)) => format.into(),
                (Some(path), None) => ReportFormat::from_path(path),
                (None, None) => ReportFormat::Csv,
            };
            run_match(&reference, &candidate, config, out.as_deref(), format, output)
        }
    }
}

/// Progress bar driven by events from a background thread
fn spawn_progress(enabled: bool) -> (EventSender, JoinHandle<()>) {
    let (sender, receiver) = EventChannel::new();

    let progress = enabled.then(|| {
        let pb = ProgressBar::new(0);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(bar_style);
        pb
    });

    let handle = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else { continue };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Completed { total_images, .. }) => {
                    pb.set_length(total_images as u64);
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Match(MatchEvent::Started { references, .. }) => {
                    pb.set_length(references as u64);
                    pb.set_position(0);
                    pb.set_message("Matching");
                }
                Event::Match(MatchEvent::Progress(p)) => {
                    pb.set_position(p.references_searched as u64);
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Match(MatchEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    (sender, handle)
}

fn run_hash(
    images: &LocalFolderSource,
    source: SourceTag,
    policy: DuplicatePolicy,
    out: &Path,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        print_header(&term);
    }

    let pipeline = Pipeline::builder().duplicate_policy(policy).build()?;

    let (sender, events) = spawn_progress(pretty);
    let result = pipeline.hash_source(images, source, &sender);
    drop(sender);
    events.join().ok();
    let result = result?;

    result.collection.write_json(out)?;

    match output {
        OutputFormat::Pretty => print_pretty_hash(&term, &result, out),
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "source": source,
                "algorithm": result.collection.algorithm(),
                "processed": result.processed(),
                "skipped": result.skipped,
                "duration_ms": result.duration_ms,
                "hash_file": out,
            });
            let json = serde_json::to_string_pretty(&summary).map_err(StoreError::from)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn run_match(
    reference: &Path,
    candidate: &Path,
    config: MatchConfig,
    out: Option<&Path>,
    format: ReportFormat,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        print_header(&term);
    }

    let references = RecordCollection::read(reference)?;
    let candidates = RecordCollection::read(candidate)?;
    let engine = MatchingEngine::new(config);

    let (sender, events) = spawn_progress(pretty);
    let assignment = engine.run_collections(&references, &candidates, &sender);
    drop(sender);
    events.join().ok();
    let assignment = assignment?;

    let report = ReportBuilder::from_collections(&references, &candidates).build(&assignment);

    if let Some(path) = out {
        export_to_file(&report, path, format)?;
    }

    match output {
        OutputFormat::Pretty => print_pretty_match(&term, &report, out),
        OutputFormat::Json => {
            let stdout = std::io::stdout();
            export_json(&report, stdout.lock()).map_err(|e| ReportError::Write(e.to_string()))?;
            println!();
        }
    }

    Ok(())
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Creative Match").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_pretty_hash(term: &Term, result: &BatchResult, out: &Path) {
    term.write_line(&format!("{} Fingerprinting Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images fingerprinted in {:.1}s",
        style(result.processed()).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} skipped",
        style(result.skipped.len()).yellow()
    ))
    .ok();

    for skipped in &result.skipped {
        term.write_line(&format!(
            "    {} {} {}",
            style("✗").red(),
            skipped.identifier,
            style(&skipped.reason).dim()
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  Hash file written to {}",
        style(out.display()).bold()
    ))
    .ok();
}

fn print_pretty_match(term: &Term, report: &MatchReport, out: Option<&Path>) {
    let summary = &report.summary;

    term.write_line(&format!("{} Matching Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} references, {} candidates, threshold {}",
        style(summary.references).cyan(),
        style(summary.candidates).cyan(),
        summary.threshold
    ))
    .ok();
    term.write_line(&format!("  {} matched", style(summary.matched).green()))
        .ok();
    term.write_line(&format!(
        "  {} unmatched references",
        style(summary.unmatched_references).yellow()
    ))
    .ok();
    term.write_line(&format!(
        "  {} unmatched candidates",
        style(summary.unmatched_candidates).yellow()
    ))
    .ok();
    term.write_line("").ok();

    let ghosts: Vec<_> = report.ghosts().collect();
    if ghosts.is_empty() {
        term.write_line(&format!(
            "  {} Every reference creative has a counterpart",
            style("✓").green()
        ))
        .ok();
    } else {
        term.write_line(&format!("{}", style("Ghost Files:").bold().underlined()))
            .ok();
        for ghost in ghosts {
            let location = ghost.location.as_deref().unwrap_or("");
            term.write_line(&format!(
                "  {} {} {}",
                style("○").dim(),
                ghost.name,
                style(location).dim()
            ))
            .ok();
        }
    }

    for error in &report.errors {
        term.write_line(&format!("  {} {}", style("!").red(), error)).ok();
    }

    if let Some(path) = out {
        term.write_line("").ok();
        term.write_line(&format!("  Report written to {}", style(path.display()).bold()))
            .ok();
    }
}
