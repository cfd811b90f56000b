//! Count command - classify every aligned base of a SAM/BAM file.
//!
//! Streams the alignments, fetches each target's reference once, and counts
//! matches, mismatches, insertions and deletions over all mapped reads.
//! Records can optionally be written back out unchanged.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::Header;
use tracing::{debug, warn};

use crate::annotate::driver::{
    AnnotationDriver, DiscardSink, DriverConfig, RecordOutcome, RecordSink, DEFAULT_BATCH_SIZE,
};
use crate::cli::OutputFormat;
use crate::core::record::AlignmentRecord;
use crate::core::types::{ClassificationCounters, RunSummary};
use crate::counting::walker::{CountingConfig, UnrecognizedOpPolicy, DEFAULT_MIN_BASE_QUALITY};
use crate::parsing::alignment::{self, AlignmentWriter};
use crate::parsing::fasta::{is_fasta_file, FastaReferenceProvider};

/// Arguments for the count command
#[derive(Args)]
pub struct CountArgs {
    /// Alignment file to classify (SAM or BAM, or - for SAM on stdin)
    #[arg(required = true)]
    pub alignments: PathBuf,

    /// Reference FASTA the reads were aligned to (.fai index used if present)
    #[arg(required = true)]
    pub reference: PathBuf,

    /// Bases below this quality are skipped in match, mismatch and insertion counts
    #[arg(short = 'q', long, default_value_t = DEFAULT_MIN_BASE_QUALITY)]
    pub min_base_quality: u8,

    /// Skip reads with hard clips, padding or unknown CIGAR operations instead
    /// of warning and ignoring the operation
    #[arg(long)]
    pub strict_cigar: bool,

    /// Step over soft-clipped bases instead of warning and ignoring the clip
    #[arg(long)]
    pub advance_soft_clips: bool,

    /// Compare bases case-insensitively, so soft-masked reference bases can match
    #[arg(long)]
    pub ignore_reference_case: bool,

    /// Report counts for every read, not just the totals
    #[arg(long)]
    pub per_read: bool,

    /// Write all records, unchanged, to this SAM/BAM file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Worker threads for classification (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Records classified together in one parallel batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

/// Classification of one read, kept for `--per-read` output
struct ReadRow {
    name: String,
    target: Option<String>,
    /// 1-based
    position: Option<u64>,
    cigar: String,
    outcome: RecordOutcome,
}

impl ReadRow {
    fn new(header: &Header, record: &RecordBuf, outcome: &RecordOutcome) -> Self {
        let read = AlignmentRecord::from_record_buf(record);
        let target = read.target.and_then(|id| {
            header
                .reference_sequences()
                .get_index(id)
                .map(|(name, _)| name.to_string())
        });
        let position = read.is_mapped().then_some(read.position + 1);

        Self {
            name: read.name,
            target,
            position,
            cigar: if read.cigar.is_empty() {
                "*".to_string()
            } else {
                read.cigar.to_string()
            },
            outcome: outcome.clone(),
        }
    }

    fn status(&self) -> &'static str {
        match self.outcome {
            RecordOutcome::Unmapped => "unmapped",
            RecordOutcome::NotClassified => "not_classified",
            RecordOutcome::Classified(_) => "classified",
            RecordOutcome::Skipped(_) => "skipped",
        }
    }

    fn counters(&self) -> ClassificationCounters {
        match self.outcome {
            RecordOutcome::Classified(counters) => counters,
            _ => ClassificationCounters::default(),
        }
    }
}

/// Execute the count command
///
/// # Errors
///
/// Returns an error if the inputs cannot be opened, a target's reference
/// sequence cannot be fetched, or the output cannot be written.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: CountArgs, format: OutputFormat) -> anyhow::Result<()> {
    if !is_fasta_file(&args.reference) {
        warn!(
            path = %args.reference.display(),
            "Reference does not have a FASTA extension, trying to read it anyway"
        );
    }

    let input = alignment::open(&args.alignments)
        .with_context(|| format!("Failed to open {}", args.alignments.display()))?;
    let provider = FastaReferenceProvider::open(&args.reference)
        .with_context(|| format!("Failed to open {}", args.reference.display()))?;

    debug!(
        path = %args.alignments.display(),
        targets = input.header.reference_sequences().len(),
        "Opened alignments"
    );
    debug!(
        path = %args.reference.display(),
        indexed = provider.is_indexed(),
        "Opened reference"
    );

    let config = DriverConfig {
        counting: Some(CountingConfig {
            min_base_quality: args.min_base_quality,
            unrecognized_ops: if args.strict_cigar {
                UnrecognizedOpPolicy::Reject
            } else {
                UnrecognizedOpPolicy::Warn
            },
            advance_soft_clips: args.advance_soft_clips,
            ignore_reference_case: args.ignore_reference_case,
        }),
        batch_size: args.batch_size,
    };
    let mut driver = AnnotationDriver::new(provider, config);

    let mut writer = args
        .output
        .as_deref()
        .map(|path| AlignmentWriter::create(path, &input.header))
        .transpose()
        .context("Failed to create output")?;
    let mut discard = DiscardSink;
    let sink: &mut dyn RecordSink = match writer.as_mut() {
        Some(writer) => writer,
        None => &mut discard,
    };

    if let Some(threads) = args.threads {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            Ok(()) => debug!(threads, "Configured classification thread pool"),
            Err(e) => warn!(error = %e, "Failed to configure thread pool, using default"),
        }
    }

    let header = &input.header;
    let mut rows = Vec::new();
    let summary = driver.run(header, input.records, sink, |record, outcome| {
        if args.per_read {
            rows.push(ReadRow::new(header, record, outcome));
        }
    })?;

    if summary.skipped > 0 {
        warn!(
            skipped = summary.skipped,
            "Some mapped records could not be classified"
        );
    }

    match format {
        OutputFormat::Text => print_text(&args, &summary, args.per_read.then_some(&rows[..])),
        OutputFormat::Json => print_json(&args, &summary, args.per_read.then_some(&rows[..]))?,
        OutputFormat::Tsv => {
            if args.per_read {
                print_tsv_rows(&rows);
            } else {
                print_tsv_summary(&summary);
            }
        }
    }

    Ok(())
}

fn print_text(args: &CountArgs, summary: &RunSummary, rows: Option<&[ReadRow]>) {
    if let Some(rows) = rows {
        for row in rows {
            let location = match (&row.target, row.position) {
                (Some(target), Some(position)) => format!("{target}:{position}"),
                _ => "*".to_string(),
            };
            let counters = row.counters();
            let detail = match &row.outcome {
                RecordOutcome::Skipped(e) => format!("  ({e})"),
                _ => String::new(),
            };
            println!(
                "{}\t{}\t{}\t{}\tM={} X={} I={} D={}{}",
                row.name,
                location,
                row.cigar,
                row.status(),
                counters.matches,
                counters.mismatches,
                counters.insertions,
                counters.deletions,
                detail
            );
        }
        println!();
    }

    print_summary(&args.alignments, &args.reference, summary);
}

fn print_summary(alignments: &Path, reference: &Path, summary: &RunSummary) {
    let counters = &summary.counters;

    println!("Alignment classification: {}", alignments.display());
    println!("   Reference:   {}", reference.display());
    println!(
        "   Records:     {} total → {} mapped, {} unmapped",
        summary.records, summary.mapped, summary.unmapped
    );
    println!(
        "   Classified:  {} ({} skipped)",
        summary.classified, summary.skipped
    );
    println!();
    println!("   Matches:     {}", counters.matches);
    println!("   Mismatches:  {}", counters.mismatches);
    println!("   Insertions:  {}", counters.insertions);
    println!("   Deletions:   {}", counters.deletions);
    println!("   Error rate:  {:.4}", counters.error_rate());
}

fn print_json(
    args: &CountArgs,
    summary: &RunSummary,
    rows: Option<&[ReadRow]>,
) -> anyhow::Result<()> {
    let mut output = serde_json::json!({
        "alignments": args.alignments.display().to_string(),
        "reference": args.reference.display().to_string(),
        "min_base_quality": args.min_base_quality,
        "summary": summary,
        "error_rate": summary.counters.error_rate(),
    });

    if let Some(rows) = rows {
        let reads: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                let mut json = serde_json::json!({
                    "name": row.name,
                    "target": row.target,
                    "position": row.position,
                    "cigar": row.cigar,
                    "status": row.status(),
                });
                match &row.outcome {
                    RecordOutcome::Classified(counters) => {
                        json["counters"] = serde_json::json!(counters);
                    }
                    RecordOutcome::Skipped(e) => {
                        json["error"] = serde_json::json!(e.to_string());
                    }
                    RecordOutcome::Unmapped | RecordOutcome::NotClassified => {}
                }
                json
            })
            .collect();
        output["reads"] = serde_json::json!(reads);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_summary(summary: &RunSummary) {
    let counters = &summary.counters;
    println!(
        "records\tmapped\tunmapped\tclassified\tskipped\tmatch\tmismatch\tinsertion\tdeletion\terror_rate"
    );
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.6}",
        summary.records,
        summary.mapped,
        summary.unmapped,
        summary.classified,
        summary.skipped,
        counters.matches,
        counters.mismatches,
        counters.insertions,
        counters.deletions,
        counters.error_rate()
    );
}

fn print_tsv_rows(rows: &[ReadRow]) {
    println!("read\ttarget\tposition\tcigar\tstatus\tmatch\tmismatch\tinsertion\tdeletion");
    for row in rows {
        let counters = row.counters();
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.name,
            row.target.as_deref().unwrap_or("*"),
            row.position.map_or_else(|| "0".to_string(), |p| p.to_string()),
            row.cigar,
            row.status(),
            counters.matches,
            counters.mismatches,
            counters.insertions,
            counters.deletions
        );
    }
}
