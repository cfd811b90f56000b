//! Command-line interface for alnqual.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **count**: Classify aligned bases as matches, mismatches, insertions and
//!   deletions against the reference
//!
//! ## Usage
//!
//! ```text
//! # Totals for a BAM file
//! alnqual count sample.bam ref.fa
//!
//! # Pipe from samtools
//! samtools view -h sample.bam | alnqual count - ref.fa
//!
//! # Per-read counts as TSV, with a stricter quality threshold
//! alnqual count sample.bam ref.fa --per-read --min-base-quality 20 --format tsv
//!
//! # Pass the records through to a new file while counting
//! alnqual count sample.bam ref.fa --output copy.bam --format json
//! ```

use clap::{Parser, Subcommand};

pub mod count;

#[derive(Parser)]
#[command(name = "alnqual")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Classify aligned bases of SAM/BAM reads against a reference")]
#[command(
    long_about = "alnqual walks the CIGAR of every mapped read and compares it with the reference.\n\nFor each read it counts:\n- Matches and mismatches of aligned bases that pass the base-quality threshold\n- Inserted bases that pass the threshold\n- Deleted reference bases"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count matches, mismatches, insertions and deletions in a SAM/BAM file
    Count(count::CountArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
