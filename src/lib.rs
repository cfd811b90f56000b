//! # alnqual
//!
//! A library for classifying the aligned bases of SAM/BAM reads against a
//! reference sequence.
//!
//! Every mapped read is walked along its CIGAR. Aligned bases are compared
//! with the reference and counted as matches or mismatches, inserted bases
//! are counted as insertions, and reference bases skipped by a deletion are
//! counted as deletions. Bases below a quality threshold are left out of the
//! match, mismatch and insertion counts.
//!
//! ## Features
//!
//! - **CIGAR decoding**: Packed `length << 4 | code` operations and their
//!   textual rendering, including unknown codes
//! - **Quality filtering**: Per-base threshold, applied while both cursors
//!   still advance
//! - **Streaming**: Records are read in order and each target's reference is
//!   fetched once
//! - **Parallel classification**: Batches of reads on one target are
//!   classified with rayon, results kept in input order
//! - **Realignment hook**: A [`Realigner`](annotate::Realigner) can annotate
//!   mapped records in place as they stream through
//!
//! ## Example
//!
//! ```rust,no_run
//! use alnqual::annotate::{AnnotationDriver, DiscardSink, DriverConfig};
//! use alnqual::counting::CountingConfig;
//! use alnqual::parsing::{alignment, fasta::FastaReferenceProvider};
//! use std::path::Path;
//!
//! let input = alignment::open(Path::new("sample.bam")).unwrap();
//! let provider = FastaReferenceProvider::open(Path::new("ref.fa")).unwrap();
//!
//! let config = DriverConfig {
//!     counting: Some(CountingConfig::default()),
//!     ..DriverConfig::default()
//! };
//! let mut driver = AnnotationDriver::new(provider, config);
//! let summary = driver
//!     .run(&input.header, input.records, &mut DiscardSink, |_, _| {})
//!     .unwrap();
//!
//! println!(
//!     "{} matches, {} mismatches over {} reads",
//!     summary.counters.matches, summary.counters.mismatches, summary.classified
//! );
//! ```
//!
//! ## Modules
//!
//! - [`core`]: CIGAR operations, bases, records, reference slices and counters
//! - [`counting`]: The alignment walker and batch classification
//! - [`annotate`]: Streaming driver with reference caching
//! - [`parsing`]: SAM/BAM and FASTA input/output
//! - [`cli`]: Command-line interface implementation

pub mod annotate;
pub mod cli;
pub mod core;
pub mod counting;
pub mod parsing;

// Re-export commonly used types for convenience
pub use annotate::{AnnotationDriver, DriverConfig, DriverError};
pub use core::cigar::{Cigar, CigarOp, OpKind};
pub use core::record::AlignmentRecord;
pub use core::reference::ReferenceSlice;
pub use core::types::*;
pub use counting::{Classifier, ClassifyError, CountingConfig};
