//! Readers and writers for the files the tool consumes.
//!
//! - **SAM/BAM files**: streamed as a header plus [`noodles`] record buffers,
//!   and written back out unchanged
//! - **FASTA files**: reference sequences by target name, through a `.fai`
//!   index when present
//!
//! ## Example
//!
//! ```rust,no_run
//! use alnqual::parsing::{alignment, fasta::FastaReferenceProvider};
//! use std::path::Path;
//!
//! let input = alignment::open(Path::new("sample.bam")).unwrap();
//! let mut reference = FastaReferenceProvider::open(Path::new("ref.fa")).unwrap();
//!
//! let (name, _) = input.header.reference_sequences().first().unwrap();
//! let slice = reference.sequence(&name.to_string()).unwrap();
//! println!("{} has {} bases", slice.name(), slice.len());
//! ```

pub mod alignment;
pub mod fasta;

pub use alignment::ParseError;
