//! Base classification for aligned reads.
//!
//! - [`walker`]: the CIGAR walker that counts matches, mismatches,
//!   insertions and deletions for a single record
//! - [`batch`]: order-preserving parallel classification of many records
//!   against one reference slice
//!
//! ## Example
//!
//! ```rust
//! use alnqual::core::{base, AlignmentRecord, Cigar, ReferenceSlice};
//! use alnqual::counting::Classifier;
//!
//! let cigar: Cigar = "5M2D5M".parse().unwrap();
//! let record = AlignmentRecord::new(
//!     "read1",
//!     0,
//!     2,
//!     cigar,
//!     base::from_ascii_sequence(b"ACGTACCTTA"),
//!     vec![30; 10],
//! );
//! let reference = ReferenceSlice::new("chr1", b"NNACGTAGGCCTTA".to_vec());
//!
//! let counters = Classifier::default()
//!     .classify(&record, Some(&reference))
//!     .unwrap();
//! assert_eq!(counters.matches, 10);
//! assert_eq!(counters.deletions, 2);
//! ```

pub mod batch;
pub mod walker;

pub use batch::classify_batch;
pub use walker::{
    ClassifyError, Classifier, CountingConfig, UnrecognizedOpPolicy, DEFAULT_MIN_BASE_QUALITY,
};
