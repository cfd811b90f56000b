//! CIGAR-driven classification of aligned bases.
//!
//! The walker steps through a record's operations with two cursors, one on
//! the reference and one on the read, and classifies every aligned read base
//! as a match, mismatch or insertion and every deleted reference base as a
//! deletion. Read bases below the quality threshold are stepped over without
//! being classified. Deletions have no read-side quality and are always
//! counted.
//!
//! Soft clips, hard clips, padding and unknown codes are logged and ignored
//! without moving either cursor, unless soft clips are configured to advance
//! the query. Reference bases are compared byte for byte.

use thiserror::Error;
use tracing::warn;

use crate::core::cigar::{CigarOp, OpKind};
use crate::core::record::AlignmentRecord;
use crate::core::reference::ReferenceSlice;
use crate::core::types::ClassificationCounters;

/// Default minimum base quality for a read base to be classified
pub const DEFAULT_MIN_BASE_QUALITY: u8 = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("No reference sequence available for read {read}")]
    MissingReference { read: String },

    #[error(
        "Inconsistent alignment for read {read} (CIGAR {cigar}): walk ended at {actual}, expected {expected}"
    )]
    InconsistentAlignment {
        read: String,
        cigar: String,
        expected: u64,
        actual: u64,
    },

    #[error("Unrecognized CIGAR operation code {code} in {cigar} for read {read}")]
    UnrecognizedOperation { read: String, cigar: String, code: u8 },

    #[error(
        "Read {read} (CIGAR {cigar}) needs query position {position} but has only {len} bases"
    )]
    QueryOutOfRange {
        read: String,
        cigar: String,
        position: usize,
        len: usize,
    },

    #[error(
        "Read {read} (CIGAR {cigar}) reaches reference position {position} outside {target} ({start}..{end})"
    )]
    ReferenceOutOfRange {
        read: String,
        cigar: String,
        target: String,
        position: u64,
        start: u64,
        end: u64,
    },
}

/// What to do with operations the walker does not classify
/// (hard clips, padding and codes outside the known alphabet)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnrecognizedOpPolicy {
    /// Log a warning and ignore the operation
    #[default]
    Warn,
    /// Fail the record with `ClassifyError::UnrecognizedOperation`
    Reject,
}

/// Configuration for base classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountingConfig {
    /// Read bases with a quality strictly below this are not classified
    pub min_base_quality: u8,
    pub unrecognized_ops: UnrecognizedOpPolicy,
    /// Step the query cursor over soft clips instead of treating them as
    /// unrecognized operations
    pub advance_soft_clips: bool,
    /// Compare against the uppercase form of the reference so soft-masked
    /// bases can match
    pub ignore_reference_case: bool,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            min_base_quality: DEFAULT_MIN_BASE_QUALITY,
            unrecognized_ops: UnrecognizedOpPolicy::Warn,
            advance_soft_clips: false,
            ignore_reference_case: false,
        }
    }
}

/// Classifies the aligned bases of individual records.
///
/// Holds no state between calls and may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: CountingConfig,
}

impl Classifier {
    #[must_use]
    pub fn new(config: CountingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_min_base_quality(min_base_quality: u8) -> Self {
        Self::new(CountingConfig {
            min_base_quality,
            ..CountingConfig::default()
        })
    }

    #[must_use]
    pub fn config(&self) -> &CountingConfig {
        &self.config
    }

    /// Count matches, mismatches, insertions and deletions for one record.
    ///
    /// Unmapped records yield all-zero counters. A mapped record needs a
    /// non-empty reference slice for its target.
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::MissingReference` when no usable reference is
    /// given, `ClassifyError::InconsistentAlignment` when the reference span
    /// walked differs from the record's alignment end,
    /// `ClassifyError::UnrecognizedOperation` for unclassifiable operations
    /// under `UnrecognizedOpPolicy::Reject`, and
    /// `ClassifyError::QueryOutOfRange` / `ClassifyError::ReferenceOutOfRange`
    /// when the operations run past the read or the reference slice.
    pub fn classify(
        &self,
        record: &AlignmentRecord,
        reference: Option<&ReferenceSlice>,
    ) -> Result<ClassificationCounters, ClassifyError> {
        if !record.is_mapped() {
            return Ok(ClassificationCounters::default());
        }

        let reference = reference
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ClassifyError::MissingReference {
                read: record.name.clone(),
            })?;

        let mut walk = Walk::new(record, reference, &self.config);
        for op in record.cigar.ops() {
            walk.step(op)?;
        }
        walk.finish()
    }
}

/// Cursor state for a single record
struct Walk<'a> {
    record: &'a AlignmentRecord,
    reference: &'a ReferenceSlice,
    config: &'a CountingConfig,
    /// Number of read bases addressable by the query cursor
    query_len: usize,
    ref_pos: u64,
    query_pos: usize,
    counters: ClassificationCounters,
}

impl<'a> Walk<'a> {
    fn new(
        record: &'a AlignmentRecord,
        reference: &'a ReferenceSlice,
        config: &'a CountingConfig,
    ) -> Self {
        let query_len = if record.has_qualities() {
            record.bases.len().min(record.qualities.len())
        } else {
            record.bases.len()
        };

        Self {
            record,
            reference,
            config,
            query_len,
            ref_pos: record.position,
            query_pos: 0,
            counters: ClassificationCounters::default(),
        }
    }

    fn step(&mut self, op: &CigarOp) -> Result<(), ClassifyError> {
        match op.kind {
            OpKind::Match | OpKind::SequenceMatch | OpKind::SequenceMismatch => {
                self.aligned(op)?;
            }
            OpKind::Insertion => self.insertion(op.len)?,
            OpKind::Deletion => {
                self.counters.deletions += op.len as u64;
                self.ref_pos += op.len as u64;
            }
            OpKind::Skip => self.ref_pos += op.len as u64,
            OpKind::SoftClip if self.config.advance_soft_clips => self.query_pos += op.len,
            OpKind::SoftClip | OpKind::HardClip | OpKind::Pad | OpKind::Unknown(_) => {
                self.unrecognized(op)?;
            }
        }
        Ok(())
    }

    fn aligned(&mut self, op: &CigarOp) -> Result<(), ClassifyError> {
        for _ in 0..op.len {
            if self.passes_quality()? {
                let mut ref_base = self
                    .reference
                    .base_at(self.ref_pos)
                    .ok_or_else(|| self.reference_out_of_range())?;
                if self.config.ignore_reference_case {
                    ref_base = ref_base.to_ascii_uppercase();
                }
                let read_base = self.record.bases[self.query_pos];

                if op.kind == OpKind::SequenceMismatch || !read_base.matches_reference(ref_base) {
                    self.counters.mismatches += 1;
                } else {
                    self.counters.matches += 1;
                }
            }
            self.query_pos += 1;
            self.ref_pos += 1;
        }
        Ok(())
    }

    fn insertion(&mut self, len: usize) -> Result<(), ClassifyError> {
        for _ in 0..len {
            if self.passes_quality()? {
                self.counters.insertions += 1;
            }
            self.query_pos += 1;
        }
        Ok(())
    }

    fn unrecognized(&self, op: &CigarOp) -> Result<(), ClassifyError> {
        match self.config.unrecognized_ops {
            UnrecognizedOpPolicy::Warn => {
                warn!(
                    read = %self.record.name,
                    cigar = %self.record.cigar,
                    op = op.kind.code(),
                    "Unknown op in CIGAR, ignoring"
                );
                Ok(())
            }
            UnrecognizedOpPolicy::Reject => Err(ClassifyError::UnrecognizedOperation {
                read: self.record.name.clone(),
                cigar: self.record.cigar.to_string(),
                code: op.kind.code(),
            }),
        }
    }

    /// Whether the base under the query cursor reaches the quality threshold.
    /// Records without qualities pass every base.
    fn passes_quality(&self) -> Result<bool, ClassifyError> {
        if self.query_pos >= self.query_len {
            return Err(ClassifyError::QueryOutOfRange {
                read: self.record.name.clone(),
                cigar: self.record.cigar.to_string(),
                position: self.query_pos,
                len: self.query_len,
            });
        }

        Ok(self
            .record
            .qualities
            .get(self.query_pos)
            .map_or(true, |&q| q >= self.config.min_base_quality))
    }

    fn reference_out_of_range(&self) -> ClassifyError {
        ClassifyError::ReferenceOutOfRange {
            read: self.record.name.clone(),
            cigar: self.record.cigar.to_string(),
            target: self.reference.name().to_string(),
            position: self.ref_pos,
            start: self.reference.offset(),
            end: self.reference.end(),
        }
    }

    fn finish(self) -> Result<ClassificationCounters, ClassifyError> {
        let expected = self.record.alignment_end();
        if self.ref_pos != expected {
            return Err(ClassifyError::InconsistentAlignment {
                read: self.record.name.clone(),
                cigar: self.record.cigar.to_string(),
                expected,
                actual: self.ref_pos,
            });
        }
        Ok(self.counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::base;
    use crate::core::cigar::Cigar;

    const QUAL: u8 = 30;

    fn record(position: u64, cigar: &str, seq: &str, quals: &[u8]) -> AlignmentRecord {
        let cigar: Cigar = cigar.parse().unwrap();
        AlignmentRecord::new(
            "read1",
            0,
            position,
            cigar,
            base::from_ascii_sequence(seq.as_bytes()),
            quals.to_vec(),
        )
    }

    /// Reference with `prefix_len` filler bases followed by `body`
    fn reference(prefix_len: usize, body: &str) -> ReferenceSlice {
        let mut bases = vec![b'N'; prefix_len];
        bases.extend_from_slice(body.as_bytes());
        ReferenceSlice::new("chr1", bases)
    }

    #[test]
    fn test_zero_operations_count_nothing() {
        let rec = record(5, "*", "", &[]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "ACGTACGTAC")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::default());
    }

    #[test]
    fn test_all_matching_bases() {
        let rec = record(2, "8M", "GTACGTAC", &[QUAL; 8]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "ACGTACGTACGT")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(8, 0, 0, 0));
    }

    #[test]
    fn test_match_deletion_match() {
        // Positions 100..105 and 107..112 match the read; 105..107 are deleted
        let rec = record(100, "5M2D5M", "ACGTACCTTA", &[QUAL; 10]);
        let reference = reference(100, "ACGTAGGCCTTAAAAA");

        let counters = Classifier::default().classify(&rec, Some(&reference)).unwrap();
        assert_eq!(counters, ClassificationCounters::new(10, 0, 0, 2));
        assert_eq!(rec.alignment_end(), 112);
    }

    #[test]
    fn test_mismatch_and_filtered_insertion() {
        // Second base G mismatches reference C; second inserted base has low quality
        let rec = record(0, "3M2I3M", "AGTCCTTT", &[QUAL, QUAL, QUAL, QUAL, 2, QUAL, QUAL, QUAL]);
        let classifier = Classifier::with_min_base_quality(10);

        let counters = classifier
            .classify(&rec, Some(&reference(0, "ACTTTT")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(5, 1, 1, 0));
    }

    #[test]
    fn test_threshold_above_all_qualities_drops_matches() {
        let rec = record(0, "6M", "ACGTAC", &[20; 6]);
        let reference = reference(0, "ACGTAC");

        let counters = Classifier::with_min_base_quality(21)
            .classify(&rec, Some(&reference))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::default());
    }

    #[test]
    fn test_quality_threshold_is_inclusive() {
        let rec = record(0, "4M", "ACGT", &[9, 10, 11, 10]);
        let counters = Classifier::with_min_base_quality(10)
            .classify(&rec, Some(&reference(0, "ACGT")))
            .unwrap();
        assert_eq!(counters.matches, 3);
    }

    #[test]
    fn test_low_quality_base_still_advances_both_cursors() {
        // If the filtered base did not advance the cursors, the remaining bases
        // would be compared one position off and mismatch.
        let rec = record(0, "4M", "ACGT", &[QUAL, 0, QUAL, QUAL]);
        let counters = Classifier::with_min_base_quality(10)
            .classify(&rec, Some(&reference(0, "ACGT")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(3, 0, 0, 0));
    }

    #[test]
    fn test_deletions_ignore_quality() {
        let rec = record(0, "2M4D2M", "ACAC", &[0; 4]);
        let counters = Classifier::with_min_base_quality(60)
            .classify(&rec, Some(&reference(0, "ACGTACAC")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(0, 0, 0, 4));
    }

    #[test]
    fn test_reference_skip_counts_nothing() {
        let rec = record(0, "3M100N3M", "ACGTTT", &[QUAL; 6]);
        let mut body = "ACG".to_string();
        body.push_str(&"N".repeat(100));
        body.push_str("TTT");

        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, &body)))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(6, 0, 0, 0));
        assert_eq!(rec.alignment_end(), 106);
    }

    #[test]
    fn test_explicit_mismatch_always_counts_as_mismatch() {
        let rec = record(0, "2=1X2=", "ACGTA", &[QUAL; 5]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "ACGTA")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(4, 1, 0, 0));
    }

    #[test]
    fn test_soft_clip_is_ignored_without_moving_query() {
        // The clipped bases TT are compared against ACG along with the first A
        let rec = record(0, "2S3M", "TTACG", &[QUAL; 5]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "ACG")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(0, 3, 0, 0));

        let strict = Classifier::new(CountingConfig {
            unrecognized_ops: UnrecognizedOpPolicy::Reject,
            ..CountingConfig::default()
        });
        assert!(matches!(
            strict.classify(&rec, Some(&reference(0, "ACG"))),
            Err(ClassifyError::UnrecognizedOperation { code: 4, .. })
        ));
    }

    #[test]
    fn test_soft_clip_advances_query_when_configured() {
        let rec = record(0, "2S3M1S", "TTACGT", &[QUAL; 6]);
        let classifier = Classifier::new(CountingConfig {
            advance_soft_clips: true,
            unrecognized_ops: UnrecognizedOpPolicy::Reject,
            ..CountingConfig::default()
        });
        let counters = classifier.classify(&rec, Some(&reference(0, "ACG"))).unwrap();
        assert_eq!(counters, ClassificationCounters::new(3, 0, 0, 0));
    }

    #[test]
    fn test_hard_clip_is_ignored_with_warning() {
        let rec = record(0, "5H3M", "ACG", &[QUAL; 3]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "ACG")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(3, 0, 0, 0));
    }

    #[test]
    fn test_unknown_operation_policy() {
        let cigar = Cigar::from_packed(&[(3 << 4), (1 << 4) | 11]);
        let rec = AlignmentRecord::new(
            "odd",
            0,
            0,
            cigar,
            base::from_ascii_sequence(b"ACG"),
            vec![QUAL; 3],
        );
        let reference = reference(0, "ACG");

        let counters = Classifier::default().classify(&rec, Some(&reference)).unwrap();
        assert_eq!(counters.matches, 3);

        let strict = Classifier::new(CountingConfig {
            unrecognized_ops: UnrecognizedOpPolicy::Reject,
            ..CountingConfig::default()
        });
        assert_eq!(
            strict.classify(&rec, Some(&reference)),
            Err(ClassifyError::UnrecognizedOperation {
                read: "odd".to_string(),
                cigar: "3M1?".to_string(),
                code: 11,
            })
        );
    }

    #[test]
    fn test_inconsistent_alignment_end_is_an_error() {
        let rec = record(0, "4M", "ACGT", &[QUAL; 4]).with_alignment_end(10);
        let result = Classifier::default().classify(&rec, Some(&reference(0, "ACGTACGTACGT")));
        assert_eq!(
            result,
            Err(ClassifyError::InconsistentAlignment {
                read: "read1".to_string(),
                cigar: "4M".to_string(),
                expected: 10,
                actual: 4,
            })
        );
    }

    #[test]
    fn test_missing_reference() {
        let rec = record(0, "4M", "ACGT", &[QUAL; 4]);
        let classifier = Classifier::default();

        assert!(matches!(
            classifier.classify(&rec, None),
            Err(ClassifyError::MissingReference { .. })
        ));
        let empty = ReferenceSlice::new("chr1", Vec::new());
        assert!(matches!(
            classifier.classify(&rec, Some(&empty)),
            Err(ClassifyError::MissingReference { .. })
        ));
    }

    #[test]
    fn test_unmapped_record_counts_nothing_without_reference() {
        let rec = AlignmentRecord::unmapped("u", base::from_ascii_sequence(b"ACGT"), vec![QUAL; 4]);
        assert_eq!(
            Classifier::default().classify(&rec, None),
            Ok(ClassificationCounters::default())
        );
    }

    #[test]
    fn test_cigar_longer_than_read() {
        let rec = record(0, "6M", "ACGT", &[QUAL; 4]);
        let result = Classifier::default().classify(&rec, Some(&reference(0, "ACGTAC")));
        assert!(matches!(
            result,
            Err(ClassifyError::QueryOutOfRange {
                position: 4,
                len: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_alignment_past_reference_end() {
        let rec = record(3, "4M", "TACG", &[QUAL; 4]);
        let result = Classifier::default().classify(&rec, Some(&reference(0, "ACGTA")));
        assert!(matches!(
            result,
            Err(ClassifyError::ReferenceOutOfRange {
                position: 5,
                end: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_qualities_classify_every_base() {
        let rec = record(0, "4M", "ACGA", &[]);
        let counters = Classifier::with_min_base_quality(60)
            .classify(&rec, Some(&reference(0, "ACGT")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(3, 1, 0, 0));
    }

    #[test]
    fn test_soft_masked_reference_mismatches_by_default() {
        let rec = record(0, "4M", "ACGT", &[QUAL; 4]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "acgt")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(0, 4, 0, 0));
    }

    #[test]
    fn test_soft_masked_reference_matches_when_ignoring_case() {
        let rec = record(0, "4M", "ACGT", &[QUAL; 4]);
        let classifier = Classifier::new(CountingConfig {
            ignore_reference_case: true,
            ..CountingConfig::default()
        });
        let counters = classifier
            .classify(&rec, Some(&reference(0, "acgA")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(3, 1, 0, 0));
    }

    #[test]
    fn test_read_equals_base_is_compared_like_any_other() {
        let rec = record(0, "3M", "A=T", &[QUAL; 3]);
        let counters = Classifier::default()
            .classify(&rec, Some(&reference(0, "ACT")))
            .unwrap();
        assert_eq!(counters, ClassificationCounters::new(2, 1, 0, 0));
    }

    #[test]
    fn test_reference_slice_with_offset() {
        let rec = record(1000, "2M1I2M", "ACTGT", &[QUAL; 5]);
        let slice = ReferenceSlice::new("chr1", b"ACGT".to_vec()).with_offset(1000);
        let counters = Classifier::default().classify(&rec, Some(&slice)).unwrap();
        assert_eq!(counters, ClassificationCounters::new(4, 0, 1, 0));
    }
}
