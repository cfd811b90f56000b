use noodles::core::Position;
use noodles::sam::alignment::RecordBuf;

use crate::core::base::{self, Base};
use crate::core::cigar::{Cigar, CigarOp};

/// One read, reduced to what the alignment walker needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    /// Read name, `*` when the record has none
    pub name: String,

    /// Target sequence index, `None` for unmapped reads
    pub target: Option<usize>,

    /// 0-based leftmost reference position
    pub position: u64,

    pub cigar: Cigar,

    pub bases: Vec<Base>,

    /// Per-base qualities; empty when the record carries none
    pub qualities: Vec<u8>,

    /// Declared exclusive end of the alignment on the reference
    alignment_end: u64,
}

impl AlignmentRecord {
    /// Build a mapped record. The alignment end is derived from the CIGAR.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        target: usize,
        position: u64,
        cigar: Cigar,
        bases: Vec<Base>,
        qualities: Vec<u8>,
    ) -> Self {
        let alignment_end = position + cigar.reference_length();
        Self {
            name: name.into(),
            target: Some(target),
            position,
            cigar,
            bases,
            qualities,
            alignment_end,
        }
    }

    #[must_use]
    pub fn unmapped(name: impl Into<String>, bases: Vec<Base>, qualities: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            target: None,
            position: 0,
            cigar: Cigar::default(),
            bases,
            qualities,
            alignment_end: 0,
        }
    }

    /// Override the alignment end with one declared by the upstream source
    #[must_use]
    pub fn with_alignment_end(mut self, alignment_end: u64) -> Self {
        self.alignment_end = alignment_end;
        self
    }

    /// Convert a decoded `noodles` record.
    ///
    /// Records flagged unmapped, or lacking a reference or start position,
    /// become unmapped records.
    #[must_use]
    pub fn from_record_buf(record: &RecordBuf) -> Self {
        let name = record
            .name()
            .map_or_else(|| "*".to_string(), ToString::to_string);
        let bases = base::from_ascii_sequence(record.sequence().as_ref());
        let qualities = record.quality_scores().as_ref().to_vec();

        match placement(record) {
            Some((target, start)) => {
                let cigar: Cigar = record
                    .cigar()
                    .as_ref()
                    .iter()
                    .map(CigarOp::from)
                    .collect::<Vec<_>>()
                    .into();
                // noodles positions are 1-based
                let position = (usize::from(start) - 1) as u64;
                Self::new(name, target, position, cigar, bases, qualities)
            }
            None => Self::unmapped(name, bases, qualities),
        }
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.target.is_some()
    }

    /// Exclusive end of the alignment on the reference
    #[must_use]
    pub fn alignment_end(&self) -> u64 {
        self.alignment_end
    }

    /// Whether the qualities are missing (SAM `*`)
    #[must_use]
    pub fn has_qualities(&self) -> bool {
        !self.qualities.is_empty()
    }
}

/// Target index and 1-based start of a mapped record
#[must_use]
pub fn placement(record: &RecordBuf) -> Option<(usize, Position)> {
    if record.flags().is_unmapped() {
        return None;
    }
    record
        .reference_sequence_id()
        .zip(record.alignment_start())
}
