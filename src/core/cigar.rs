//! Alignment operations (CIGAR) and their compact textual form.
//!
//! Operations arrive either packed, as in the BAM binary encoding
//! (`run_length << 4 | code`), or as `noodles` ops from a decoded record.
//! Both are turned into [`CigarOp`] values here so the walker never sees raw
//! bit patterns.

use std::fmt;
use std::str::FromStr;

use noodles::sam::alignment::record::cigar::op::{Kind, Op};
use thiserror::Error;

/// Bit offset of the run length within a packed operation
pub const OP_LEN_SHIFT: u32 = 4;

/// Mask selecting the operation code from a packed operation
pub const OP_CODE_MASK: u32 = 0xf;

/// Operation symbols indexed by operation code
const OP_SYMBOLS: &[u8; 9] = b"MIDNSHP=X";

/// Symbol rendered for operation codes outside the known alphabet
pub const UNKNOWN_OP_SYMBOL: char = '?';

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseCigarError {
    #[error("Invalid CIGAR operation '{0}'")]
    InvalidOperation(char),

    #[error("Missing run length before operation '{0}'")]
    MissingLength(char),

    #[error("Invalid run length: {0}")]
    InvalidLength(String),

    #[error("Trailing run length without operation: {0}")]
    TrailingLength(String),
}

/// Kind of an alignment operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `M`: alignment match, bases may or may not be identical
    Match,
    /// `I`: bases present in the read only
    Insertion,
    /// `D`: bases present in the reference only
    Deletion,
    /// `N`: skipped reference region (e.g. an intron)
    Skip,
    /// `S`: read bases present in the record but not aligned
    SoftClip,
    /// `H`: read bases absent from the record
    HardClip,
    /// `P`: silent deletion from a padded reference
    Pad,
    /// `=`: alignment match, bases identical
    SequenceMatch,
    /// `X`: alignment match, bases differ
    SequenceMismatch,
    /// Operation code outside the known alphabet (9..=15)
    Unknown(u8),
}

impl OpKind {
    /// Decode an operation code. Never fails: unassigned codes become `Unknown`.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Match,
            1 => Self::Insertion,
            2 => Self::Deletion,
            3 => Self::Skip,
            4 => Self::SoftClip,
            5 => Self::HardClip,
            6 => Self::Pad,
            7 => Self::SequenceMatch,
            8 => Self::SequenceMismatch,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Match => 0,
            Self::Insertion => 1,
            Self::Deletion => 2,
            Self::Skip => 3,
            Self::SoftClip => 4,
            Self::HardClip => 5,
            Self::Pad => 6,
            Self::SequenceMatch => 7,
            Self::SequenceMismatch => 8,
            Self::Unknown(code) => code,
        }
    }

    #[must_use]
    pub fn symbol(self) -> char {
        OP_SYMBOLS
            .get(usize::from(self.code()))
            .map_or(UNKNOWN_OP_SYMBOL, |&b| char::from(b))
    }

    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let code = OP_SYMBOLS.iter().position(|&b| char::from(b) == symbol)?;
        #[allow(clippy::cast_possible_truncation)] // At most 8
        Some(Self::from_code(code as u8))
    }

    /// Whether the operation advances the reference coordinate
    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Deletion | Self::Skip | Self::SequenceMatch | Self::SequenceMismatch
        )
    }

    /// Whether the operation advances the read (query) coordinate
    #[must_use]
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Insertion
                | Self::SoftClip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }
}

impl From<Kind> for OpKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Match => Self::Match,
            Kind::Insertion => Self::Insertion,
            Kind::Deletion => Self::Deletion,
            Kind::Skip => Self::Skip,
            Kind::SoftClip => Self::SoftClip,
            Kind::HardClip => Self::HardClip,
            Kind::Pad => Self::Pad,
            Kind::SequenceMatch => Self::SequenceMatch,
            Kind::SequenceMismatch => Self::SequenceMismatch,
        }
    }
}

/// A single (kind, run length) alignment operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    pub kind: OpKind,
    pub len: usize,
}

impl CigarOp {
    #[must_use]
    pub fn new(kind: OpKind, len: usize) -> Self {
        Self { kind, len }
    }

    /// Decode one packed operation (`run_length << 4 | code`)
    #[must_use]
    pub fn from_packed(packed: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)] // Masked to 4 bits
        let code = (packed & OP_CODE_MASK) as u8;
        Self {
            kind: OpKind::from_code(code),
            len: (packed >> OP_LEN_SHIFT) as usize,
        }
    }
}

impl From<&Op> for CigarOp {
    fn from(op: &Op) -> Self {
        Self::new(OpKind::from(op.kind()), op.len())
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.symbol())
    }
}

/// Decode a packed operation sequence
#[must_use]
pub fn decode(packed: &[u32]) -> Vec<CigarOp> {
    packed.iter().copied().map(CigarOp::from_packed).collect()
}

/// Render operations as `<run-length><symbol>` concatenated in order.
///
/// Diagnostic only; an empty sequence renders as an empty string.
#[must_use]
pub fn render(ops: &[CigarOp]) -> String {
    ops.iter().map(ToString::to_string).collect()
}

/// An ordered sequence of alignment operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar(Vec<CigarOp>);

impl Cigar {
    #[must_use]
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self(ops)
    }

    #[must_use]
    pub fn from_packed(packed: &[u32]) -> Self {
        Self(decode(packed))
    }

    #[must_use]
    pub fn ops(&self) -> &[CigarOp] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of reference bases spanned by the alignment
    #[must_use]
    pub fn reference_length(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len as u64)
            .sum()
    }

    /// Number of read bases described by the operations (the read length)
    #[must_use]
    pub fn query_length(&self) -> usize {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_query())
            .map(|op| op.len)
            .sum()
    }
}

impl From<Vec<CigarOp>> for Cigar {
    fn from(ops: Vec<CigarOp>) -> Self {
        Self(ops)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.0 {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = ParseCigarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // SAM uses '*' for an absent CIGAR
        if s == "*" {
            return Ok(Self::default());
        }

        let mut ops = Vec::new();
        let mut digits = String::new();

        for ch in s.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }

            let kind = OpKind::from_symbol(ch).ok_or(ParseCigarError::InvalidOperation(ch))?;
            if digits.is_empty() {
                return Err(ParseCigarError::MissingLength(ch));
            }
            let len = digits
                .parse()
                .map_err(|_| ParseCigarError::InvalidLength(digits.clone()))?;
            digits.clear();

            ops.push(CigarOp::new(kind, len));
        }

        if !digits.is_empty() {
            return Err(ParseCigarError::TrailingLength(digits));
        }

        Ok(Self(ops))
    }
}
