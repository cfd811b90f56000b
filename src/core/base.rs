//! Read bases as typed nucleotide codes.
//!
//! BAM packs two bases per byte using the 4-bit IUPAC alphabet
//! `=ACMGRSVTWYHKDBN`. [`Base`] names each code so comparisons against the
//! reference never operate on raw nibbles.

/// 4-bit nucleotide alphabet indexed by code
const NT16_SYMBOLS: &[u8; 16] = b"=ACMGRSVTWYHKDBN";

/// A single read base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Base {
    /// `=`: identical to the reference base
    Eq = 0,
    A = 1,
    C = 2,
    M = 3,
    G = 4,
    R = 5,
    S = 6,
    V = 7,
    T = 8,
    W = 9,
    Y = 10,
    H = 11,
    K = 12,
    D = 13,
    B = 14,
    N = 15,
}

const ALL_BASES: [Base; 16] = [
    Base::Eq,
    Base::A,
    Base::C,
    Base::M,
    Base::G,
    Base::R,
    Base::S,
    Base::V,
    Base::T,
    Base::W,
    Base::Y,
    Base::H,
    Base::K,
    Base::D,
    Base::B,
    Base::N,
];

impl Base {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode an ASCII base, case-insensitively. Anything outside the IUPAC
    /// alphabet becomes `N`.
    #[must_use]
    pub fn from_ascii(symbol: u8) -> Self {
        let upper = symbol.to_ascii_uppercase();
        NT16_SYMBOLS
            .iter()
            .position(|&s| s == upper)
            .map_or(Self::N, |i| ALL_BASES[i])
    }

    #[must_use]
    pub fn as_ascii(self) -> u8 {
        NT16_SYMBOLS[usize::from(self.code())]
    }

    /// Whether this read base is the same byte as a reference base.
    ///
    /// The comparison is exact: a lowercase reference base never matches, and
    /// `=` is compared as the literal byte.
    #[must_use]
    pub fn matches_reference(self, reference: u8) -> bool {
        self.as_ascii() == reference
    }
}

impl From<Base> for char {
    fn from(base: Base) -> Self {
        char::from(base.as_ascii())
    }
}

/// Decode an ASCII sequence
#[must_use]
pub fn from_ascii_sequence(sequence: &[u8]) -> Vec<Base> {
    sequence.iter().copied().map(Base::from_ascii).collect()
}
