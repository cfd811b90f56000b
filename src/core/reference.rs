/// A contiguous span of reference bases for one target sequence.
///
/// Coordinates are 0-based and absolute on the target: a slice fetched from
/// `offset` covers `offset..offset + len`. Whole-target fetches have offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSlice {
    name: String,
    offset: u64,
    bases: Vec<u8>,
}

impl ReferenceSlice {
    /// Slice covering a whole target sequence
    #[must_use]
    pub fn new(name: impl Into<String>, bases: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            offset: 0,
            bases,
        }
    }

    /// Slice covering part of a target, starting at `offset`
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Name of the target sequence
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// First coordinate past the end of the slice
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.bases.len() as u64
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Base at an absolute 0-based target coordinate
    #[must_use]
    pub fn base_at(&self, position: u64) -> Option<u8> {
        let index = usize::try_from(position.checked_sub(self.offset)?).ok()?;
        self.bases.get(index).copied()
    }
}
