use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Per-read base classification counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounters {
    #[serde(rename = "match")]
    pub matches: u64,
    #[serde(rename = "mismatch")]
    pub mismatches: u64,
    #[serde(rename = "insertion")]
    pub insertions: u64,
    #[serde(rename = "deletion")]
    pub deletions: u64,
}

impl ClassificationCounters {
    #[must_use]
    pub fn new(matches: u64, mismatches: u64, insertions: u64, deletions: u64) -> Self {
        Self {
            matches,
            mismatches,
            insertions,
            deletions,
        }
    }

    /// Total number of classified positions
    #[must_use]
    pub fn total(&self) -> u64 {
        self.matches + self.mismatches + self.insertions + self.deletions
    }

    /// Fraction of classified positions that are not matches
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            (total - self.matches) as f64 / total as f64
        }
    }
}

impl AddAssign for ClassificationCounters {
    fn add_assign(&mut self, other: Self) {
        self.matches += other.matches;
        self.mismatches += other.mismatches;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

/// Totals accumulated over one pass of the annotation driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records read (and written)
    pub records: u64,
    pub mapped: u64,
    pub unmapped: u64,
    /// Mapped records whose classification succeeded
    pub classified: u64,
    /// Mapped records whose classification failed and were skipped
    pub skipped: u64,
    /// Records handed to the realigner
    pub realigned: u64,
    /// Number of reference sequences fetched
    pub reference_loads: u64,
    /// Sum of the counters of all classified records
    pub counters: ClassificationCounters,
}
