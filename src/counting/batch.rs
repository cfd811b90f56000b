use rayon::prelude::*;

use crate::core::record::AlignmentRecord;
use crate::core::reference::ReferenceSlice;
use crate::core::types::ClassificationCounters;
use crate::counting::walker::{ClassifyError, Classifier};

/// Classify many records against one shared reference slice.
///
/// Records are classified in parallel on the current rayon pool; results come
/// back in input order, one per record.
#[must_use]
pub fn classify_batch(
    classifier: &Classifier,
    records: &[AlignmentRecord],
    reference: Option<&ReferenceSlice>,
) -> Vec<Result<ClassificationCounters, ClassifyError>> {
    records
        .par_iter()
        .map(|record| classifier.classify(record, reference))
        .collect()
}
