//! Streaming annotation of alignment files.
//!
//! [`AnnotationDriver`] reads records in order, keeps the reference of the
//! current target cached, hands mapped records to an optional [`Realigner`]
//! and, when counting is enabled, classifies them in per-target batches.
//! Every record is written to a [`RecordSink`] in input order.

pub mod driver;

pub use driver::{
    AnnotationDriver, BoxError, DiscardSink, DriverConfig, DriverError, QualityMode,
    RealignOptions, Realigner, RecordOutcome, RecordSink, ReferenceProvider, DEFAULT_BATCH_SIZE,
};
