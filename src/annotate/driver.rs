use std::io;

use noodles::sam::alignment::RecordBuf;
use noodles::sam::Header;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::record::{self, AlignmentRecord};
use crate::core::reference::ReferenceSlice;
use crate::core::types::{ClassificationCounters, RunSummary};
use crate::counting::batch::classify_batch;
use crate::counting::walker::{ClassifyError, Classifier, CountingConfig};

/// Error type returned by external collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default number of records classified together in one parallel batch
pub const DEFAULT_BATCH_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Nothing to do: base and indel alignment qualities are off and counting is disabled")]
    NothingToDo,

    #[error("Record refers to target index {0}, which is not in the header")]
    UnknownTarget(usize),

    #[error("Failed to find sequence '{name}' in the reference: {source}")]
    ReferenceFetch {
        name: String,
        #[source]
        source: BoxError,
    },
}

/// Supplies reference sequences by target name
pub trait ReferenceProvider {
    /// Fetch the full sequence of a target
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be found or read.
    fn fetch(&mut self, name: &str) -> Result<ReferenceSlice, BoxError>;
}

/// Base/indel alignment-quality annotation of a record, done in place
pub trait Realigner {
    /// Annotate one mapped record against the reference of its target
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be annotated; the driver
    /// logs it and still writes the record.
    fn annotate(
        &mut self,
        record: &mut RecordBuf,
        reference: &ReferenceSlice,
        options: &RealignOptions,
    ) -> Result<(), BoxError>;
}

/// Destination for records after annotation
pub trait RecordSink {
    /// Write one record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write_record(&mut self, header: &Header, record: &RecordBuf) -> io::Result<()>;

    /// Flush any trailing output once all records are written
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be finalized.
    fn finish(&mut self, _header: &Header) -> io::Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<RecordBuf> {
    fn write_record(&mut self, _header: &Header, record: &RecordBuf) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl RecordSink for DiscardSink {
    fn write_record(&mut self, _header: &Header, _record: &RecordBuf) -> io::Result<()> {
        Ok(())
    }
}

/// Whether an alignment-quality value is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QualityMode {
    Off,
    /// Compute unless the record already carries a value
    #[default]
    Compute,
    /// Compute and overwrite any existing value
    Recompute,
}

impl QualityMode {
    #[must_use]
    pub fn is_on(self) -> bool {
        self != Self::Off
    }
}

/// Options passed through to the realigner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealignOptions {
    /// Base alignment quality (BAQ)
    pub base_quality: QualityMode,
    /// Use the extended BAQ model (better sensitivity, lower specificity)
    pub extended_model: bool,
    /// Indel alignment quality (IDAQ)
    pub indel_quality: QualityMode,
}

impl Default for RealignOptions {
    fn default() -> Self {
        Self {
            base_quality: QualityMode::Compute,
            extended_model: true,
            indel_quality: QualityMode::Compute,
        }
    }
}

impl RealignOptions {
    /// Overwrite existing values for every quality that is switched on
    #[must_use]
    pub fn recompute(mut self) -> Self {
        if self.base_quality.is_on() {
            self.base_quality = QualityMode::Recompute;
        }
        if self.indel_quality.is_on() {
            self.indel_quality = QualityMode::Recompute;
        }
        self
    }

    /// Whether neither quality is computed
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.base_quality.is_on() && !self.indel_quality.is_on()
    }
}

/// Configuration for the annotation driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Classify bases of mapped records; `None` disables counting
    pub counting: Option<CountingConfig>,
    /// Records classified together (all from one target)
    pub batch_size: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            counting: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// What happened to one record during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Unmapped,
    /// Mapped, but counting is disabled
    NotClassified,
    Classified(ClassificationCounters),
    /// Mapped, but classification failed; the record is still written
    Skipped(ClassifyError),
}

/// Reference sequence of the target currently being processed
struct CurrentReference {
    target: usize,
    slice: ReferenceSlice,
}

/// Streams records through realignment and classification, in input order.
///
/// The reference of the current target is cached and replaced only when the
/// target changes.
pub struct AnnotationDriver<P> {
    provider: P,
    realigner: Option<Box<dyn Realigner>>,
    classifier: Option<Classifier>,
    options: RealignOptions,
    batch_size: usize,
    current: Option<CurrentReference>,
}

impl<P: ReferenceProvider> AnnotationDriver<P> {
    #[must_use]
    pub fn new(provider: P, config: DriverConfig) -> Self {
        Self {
            provider,
            realigner: None,
            classifier: config.counting.map(Classifier::new),
            options: RealignOptions::default(),
            batch_size: config.batch_size.max(1),
            current: None,
        }
    }

    /// Attach a realigner, run with `options` on every mapped record
    #[must_use]
    pub fn with_realigner(
        mut self,
        realigner: impl Realigner + 'static,
        options: RealignOptions,
    ) -> Self {
        self.realigner = Some(Box::new(realigner));
        self.options = options;
        self
    }

    /// Process every record, writing each one to `sink` in input order.
    ///
    /// `observe` is called for every record after realignment and before it
    /// is written, with the record's classification outcome.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::NothingToDo` if neither realignment nor counting
    /// is enabled, `DriverError::ReferenceFetch` if a target's reference
    /// cannot be fetched, `DriverError::UnknownTarget` for records pointing
    /// outside the header, and `DriverError::Io` on read or write failures.
    /// Per-record classification failures are not errors; they are reported
    /// as `RecordOutcome::Skipped`.
    pub fn run<I, S, F>(
        &mut self,
        header: &Header,
        records: I,
        sink: &mut S,
        mut observe: F,
    ) -> Result<RunSummary, DriverError>
    where
        I: IntoIterator<Item = io::Result<RecordBuf>>,
        S: RecordSink + ?Sized,
        F: FnMut(&RecordBuf, &RecordOutcome),
    {
        let realigning = self.realigner.is_some() && !self.options.is_noop();
        if !realigning && self.classifier.is_none() {
            return Err(DriverError::NothingToDo);
        }

        let mut summary = RunSummary::default();
        let mut pending: Vec<RecordBuf> = Vec::with_capacity(self.batch_size);
        let mut pending_target: Option<usize> = None;

        for result in records {
            let record = result?;
            let target = record.reference_sequence_id();

            if !pending.is_empty() && (target != pending_target || pending.len() >= self.batch_size)
            {
                self.flush(header, &mut pending, &mut *sink, &mut observe, &mut summary)?;
            }

            if let Some(id) = target {
                self.load_reference(header, id, &mut summary)?;
            }

            pending_target = target;
            pending.push(record);
        }

        self.flush(header, &mut pending, &mut *sink, &mut observe, &mut summary)?;
        sink.finish(header)?;

        info!(
            records = summary.records,
            mapped = summary.mapped,
            classified = summary.classified,
            skipped = summary.skipped,
            "Finished processing records"
        );

        Ok(summary)
    }

    fn load_reference(
        &mut self,
        header: &Header,
        target: usize,
        summary: &mut RunSummary,
    ) -> Result<(), DriverError> {
        if self.current.as_ref().is_some_and(|c| c.target == target) {
            return Ok(());
        }

        let name = header
            .reference_sequences()
            .get_index(target)
            .map(|(name, _)| name.to_string())
            .ok_or(DriverError::UnknownTarget(target))?;

        // Release the previous target before loading the next one
        self.current = None;

        debug!(target = %name, "Loading reference sequence");
        let slice = self
            .provider
            .fetch(&name)
            .map_err(|source| DriverError::ReferenceFetch {
                name: name.clone(),
                source,
            })?;

        summary.reference_loads += 1;
        self.current = Some(CurrentReference { target, slice });
        Ok(())
    }

    fn flush<S, F>(
        &mut self,
        header: &Header,
        pending: &mut Vec<RecordBuf>,
        sink: &mut S,
        observe: &mut F,
        summary: &mut RunSummary,
    ) -> Result<(), DriverError>
    where
        S: RecordSink + ?Sized,
        F: FnMut(&RecordBuf, &RecordOutcome),
    {
        if pending.is_empty() {
            return Ok(());
        }

        let outcomes = self.classify_pending(pending);
        let reference = self.current.as_ref().map(|c| &c.slice);

        for (mut record, outcome) in pending.drain(..).zip(outcomes) {
            summary.records += 1;
            match &outcome {
                RecordOutcome::Unmapped => summary.unmapped += 1,
                RecordOutcome::NotClassified => summary.mapped += 1,
                RecordOutcome::Classified(counters) => {
                    summary.mapped += 1;
                    summary.classified += 1;
                    summary.counters += *counters;
                }
                RecordOutcome::Skipped(_) => {
                    summary.mapped += 1;
                    summary.skipped += 1;
                }
            }

            if outcome != RecordOutcome::Unmapped && !self.options.is_noop() {
                if let (Some(realigner), Some(reference)) = (self.realigner.as_mut(), reference) {
                    match realigner.annotate(&mut record, reference, &self.options) {
                        Ok(()) => summary.realigned += 1,
                        Err(e) => warn!(
                            read = %record_name(&record),
                            error = %e,
                            "Realignment failed, writing record unchanged"
                        ),
                    }
                }
            }

            observe(&record, &outcome);
            sink.write_record(header, &record)?;
        }

        Ok(())
    }

    fn classify_pending(&self, pending: &[RecordBuf]) -> Vec<RecordOutcome> {
        let Some(classifier) = &self.classifier else {
            return pending
                .iter()
                .map(|r| {
                    if record::placement(r).is_some() {
                        RecordOutcome::NotClassified
                    } else {
                        RecordOutcome::Unmapped
                    }
                })
                .collect();
        };

        let records: Vec<AlignmentRecord> =
            pending.iter().map(AlignmentRecord::from_record_buf).collect();
        let reference = self.current.as_ref().map(|c| &c.slice);
        let results = classify_batch(classifier, &records, reference);

        records
            .iter()
            .zip(results)
            .map(|(record, result)| {
                if !record.is_mapped() {
                    return RecordOutcome::Unmapped;
                }
                match result {
                    Ok(counters) => RecordOutcome::Classified(counters),
                    Err(e) => {
                        warn!(error = %e, "Skipping record");
                        RecordOutcome::Skipped(e)
                    }
                }
            })
            .collect()
    }
}

fn record_name(record: &RecordBuf) -> String {
    record
        .name()
        .map_or_else(|| "*".to_string(), ToString::to_string)
}
