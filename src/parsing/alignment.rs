//! SAM/BAM input and output via noodles.
//!
//! Inputs are opened by extension (`.sam`, `.bam`, or `-` for SAM on stdin)
//! and exposed as a header plus a streaming record iterator. Outputs
//! implement [`RecordSink`] so the annotation driver can write to them.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::RecordBuf;
use noodles::{bam, sam};
use thiserror::Error;

use crate::annotate::driver::RecordSink;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Input SAM does not have a header with reference sequences")]
    MissingHeader,

    #[error("Sequence '{0}' not found in reference")]
    SequenceNotFound(String),
}

/// Alignment file flavours we read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

impl AlignmentFormat {
    /// Detect the format from a path's extension. `-` means SAM on stdin.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnsupportedFormat` for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        if path == Path::new("-") {
            return Ok(Self::Sam);
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("sam") => Ok(Self::Sam),
            Some("bam") => Ok(Self::Bam),
            Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
            None => Err(ParseError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Streaming record iterator over an opened alignment file
pub type RecordIter = Box<dyn Iterator<Item = io::Result<RecordBuf>>>;

/// An opened alignment input: its header and a record stream
pub struct AlignmentInput {
    pub format: AlignmentFormat,
    pub header: sam::Header,
    pub records: RecordIter,
}

/// Open a SAM or BAM file for streaming.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened,
/// `ParseError::Noodles` if the header cannot be parsed,
/// `ParseError::UnsupportedFormat` for unknown extensions, or
/// `ParseError::MissingHeader` for SAM input without `@SQ` lines.
pub fn open(path: &Path) -> Result<AlignmentInput, ParseError> {
    let format = AlignmentFormat::from_path(path)?;

    let (header, records) = match format {
        AlignmentFormat::Sam if path == Path::new("-") => {
            read_sam(sam::io::Reader::new(BufReader::new(io::stdin())))?
        }
        AlignmentFormat::Sam => {
            let file = File::open(path)?;
            read_sam(sam::io::Reader::new(BufReader::new(file)))?
        }
        AlignmentFormat::Bam => {
            let mut reader = File::open(path).map(bam::io::Reader::new)?;
            let header = reader
                .read_header()
                .map_err(|e| ParseError::Noodles(e.to_string()))?;

            let record_header = header.clone();
            let records: RecordIter = Box::new(std::iter::from_fn(move || {
                next_record(|record| reader.read_record_buf(&record_header, record))
            }));
            (header, records)
        }
    };

    Ok(AlignmentInput {
        format,
        header,
        records,
    })
}

fn read_sam<R>(mut reader: sam::io::Reader<R>) -> Result<(sam::Header, RecordIter), ParseError>
where
    R: io::BufRead + 'static,
{
    let header = reader
        .read_header()
        .map_err(|e| ParseError::Noodles(e.to_string()))?;

    if header.reference_sequences().is_empty() {
        return Err(ParseError::MissingHeader);
    }

    let record_header = header.clone();
    let records: RecordIter = Box::new(std::iter::from_fn(move || {
        next_record(|record| reader.read_record_buf(&record_header, record))
    }));
    Ok((header, records))
}

/// Read one record into a fresh buffer; `None` at end of input
fn next_record<F>(mut read: F) -> Option<io::Result<RecordBuf>>
where
    F: FnMut(&mut RecordBuf) -> io::Result<usize>,
{
    let mut record = RecordBuf::default();
    match read(&mut record) {
        Ok(0) => None,
        Ok(_) => Some(Ok(record)),
        Err(e) => Some(Err(e)),
    }
}

/// SAM or BAM output that the header has already been written to
pub struct AlignmentWriter {
    inner: Box<dyn AlignmentWrite>,
}

impl AlignmentWriter {
    /// Create `path` (format by extension) and write `header` to it.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnsupportedFormat` for unknown extensions or
    /// `ParseError::Io` if the file cannot be created or written.
    pub fn create(path: &Path, header: &sam::Header) -> Result<Self, ParseError> {
        if path == Path::new("-") {
            return Err(ParseError::UnsupportedFormat(
                "output must be a .sam or .bam file".to_string(),
            ));
        }

        let file = File::create(path)?;
        let mut inner: Box<dyn AlignmentWrite> = match AlignmentFormat::from_path(path)? {
            AlignmentFormat::Sam => Box::new(sam::io::Writer::new(BufWriter::new(file))),
            AlignmentFormat::Bam => Box::new(bam::io::Writer::new(file)),
        };
        inner.write_alignment_header(header)?;

        Ok(Self { inner })
    }
}

impl RecordSink for AlignmentWriter {
    fn write_record(&mut self, header: &sam::Header, record: &RecordBuf) -> io::Result<()> {
        self.inner.write_alignment_record(header, record)
    }

    fn finish(&mut self, header: &sam::Header) -> io::Result<()> {
        self.inner.finish(header)
    }
}
