//! FASTA-backed reference provider using noodles.
//!
//! When a `.fai` index sits next to the FASTA, each target is read on
//! demand with an indexed reader. Otherwise the whole file is loaded once.
//! Gzip compressed files are supported in that in-memory mode.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use noodles::core::Region;
use noodles::fasta;
use tracing::debug;

use crate::annotate::driver::{BoxError, ReferenceProvider};
use crate::core::reference::ReferenceSlice;
use crate::parsing::alignment::ParseError;

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".fa.gz")
        || path_str.ends_with(".fasta.gz")
        || path_str.ends_with(".fna.gz")
        || path_str.ends_with(".fa.bgz")
        || path_str.ends_with(".fasta.bgz")
        || path_str.ends_with(".fna.bgz")
    {
        return true;
    }

    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna")
    )
}

#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Path of the `.fai` index for a FASTA file
fn index_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".fai");
    PathBuf::from(name)
}

type QueryFn = Box<dyn FnMut(&str) -> io::Result<Vec<u8>>>;

enum Source {
    Indexed(QueryFn),
    InMemory(HashMap<String, Vec<u8>>),
}

/// Reference provider reading target sequences from a FASTA file
pub struct FastaReferenceProvider {
    path: PathBuf,
    source: Source,
}

impl FastaReferenceProvider {
    /// Open a FASTA file, using its `.fai` index when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
    /// if parsing fails, or `ParseError::InvalidFormat` if no sequences are found.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        let index = index_path(path);
        if index.exists() && !is_gzipped(path) {
            debug!(path = %path.display(), "Using indexed FASTA reader");
            return Self::indexed(path);
        }

        debug!(path = %path.display(), "Loading FASTA into memory");
        let sequences = if is_gzipped(path) {
            let decoder = MultiGzDecoder::new(File::open(path)?);
            load_sequences(&mut fasta::io::Reader::new(BufReader::new(decoder)))?
        } else {
            let file = File::open(path)?;
            load_sequences(&mut fasta::io::Reader::new(BufReader::new(file)))?
        };

        Ok(Self {
            path: path.to_path_buf(),
            source: Source::InMemory(sequences),
        })
    }

    fn indexed(path: &Path) -> Result<Self, ParseError> {
        let mut reader = fasta::io::indexed_reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| ParseError::Noodles(format!("Failed to open indexed FASTA: {e}")))?;

        let query: QueryFn = Box::new(move |name: &str| {
            let region = Region::new(name, ..);
            let record = reader.query(&region)?;
            Ok(record.sequence().as_ref().to_vec())
        });

        Ok(Self {
            path: path.to_path_buf(),
            source: Source::Indexed(query),
        })
    }

    /// Whether sequences are read on demand through a `.fai` index
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        matches!(self.source, Source::Indexed(_))
    }

    /// Fetch the full sequence of one target
    ///
    /// # Errors
    ///
    /// Returns `ParseError::SequenceNotFound` if the target is absent, or
    /// `ParseError::Noodles` if the indexed read fails.
    pub fn sequence(&mut self, name: &str) -> Result<ReferenceSlice, ParseError> {
        let bases = match &mut self.source {
            Source::Indexed(query) => query(name).map_err(|e| {
                if e.kind() == io::ErrorKind::InvalidInput {
                    ParseError::SequenceNotFound(name.to_string())
                } else {
                    ParseError::Noodles(format!(
                        "Failed to read '{name}' from {}: {e}",
                        self.path.display()
                    ))
                }
            })?,
            Source::InMemory(sequences) => sequences
                .get(name)
                .cloned()
                .ok_or_else(|| ParseError::SequenceNotFound(name.to_string()))?,
        };

        Ok(ReferenceSlice::new(name, bases))
    }
}

impl ReferenceProvider for FastaReferenceProvider {
    fn fetch(&mut self, name: &str) -> Result<ReferenceSlice, BoxError> {
        Ok(self.sequence(name)?)
    }
}

fn load_sequences<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
) -> Result<HashMap<String, Vec<u8>>, ParseError> {
    let mut sequences = HashMap::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        let name = String::from_utf8_lossy(record.name()).to_string();
        sequences.insert(name, record.sequence().as_ref().to_vec());
    }

    if sequences.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No sequences found in FASTA file".to_string(),
        ));
    }

    Ok(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const FASTA: &[u8] = b">chr1 description\nACGTACGT\nACGT\n>chr2\nggggCCCC\n";

    #[test]
    fn test_is_fasta_file() {
        assert!(is_fasta_file(Path::new("test.fa")));
        assert!(is_fasta_file(Path::new("test.fasta")));
        assert!(is_fasta_file(Path::new("test.fna")));
        assert!(is_fasta_file(Path::new("test.fa.gz")));
        assert!(is_fasta_file(Path::new("test.fna.bgz")));
        assert!(is_fasta_file(Path::new("/path/to/Reference.FA")));

        assert!(!is_fasta_file(Path::new("test.bam")));
        assert!(!is_fasta_file(Path::new("test.fai")));
    }

    #[test]
    fn test_in_memory_fetch() {
        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(FASTA).unwrap();
        temp.flush().unwrap();

        let mut provider = FastaReferenceProvider::open(temp.path()).unwrap();
        assert!(!provider.is_indexed());

        let chr1 = provider.sequence("chr1").unwrap();
        assert_eq!(chr1.name(), "chr1");
        assert_eq!(chr1, ReferenceSlice::new("chr1", b"ACGTACGTACGT".to_vec()));

        // Soft-masked bases are kept as they are
        let chr2 = provider.sequence("chr2").unwrap();
        assert_eq!(chr2, ReferenceSlice::new("chr2", b"ggggCCCC".to_vec()));

        // A target can be fetched more than once
        assert_eq!(provider.sequence("chr1").unwrap().len(), 12);

        assert!(matches!(
            provider.sequence("chrM"),
            Err(ParseError::SequenceNotFound(ref name)) if name == "chrM"
        ));
    }

    #[test]
    fn test_gzipped_fetch() {
        let mut temp = NamedTempFile::with_suffix(".fa.gz").unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(FASTA).unwrap();
        temp.write_all(&encoder.finish().unwrap()).unwrap();
        temp.flush().unwrap();

        let mut provider = FastaReferenceProvider::open(temp.path()).unwrap();
        assert_eq!(provider.sequence("chr2").unwrap().len(), 8);
    }

    #[test]
    fn test_indexed_fetch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ref.fa");
        std::fs::write(&path, b">chr1\nACGTACGT\nACGT\n>chr2\nGGGGCCCC\n").unwrap();
        // name, length, offset, line bases, line width
        std::fs::write(
            dir.path().join("ref.fa.fai"),
            "chr1\t12\t6\t8\t9\nchr2\t8\t26\t8\t9\n",
        )
        .unwrap();

        let mut provider = FastaReferenceProvider::open(&path).unwrap();
        assert!(provider.is_indexed());
        assert_eq!(
            provider.sequence("chr1").unwrap(),
            ReferenceSlice::new("chr1", b"ACGTACGTACGT".to_vec())
        );
        assert_eq!(
            provider.sequence("chr2").unwrap(),
            ReferenceSlice::new("chr2", b"GGGGCCCC".to_vec())
        );
        assert!(provider.sequence("chrM").is_err());
    }

    #[test]
    fn test_empty_fasta_is_rejected() {
        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(b"").unwrap();
        temp.flush().unwrap();

        assert!(matches!(
            FastaReferenceProvider::open(temp.path()),
            Err(ParseError::InvalidFormat(_))
        ));
    }
}
