//! In-memory read storage and the sequence-provider seam used by rescue and
//! name attachment.
//!
//! Read ids are dense: the id of a read is its position in the input file(s).

use crate::error::{OverlapError, Result};
use anyhow::Context;
use flate2::read::MultiGzDecoder;
use log::debug;
use noodles::{bgzf, fasta};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A named read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub name: String,
    pub seq: Vec<u8>,
}

impl Read {
    pub fn new(name: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Read {
            name: name.into(),
            seq: seq.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Lookup of reads by id
pub trait SequenceProvider: Sync {
    /// Fetch a read, failing with `UnknownReadId` on a miss
    fn get_sequence_by_id(&self, read_id: u64) -> Result<&Read>;

    /// Number of reads; valid ids are `0..num_sequences()`
    fn num_sequences(&self) -> usize;
}

/// A set of reads addressed by dense integer ids
#[derive(Debug, Clone, Default)]
pub struct ReadSet {
    reads: Vec<Read>,
}

impl ReadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a read and return its id
    pub fn push(&mut self, read: Read) -> u64 {
        let id = self.reads.len() as u64;
        self.reads.push(read);
        id
    }

    pub fn reads(&self) -> &[Read] {
        &self.reads
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Total number of bases across all reads
    pub fn total_bases(&self) -> usize {
        self.reads.iter().map(Read::len).sum()
    }

    /// Load every record of a FASTA file (plain, gzip or bgzip)
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let input = open_fasta_input(path)?;
        let mut reader = fasta::io::Reader::new(input);
        let mut read_set = ReadSet::new();

        for result in reader.records() {
            let record = result
                .with_context(|| format!("Failed to parse FASTA record in {}", path.display()))?;
            let name = String::from_utf8_lossy(record.name()).into_owned();
            let seq = record.sequence().as_ref().to_vec();
            read_set.push(Read::new(name, seq));
        }

        debug!(
            "Loaded {} reads ({} bp) from {}",
            read_set.len(),
            read_set.total_bases(),
            path.display()
        );

        Ok(read_set)
    }
}

impl FromIterator<Read> for ReadSet {
    fn from_iter<I: IntoIterator<Item = Read>>(iter: I) -> Self {
        let mut read_set = ReadSet::new();
        for read in iter {
            read_set.push(read);
        }
        read_set
    }
}

impl SequenceProvider for ReadSet {
    fn get_sequence_by_id(&self, read_id: u64) -> Result<&Read> {
        usize::try_from(read_id)
            .ok()
            .and_then(|idx| self.reads.get(idx))
            .ok_or(OverlapError::UnknownReadId(read_id))
    }

    fn num_sequences(&self) -> usize {
        self.reads.len()
    }
}

/// Open a FASTA file, picking a decoder from the file extension
fn open_fasta_input(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open FASTA file '{}'", path.display()))?;

    let extension = path.extension().and_then(|ext| ext.to_str());

    Ok(match extension {
        Some("bgz") => Box::new(BufReader::new(bgzf::io::Reader::new(file))),
        Some("gz") => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        _ => Box::new(BufReader::new(file)),
    })
}

/// Compute the reverse complement of a sequence, keeping non-ACGT symbols as-is
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            b'a' => b't',
            b't' => b'a',
            b'c' => b'g',
            b'g' => b'c',
            _ => b,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ATCG"), b"CGAT".to_vec());
        assert_eq!(reverse_complement(b"aaCN"), b"NGtt".to_vec());
        assert_eq!(reverse_complement(b""), Vec::<u8>::new());
    }

    #[test]
    fn test_read_set_lookup() {
        let reads: ReadSet = vec![Read::new("r0", "ACGT"), Read::new("r1", "GGGG")]
            .into_iter()
            .collect();

        assert_eq!(reads.len(), 2);
        assert_eq!(reads.num_sequences(), 2);
        assert_eq!(reads.get_sequence_by_id(1).unwrap().name, "r1");
        assert_eq!(
            reads.get_sequence_by_id(2),
            Err(OverlapError::UnknownReadId(2))
        );
        assert_eq!(reads.total_bases(), 8);
    }

    #[test]
    fn test_from_fasta() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">read1 some description").unwrap();
        writeln!(file, "ACGTACGT").unwrap();
        writeln!(file, "TTTT").unwrap();
        writeln!(file, ">read2").unwrap();
        writeln!(file, "GGCC").unwrap();
        file.flush().unwrap();

        let reads = ReadSet::from_fasta(file.path()).unwrap();
        assert_eq!(reads.len(), 2);
        let first = reads.get_sequence_by_id(0).unwrap();
        assert_eq!(first.name, "read1");
        assert_eq!(first.seq, b"ACGTACGTTTTT".to_vec());
        assert_eq!(reads.get_sequence_by_id(1).unwrap().seq, b"GGCC".to_vec());
    }

    #[test]
    fn test_from_gzipped_fasta() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fa.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b">r\nACGTN\n").unwrap();
        encoder.finish().unwrap();

        let reads = ReadSet::from_fasta(&path).unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads.reads()[0].seq, b"ACGTN".to_vec());
    }

    #[test]
    fn test_missing_file() {
        let err = ReadSet::from_fasta("/nonexistent/reads.fa").unwrap_err();
        assert!(err.to_string().contains("Failed to open FASTA file"));
    }
}
