//! (k,w)-minimizer index over a read set.
//!
//! Every read is sketched independently: canonical k-mers are computed with
//! [`encode`], k-mers touching a non-ACGT base are skipped, and the smallest
//! k-mer of each window of `w` consecutive k-mers is kept.

use crate::error::{OverlapError, Result};
use crate::minimizer::{encode, is_dna_base, Minimizer, MAX_KMER_LENGTH};
use crate::sequence::ReadSet;
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

/// Default minimizer (k-mer) length
pub const DEFAULT_KMER_SIZE: usize = 15;

/// Default number of consecutive k-mers per window
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Minimizers of every read plus a lookup from representation to occurrences
#[derive(Debug, Clone, Default)]
pub struct Index {
    kmer_size: usize,
    window_size: usize,
    minimizers: Vec<Vec<Minimizer>>,
    occurrences: HashMap<u64, Vec<Minimizer>>,
}

impl Index {
    /// Sketch every read of `reads` in parallel and build the lookup table
    pub fn build(reads: &ReadSet, kmer_size: usize, window_size: usize) -> Result<Self> {
        if kmer_size == 0 || kmer_size > MAX_KMER_LENGTH {
            return Err(OverlapError::InvalidRange {
                start: 0,
                length: kmer_size,
                sequence_length: MAX_KMER_LENGTH,
            });
        }
        if window_size == 0 {
            return Err(OverlapError::PreconditionViolation(
                "window size must be at least 1 k-mer, got 0".to_string(),
            ));
        }

        let minimizers = reads
            .reads()
            .par_iter()
            .enumerate()
            .map(|(read_id, read)| sketch_read(&read.seq, read_id as u64, kmer_size, window_size))
            .collect::<Result<Vec<_>>>()?;

        let mut occurrences: HashMap<u64, Vec<Minimizer>> = HashMap::new();
        for minimizer in minimizers.iter().flatten() {
            occurrences
                .entry(minimizer.representation())
                .or_default()
                .push(*minimizer);
        }

        debug!(
            "Indexed {} reads: {} minimizers, {} distinct (k={}, w={})",
            minimizers.len(),
            minimizers.iter().map(Vec::len).sum::<usize>(),
            occurrences.len(),
            kmer_size,
            window_size
        );

        Ok(Index {
            kmer_size,
            window_size,
            minimizers,
            occurrences,
        })
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn num_reads(&self) -> usize {
        self.minimizers.len()
    }

    /// Minimizers of one read, in position order
    pub fn minimizers_of(&self, read_id: u64) -> &[Minimizer] {
        usize::try_from(read_id)
            .ok()
            .and_then(|idx| self.minimizers.get(idx))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All occurrences of a representation across the read set
    pub fn occurrences(&self, representation: u64) -> &[Minimizer] {
        self.occurrences
            .get(&representation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn num_minimizers(&self) -> usize {
        self.minimizers.iter().map(Vec::len).sum()
    }
}

/// Compute the (k,w)-minimizers of one read.
///
/// Ties inside a window go to the leftmost k-mer; a k-mer that stays the
/// minimum across several windows is reported once.
pub fn sketch_read(
    seq: &[u8],
    read_id: u64,
    kmer_size: usize,
    window_size: usize,
) -> Result<Vec<Minimizer>> {
    if seq.len() > u32::MAX as usize {
        return Err(OverlapError::InvalidRange {
            start: 0,
            length: seq.len(),
            sequence_length: u32::MAX as usize,
        });
    }
    if seq.len() < kmer_size {
        return Ok(Vec::new());
    }

    // Prefix count of non-ACGT bases so each k-mer check is O(1)
    let mut invalid_prefix = Vec::with_capacity(seq.len() + 1);
    invalid_prefix.push(0usize);
    for &b in seq {
        let last = *invalid_prefix.last().unwrap_or(&0);
        invalid_prefix.push(last + usize::from(!is_dna_base(b)));
    }

    let num_kmers = seq.len() - kmer_size + 1;
    let mut kmers = Vec::with_capacity(num_kmers);
    for pos in 0..num_kmers {
        if invalid_prefix[pos + kmer_size] - invalid_prefix[pos] > 0 {
            kmers.push(None);
        } else {
            kmers.push(Some(encode(seq, pos, kmer_size)?));
        }
    }

    let num_windows = num_kmers.saturating_sub(window_size) + 1;
    let window_len = window_size.min(num_kmers);
    let mut minimizers: Vec<Minimizer> = Vec::new();

    for window_start in 0..num_windows {
        let mut best: Option<(usize, u64, _)> = None;
        for pos in window_start..window_start + window_len {
            if let Some((repr, dir)) = kmers[pos] {
                if best.map_or(true, |(_, best_repr, _)| repr < best_repr) {
                    best = Some((pos, repr, dir));
                }
            }
        }

        if let Some((pos, repr, dir)) = best {
            if minimizers.last().map_or(true, |m| m.position() != pos) {
                minimizers.push(Minimizer::new(repr, pos, dir, read_id));
            }
        }
    }

    Ok(minimizers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Read;

    #[test]
    fn test_sketch_short_read() {
        assert!(sketch_read(b"ACGT", 0, 5, 3).unwrap().is_empty());
    }

    #[test]
    fn test_sketch_picks_window_minimum() {
        // k=2 k-mers: TT(AA rev)=0, TG, GC, CA, AA=0 ...
        let seq = b"TTGCAAGT";
        let minimizers = sketch_read(seq, 3, 2, 3).unwrap();
        assert!(!minimizers.is_empty());
        for m in &minimizers {
            assert_eq!(m.sequence_id(), 3);
            let (repr, dir) = encode(seq, m.position(), 2).unwrap();
            assert_eq!(repr, m.representation());
            assert_eq!(dir, m.direction());
        }
        // Positions strictly increase and are never repeated
        assert!(minimizers.windows(2).all(|w| w[0].position() < w[1].position()));
        assert_eq!(minimizers[0].position(), 0);
        assert_eq!(minimizers[0].representation(), 0);
    }

    #[test]
    fn test_sketch_skips_ambiguous_bases() {
        let seq = b"ACGTNACGT";
        let minimizers = sketch_read(seq, 0, 4, 1).unwrap();
        // k-mers at 1..=4 overlap the N
        let positions: Vec<usize> = minimizers.iter().map(|m| m.position()).collect();
        assert_eq!(positions, vec![0, 5]);
    }

    #[test]
    fn test_window_larger_than_read() {
        let minimizers = sketch_read(b"GGGGAAAA", 0, 3, 100).unwrap();
        assert_eq!(minimizers.len(), 1);
    }

    #[test]
    fn test_build_index() {
        let reads: ReadSet = vec![
            Read::new("a", "ACGTACGTTGCA"),
            Read::new("b", "ACGTACGTTGCA"),
            Read::new("c", "NNNN"),
        ]
        .into_iter()
        .collect();

        let index = Index::build(&reads, 5, 2).unwrap();
        assert_eq!(index.num_reads(), 3);

        // Identical reads get identical minimizers, only the read id differs
        let a: Vec<(u64, usize)> = index
            .minimizers_of(0)
            .iter()
            .map(|m| (m.representation(), m.position()))
            .collect();
        let b: Vec<(u64, usize)> = index
            .minimizers_of(1)
            .iter()
            .map(|m| (m.representation(), m.position()))
            .collect();
        assert!(!a.is_empty());
        assert_eq!(a, b);
        assert!(index.minimizers_of(1).iter().all(|m| m.sequence_id() == 1));
        assert!(index.minimizers_of(2).is_empty());
        assert!(index.minimizers_of(99).is_empty());

        let first = index.minimizers_of(0)[0];
        assert_eq!(index.occurrences(first.representation()).len() % 2, 0);
    }

    #[test]
    fn test_build_rejects_bad_k() {
        let reads = ReadSet::new();
        assert!(matches!(
            Index::build(&reads, 0, 10),
            Err(OverlapError::InvalidRange { length: 0, .. })
        ));
        assert!(matches!(
            Index::build(&reads, 33, 10),
            Err(OverlapError::InvalidRange { length: 33, .. })
        ));
        match Index::build(&reads, 15, 0) {
            Err(OverlapError::PreconditionViolation(msg)) => assert!(msg.contains("window size")),
            other => panic!("expected a window size error, got {other:?}"),
        }
    }
}
