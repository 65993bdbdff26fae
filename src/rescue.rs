//! Overlap end rescue.
//!
//! Anchors rarely reach the very ends of a true overlap. For each overlap we
//! look at the bases just outside its start and end on both reads and, if the
//! two flanks share most of their k-mers, grow the overlap over them. This is
//! repeated until nothing changes or the round cap is hit.

use crate::error::{OverlapError, Result};
use crate::overlap::{Overlap, RelativeStrand};
use crate::sequence::{reverse_complement, SequenceProvider};
use log::{debug, info};
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::HashSet;

/// k-mer length used to compare flanks
pub const RESCUE_KMER_SIZE: usize = 15;

/// Upper bound on extension rounds per overlap
pub const MAX_RESCUE_ROUNDS: usize = 3;

pub const DEFAULT_RESCUE_EXTENSION: u32 = 100;
pub const DEFAULT_REQUIRED_SIMILARITY: f32 = 0.9;

/// Jaccard similarity of the k-mer sets of two sequences.
///
/// k-mers are taken every `stride` bases. Two sequences without any k-mer
/// (both shorter than `k`) have similarity 0.
pub fn sequence_jaccard_similarity(a: &[u8], b: &[u8], k: usize, stride: usize) -> f32 {
    let kmers = |seq: &[u8]| -> HashSet<Vec<u8>> {
        if k == 0 || seq.len() < k {
            return HashSet::new();
        }
        (0..=seq.len() - k)
            .step_by(stride.max(1))
            .map(|i| seq[i..i + k].to_ascii_uppercase())
            .collect()
    };

    let set1 = kmers(a);
    let set2 = kmers(b);

    let intersection_size = set1.intersection(&set2).count();
    let union_size = set1.union(&set2).count();

    if union_size == 0 {
        0.0
    } else {
        intersection_size as f32 / union_size as f32
    }
}

/// Rescue parameters
#[derive(Debug, Clone)]
pub struct RescueConfig {
    /// Flank size examined in the first round
    pub extension: u32,
    /// Similarity the first-round flanks must reach
    pub required_similarity: f32,
    /// Flank size examined in later rounds
    pub refine_extension: u32,
    /// Similarity later-round flanks must reach
    pub refine_similarity: f32,
    pub max_rounds: usize,
}

impl Default for RescueConfig {
    fn default() -> Self {
        RescueConfig {
            extension: DEFAULT_RESCUE_EXTENSION,
            required_similarity: DEFAULT_REQUIRED_SIMILARITY,
            refine_extension: DEFAULT_RESCUE_EXTENSION,
            refine_similarity: DEFAULT_REQUIRED_SIMILARITY,
            max_rounds: MAX_RESCUE_ROUNDS,
        }
    }
}

impl RescueConfig {
    /// Caller-chosen first round, default refinement afterwards
    pub fn with_first_pass(extension: u32, required_similarity: f32) -> Self {
        RescueConfig {
            extension,
            required_similarity,
            ..RescueConfig::default()
        }
    }

    fn round_parameters(&self, round: usize) -> (u32, f32) {
        if round == 0 {
            (self.extension, self.required_similarity)
        } else {
            (self.refine_extension, self.refine_similarity)
        }
    }
}

/// Read length used for clipping: the attached length when set, else the
/// length of the fetched sequence
fn effective_length(attached: u32, sequence_length: usize) -> u32 {
    let sequence_length = sequence_length.min(u32::MAX as usize) as u32;
    if attached == 0 {
        sequence_length
    } else {
        attached.min(sequence_length)
    }
}

/// One extension round on a forward-oriented overlap; returns whether any
/// coordinate moved
fn extend_once(
    o: &mut Overlap,
    query: &[u8],
    target: &[u8],
    extension: u32,
    required_similarity: f32,
) -> bool {
    let before = (o.query_start, o.query_end, o.target_start, o.target_end);
    let query_len = query.len() as u32;
    let target_len = target.len() as u32;

    let head = extension.min(o.query_start).min(o.target_start);
    if head > 0 {
        let query_head = &query[(o.query_start - head) as usize..o.query_start as usize];
        let target_head = &target[(o.target_start - head) as usize..o.target_start as usize];
        let similarity =
            sequence_jaccard_similarity(query_head, target_head, RESCUE_KMER_SIZE, 1);
        if similarity >= required_similarity {
            o.query_start -= head;
            o.target_start -= head;
        }
    }

    let tail = extension
        .min(query_len - o.query_end)
        .min(target_len - o.target_end);
    if tail > 0 {
        let query_tail = &query[o.query_end as usize..(o.query_end + tail) as usize];
        let target_tail = &target[o.target_end as usize..(o.target_end + tail) as usize];
        let similarity =
            sequence_jaccard_similarity(query_tail, target_tail, RESCUE_KMER_SIZE, 1);
        if similarity >= required_similarity {
            o.query_end += tail;
            o.target_end += tail;
        }
    }

    before != (o.query_start, o.query_end, o.target_start, o.target_end)
}

/// Rescue a single overlap against its two read sequences
pub fn rescue_overlap(
    overlap: &Overlap,
    query_seq: &[u8],
    target_seq: &[u8],
    config: &RescueConfig,
) -> Result<Overlap> {
    let query_len = effective_length(overlap.query_length, query_seq.len());
    let target_len = effective_length(overlap.target_length, target_seq.len());

    if overlap.query_start > overlap.query_end
        || overlap.query_end > query_len
        || overlap.target_start > overlap.target_end
        || overlap.target_end > target_len
    {
        return Err(OverlapError::PreconditionViolation(format!(
            "overlap {}:{}-{} / {}:{}-{} lies outside reads of length {} / {}",
            overlap.query_read_id,
            overlap.query_start,
            overlap.query_end,
            overlap.target_read_id,
            overlap.target_start,
            overlap.target_end,
            query_len,
            target_len
        )));
    }

    let query = &query_seq[..query_len as usize];
    let mut o = overlap.clone();

    // Work on the forward view of reverse overlaps
    let reversed = o.relative_strand == RelativeStrand::Reverse;
    let target: Cow<[u8]> = if reversed {
        o.reverse_overlap(target_len)?;
        Cow::Owned(reverse_complement(&target_seq[..target_len as usize]))
    } else {
        Cow::Borrowed(&target_seq[..target_len as usize])
    };

    for round in 0..config.max_rounds {
        let (extension, required_similarity) = config.round_parameters(round);
        if !extend_once(&mut o, query, &target, extension, required_similarity) {
            break;
        }
    }

    if reversed {
        o.reverse_overlap(target_len)?;
    }

    Ok(o)
}

/// Rescue the ends of every overlap in place.
///
/// The first round looks `extension` bases past each end and needs
/// `required_similarity`; later rounds use the default refinement
/// parameters. Overlaps are processed in parallel. If any read id is
/// unknown the slice is left untouched.
pub fn rescue_overlap_ends<Q, T>(
    overlaps: &mut [Overlap],
    query_reads: &Q,
    target_reads: &T,
    extension: u32,
    required_similarity: f32,
) -> Result<()>
where
    Q: SequenceProvider + ?Sized,
    T: SequenceProvider + ?Sized,
{
    let config = RescueConfig::with_first_pass(extension, required_similarity);
    rescue_overlap_ends_with_config(overlaps, query_reads, target_reads, &config)
}

/// Chained extension with the default parameters
pub fn extend_overlap_ends<Q, T>(overlaps: &mut [Overlap], query_reads: &Q, target_reads: &T) -> Result<()>
where
    Q: SequenceProvider + ?Sized,
    T: SequenceProvider + ?Sized,
{
    rescue_overlap_ends_with_config(overlaps, query_reads, target_reads, &RescueConfig::default())
}

pub fn rescue_overlap_ends_with_config<Q, T>(
    overlaps: &mut [Overlap],
    query_reads: &Q,
    target_reads: &T,
    config: &RescueConfig,
) -> Result<()>
where
    Q: SequenceProvider + ?Sized,
    T: SequenceProvider + ?Sized,
{
    let rescued = overlaps
        .par_iter()
        .map(|overlap| {
            let query = query_reads.get_sequence_by_id(overlap.query_read_id)?;
            let target = target_reads.get_sequence_by_id(overlap.target_read_id)?;
            rescue_overlap(overlap, &query.seq, &target.seq, config)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut extended = 0usize;
    for (slot, new) in overlaps.iter_mut().zip(rescued) {
        if *slot != new {
            extended += 1;
        }
        *slot = new;
    }

    info!("Rescued ends of {} of {} overlaps", extended, overlaps.len());
    debug!(
        "Rescue parameters: extension={} similarity={} refine_extension={} refine_similarity={} rounds={}",
        config.extension,
        config.required_similarity,
        config.refine_extension,
        config.refine_similarity,
        config.max_rounds
    );

    Ok(())
}
