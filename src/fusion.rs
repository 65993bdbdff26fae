//! Fusing adjacent overlaps from the same read pair.
//!
//! Two overlaps are fused when they share read ids and strand and the gap
//! between them looks like a local break in the anchor chain rather than two
//! separate hits. Example on query 18 / target 42, forward strand:
//!
//! ```text
//! query  420..520   target  783..883
//! query  900..1200  target 1200..1500
//! fused: query 420..1200, target 783..1500
//! ```
//!
//! Input must be sorted by (query id, target id, query start); unsorted input
//! is not rejected but fuses meaningless neighbours.

use crate::overlap::{Overlap, RelativeStrand};
use log::debug;

/// Gap heuristics deciding whether two neighbouring overlaps belong together
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Both gaps below this always merge
    pub max_short_gap: u32,
    /// Merge when min(gap)/max(gap) exceeds this
    pub min_gap_ratio: f64,
    /// Merge when each gap is below this fraction of the summed overlap lengths
    pub max_gap_fraction: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            max_short_gap: 500,
            min_gap_ratio: 0.8,
            max_gap_fraction: 0.2,
        }
    }
}

/// Gaps between `o1` and the following overlap `o2` on query and target
pub fn overlap_gaps(o1: &Overlap, o2: &Overlap) -> (u32, u32) {
    let query_gap = o2.query_start.abs_diff(o1.query_end);
    // Target coordinates run backwards on the reverse strand
    let target_gap = match o1.relative_strand {
        RelativeStrand::Reverse => o1.target_start.abs_diff(o2.target_end),
        RelativeStrand::Forward => o2.target_start.abs_diff(o1.target_end),
    };
    (query_gap, target_gap)
}

/// Whether `o2` can be fused onto `o1`
pub fn overlaps_mergeable(o1: &Overlap, o2: &Overlap, config: &FusionConfig) -> bool {
    if o1.relative_strand != o2.relative_strand || !o1.same_read_pair(o2) {
        return false;
    }

    let (query_gap, target_gap) = overlap_gaps(o1, o2);

    if query_gap < config.max_short_gap && target_gap < config.max_short_gap {
        return true;
    }

    let similar_gaps = match (query_gap, target_gap) {
        (0, 0) => true,
        (0, _) | (_, 0) => false,
        (q, t) => q.min(t) as f64 / q.max(t) as f64 > config.min_gap_ratio,
    };
    if similar_gaps {
        return true;
    }

    let query_total = o1.query_span() as u64 + o2.query_span() as u64;
    let target_total = o1.target_span() as u64 + o2.target_span() as u64;
    query_total > 0
        && target_total > 0
        && (query_gap as f64 / query_total as f64) < config.max_gap_fraction
        && (target_gap as f64 / target_total as f64) < config.max_gap_fraction
}

/// Grow `fused` so it also covers `next`.
///
/// On sorted input only the query end moves, plus the target end on the
/// forward strand or the target start on the reverse strand.
fn absorb(fused: &mut Overlap, next: &Overlap) {
    fused.query_start = fused.query_start.min(next.query_start);
    fused.query_end = fused.query_end.max(next.query_end);
    fused.target_start = fused.target_start.min(next.target_start);
    fused.target_end = fused.target_end.max(next.target_end);
    fused.num_residues += next.num_residues;
}

/// Fuse runs of mergeable neighbours with the default heuristics
pub fn fuse_overlaps(overlaps: Vec<Overlap>, drop_originals: bool) -> Vec<Overlap> {
    fuse_overlaps_with_config(overlaps, drop_originals, &FusionConfig::default())
}

/// Fuse every maximal run of pairwise-mergeable neighbours into one overlap.
///
/// Fused overlaps are appended after the input overlaps. With `drop_originals`
/// every input overlap that took part in a fusion is left out; the rest keep
/// their order.
pub fn fuse_overlaps_with_config(
    overlaps: Vec<Overlap>,
    drop_originals: bool,
    config: &FusionConfig,
) -> Vec<Overlap> {
    let num_overlaps = overlaps.len();
    let mut consumed = vec![false; num_overlaps];
    let mut fused_overlaps = Vec::new();
    let mut in_fuse: Option<Overlap> = None;

    for i in 1..num_overlaps {
        let prev = &overlaps[i - 1];
        let current = &overlaps[i];

        if overlaps_mergeable(prev, current, config) {
            consumed[i - 1] = true;
            consumed[i] = true;
            let fused = in_fuse.get_or_insert_with(|| prev.clone());
            absorb(fused, current);
        } else if let Some(fused) = in_fuse.take() {
            fused_overlaps.push(fused);
        }
    }

    if let Some(fused) = in_fuse {
        fused_overlaps.push(fused);
    }

    debug!(
        "Fused {} of {} overlaps into {} overlaps",
        consumed.iter().filter(|&&c| c).count(),
        num_overlaps,
        fused_overlaps.len()
    );

    let mut output: Vec<Overlap> = if drop_originals {
        overlaps
            .into_iter()
            .zip(consumed)
            .filter_map(|(overlap, used)| (!used).then_some(overlap))
            .collect()
    } else {
        overlaps
    };
    output.extend(fused_overlaps);
    output
}
