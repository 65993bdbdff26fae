//! Turning a sorted anchor stream into raw overlaps.
//!
//! [`OverlapperTriggered`] runs a small state machine per read pair. A run of
//! collinear anchors "triggers" an overlap once it is long enough and scores
//! well enough; a single badly scoring or out-of-order anchor closes the run.

use crate::error::{OverlapError, Result};
use crate::index::DEFAULT_KMER_SIZE;
use crate::overlap::{Anchor, Overlap, RelativeStrand};
use log::debug;

/// Strategy that produces overlaps from anchors
pub trait Overlapper {
    /// Produce overlaps from anchors sorted by (query id, target id, query position)
    fn get_overlaps(&self, anchors: &[Anchor]) -> Result<Vec<Overlap>>;
}

/// Scores an anchor against the previous anchor of the run it would extend
pub trait AnchorScorer {
    /// Only called for anchors already known to be collinear with `previous`
    fn score(&self, previous: &Anchor, next: &Anchor) -> f32;
}

/// Scores consecutive anchors by how well they stay on one diagonal.
///
/// The score is `1 - |dq - dt| / max(dq, dt)`, so perfectly collinear anchors
/// score 1.0. Anchors further apart than `max_gap` on either read score 0.
#[derive(Debug, Clone, Copy)]
pub struct DiagonalScorer {
    pub max_gap: u32,
}

impl Default for DiagonalScorer {
    fn default() -> Self {
        DiagonalScorer { max_gap: 5000 }
    }
}

impl AnchorScorer for DiagonalScorer {
    fn score(&self, previous: &Anchor, next: &Anchor) -> f32 {
        let dq = next.query_position_in_read.abs_diff(previous.query_position_in_read);
        let dt = next
            .target_position_in_read
            .abs_diff(previous.target_position_in_read);
        let longest = dq.max(dt);
        if longest == 0 {
            return 1.0;
        }
        if longest > self.max_gap {
            return 0.0;
        }
        1.0 - dq.abs_diff(dt) as f32 / longest as f32
    }
}

/// Trigger thresholds
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Anchors a run needs before it can trigger
    pub min_run_length: usize,
    /// An anchor scoring below this closes the current run
    pub min_anchor_score: f32,
    /// Aggregate score (first anchor counts 1.0) a run needs to trigger
    pub min_run_score: f32,
    /// Largest anchor spacing the default diagonal scorer accepts
    pub max_anchor_gap: u32,
    /// Length of the k-mers behind the anchors; overlap ends cover the
    /// last k-mer in full
    pub kmer_size: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig {
            min_run_length: 3,
            min_anchor_score: 0.5,
            min_run_score: 2.0,
            max_anchor_gap: 5000,
            kmer_size: DEFAULT_KMER_SIZE,
        }
    }
}

/// A run of collinear anchors on one read pair
#[derive(Debug, Clone, Copy)]
struct Run {
    run_length: usize,
    score: f32,
    first: Anchor,
    last: Anchor,
}

impl Run {
    fn start(anchor: &Anchor) -> Self {
        Run {
            run_length: 1,
            score: 1.0,
            first: *anchor,
            last: *anchor,
        }
    }

    fn strand(&self) -> RelativeStrand {
        self.first.relative_strand
    }

    /// Same read pair, same strand, and monotonic on both reads
    fn is_collinear(&self, anchor: &Anchor) -> bool {
        if !self.last.same_read_pair(anchor) || anchor.relative_strand != self.strand() {
            return false;
        }
        if anchor.query_position_in_read <= self.last.query_position_in_read {
            return false;
        }
        match self.strand() {
            RelativeStrand::Forward => {
                anchor.target_position_in_read > self.last.target_position_in_read
            }
            RelativeStrand::Reverse => {
                anchor.target_position_in_read < self.last.target_position_in_read
            }
        }
    }

    fn extend(&mut self, anchor: &Anchor, score: f32) {
        self.run_length += 1;
        self.score += score;
        self.last = *anchor;
    }

    /// Half-open overlap spanning every k-mer of the run
    fn to_overlap(self, kmer_size: u32) -> Overlap {
        let (target_start, target_end) = match self.strand() {
            RelativeStrand::Forward => (
                self.first.target_position_in_read,
                self.last.target_position_in_read.saturating_add(kmer_size),
            ),
            // Anchors walk down the target; the first one holds the highest k-mer
            RelativeStrand::Reverse => (
                self.last.target_position_in_read,
                self.first.target_position_in_read.saturating_add(kmer_size),
            ),
        };
        Overlap {
            query_read_id: self.first.query_read_id,
            target_read_id: self.first.target_read_id,
            query_start: self.first.query_position_in_read,
            query_end: self.last.query_position_in_read.saturating_add(kmer_size),
            target_start,
            target_end,
            relative_strand: self.strand(),
            num_residues: self.run_length as i32,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TriggerState {
    Idle,
    Accumulating(Run),
}

/// Overlapper that triggers on runs of well-scoring collinear anchors
#[derive(Debug, Clone, Default)]
pub struct OverlapperTriggered<S: AnchorScorer = DiagonalScorer> {
    config: TriggerConfig,
    scorer: S,
    read_counts: Option<(u64, u64)>,
}

impl OverlapperTriggered<DiagonalScorer> {
    pub fn new(config: TriggerConfig) -> Self {
        let scorer = DiagonalScorer {
            max_gap: config.max_anchor_gap,
        };
        OverlapperTriggered {
            config,
            scorer,
            read_counts: None,
        }
    }
}

impl<S: AnchorScorer> OverlapperTriggered<S> {
    /// Swap in a different anchor scoring strategy
    pub fn with_scorer<T: AnchorScorer>(self, scorer: T) -> OverlapperTriggered<T> {
        OverlapperTriggered {
            config: self.config,
            scorer,
            read_counts: self.read_counts,
        }
    }

    /// Reject anchors whose read ids fall outside `0..num_query_reads` /
    /// `0..num_target_reads`
    pub fn with_read_counts(mut self, num_query_reads: u64, num_target_reads: u64) -> Self {
        self.read_counts = Some((num_query_reads, num_target_reads));
        self
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    fn check_preconditions(&self, anchors: &[Anchor]) -> Result<()> {
        if let Some(i) = anchors
            .windows(2)
            .position(|w| w[1].sort_key() < w[0].sort_key())
        {
            return Err(OverlapError::PreconditionViolation(format!(
                "anchors not sorted by (query id, target id, query position) at index {}",
                i + 1
            )));
        }

        if let Some((num_query, num_target)) = self.read_counts {
            if let Some(anchor) = anchors
                .iter()
                .find(|a| a.query_read_id >= num_query || a.target_read_id >= num_target)
            {
                return Err(OverlapError::PreconditionViolation(format!(
                    "anchor references unknown read pair ({}, {})",
                    anchor.query_read_id, anchor.target_read_id
                )));
            }
        }

        Ok(())
    }

    fn close(&self, run: Run, overlaps: &mut Vec<Overlap>) {
        if run.run_length >= self.config.min_run_length && run.score >= self.config.min_run_score {
            let kmer_size = u32::try_from(self.config.kmer_size).unwrap_or(u32::MAX);
            overlaps.push(run.to_overlap(kmer_size));
        }
    }
}

impl<S: AnchorScorer> Overlapper for OverlapperTriggered<S> {
    fn get_overlaps(&self, anchors: &[Anchor]) -> Result<Vec<Overlap>> {
        self.check_preconditions(anchors)?;

        let mut overlaps = Vec::new();
        let mut state = TriggerState::Idle;

        for anchor in anchors {
            state = match state {
                TriggerState::Idle => TriggerState::Accumulating(Run::start(anchor)),
                TriggerState::Accumulating(mut run) => {
                    let extends = run.is_collinear(anchor) && {
                        let score = self.scorer.score(&run.last, anchor);
                        if score >= self.config.min_anchor_score {
                            run.extend(anchor, score);
                            true
                        } else {
                            false
                        }
                    };
                    if extends {
                        TriggerState::Accumulating(run)
                    } else {
                        self.close(run, &mut overlaps);
                        TriggerState::Accumulating(Run::start(anchor))
                    }
                }
            };
        }

        if let TriggerState::Accumulating(run) = state {
            self.close(run, &mut overlaps);
        }

        debug!(
            "Triggered {} overlaps from {} anchors",
            overlaps.len(),
            anchors.len()
        );

        Ok(overlaps)
    }
}
