//! Anchor generation: pairs of query/target minimizers sharing a representation.

use crate::index::Index;
use crate::overlap::{Anchor, RelativeStrand};
use log::debug;
use rayon::prelude::*;

/// Matcher configuration
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Representations seen more often than this in the target index are
    /// treated as repeats and ignored (0 = unlimited)
    pub max_occurrences: usize,
    /// Drop anchors where query and target read ids are equal; only
    /// meaningful when both indexes cover the same read set
    pub skip_self: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            max_occurrences: 1000,
            skip_self: true,
        }
    }
}

impl MatcherConfig {
    pub fn with_max_occurrences(mut self, max_occurrences: usize) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }

    pub fn with_skip_self(mut self, skip_self: bool) -> Self {
        self.skip_self = skip_self;
        self
    }
}

/// Find all anchors between two indices.
///
/// The result is sorted by (query id, target id, query position, target
/// position), the order the trigger stage requires.
pub fn find_anchors(query: &Index, target: &Index, config: &MatcherConfig) -> Vec<Anchor> {
    let per_read: Vec<Vec<Anchor>> = (0..query.num_reads() as u64)
        .into_par_iter()
        .map(|query_id| {
            let mut anchors = Vec::new();
            for q in query.minimizers_of(query_id) {
                let hits = target.occurrences(q.representation());
                if config.max_occurrences > 0 && hits.len() > config.max_occurrences {
                    continue;
                }
                for t in hits {
                    if config.skip_self && t.sequence_id() == query_id {
                        continue;
                    }
                    anchors.push(Anchor {
                        query_read_id: query_id,
                        target_read_id: t.sequence_id(),
                        query_position_in_read: q.position() as u32,
                        target_position_in_read: t.position() as u32,
                        relative_strand: RelativeStrand::from_directions(
                            q.direction(),
                            t.direction(),
                        ),
                    });
                }
            }
            anchors.sort_unstable_by_key(|a| {
                (
                    a.target_read_id,
                    a.query_position_in_read,
                    a.target_position_in_read,
                )
            });
            anchors
        })
        .collect();

    let anchors: Vec<Anchor> = per_read.into_iter().flatten().collect();
    debug!("Found {} anchors", anchors.len());
    anchors
}
