use crate::error::{OverlapError, Result};
use crate::minimizer::Direction;
use std::fmt;

/// Relative orientation of target to query
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum RelativeStrand {
    /// Target coordinates increase with query coordinates
    #[default]
    Forward,
    /// Target coordinates decrease as query coordinates increase
    Reverse,
}

impl RelativeStrand {
    /// Strand implied by the directions of two matching minimizers
    pub fn from_directions(query: Direction, target: Direction) -> Self {
        if query == target {
            RelativeStrand::Forward
        } else {
            RelativeStrand::Reverse
        }
    }

    pub fn flip(self) -> Self {
        match self {
            RelativeStrand::Forward => RelativeStrand::Reverse,
            RelativeStrand::Reverse => RelativeStrand::Forward,
        }
    }

    /// PAF strand character
    pub fn as_char(self) -> char {
        match self {
            RelativeStrand::Forward => '+',
            RelativeStrand::Reverse => '-',
        }
    }
}

impl fmt::Display for RelativeStrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A pair of positions, one per read, sharing a minimizer representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub query_read_id: u64,
    pub target_read_id: u64,
    pub query_position_in_read: u32,
    pub target_position_in_read: u32,
    pub relative_strand: RelativeStrand,
}

impl Anchor {
    /// Sort key the trigger stage requires its input to be ordered by
    pub fn sort_key(&self) -> (u64, u64, u32) {
        (
            self.query_read_id,
            self.target_read_id,
            self.query_position_in_read,
        )
    }

    pub fn same_read_pair(&self, other: &Anchor) -> bool {
        self.query_read_id == other.query_read_id && self.target_read_id == other.target_read_id
    }
}

/// Inferred shared region between a query read and a target read.
///
/// Coordinates are half-open. Names and lengths stay empty/zero until
/// [`crate::finalize::update_read_names`] fills them in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Overlap {
    pub query_read_id: u64,
    pub target_read_id: u64,
    pub query_start: u32,
    pub query_end: u32,
    pub target_start: u32,
    pub target_end: u32,
    pub relative_strand: RelativeStrand,
    pub num_residues: i32,
    pub query_read_name: String,
    pub target_read_name: String,
    pub query_length: u32,
    pub target_length: u32,
}

impl Overlap {
    pub fn query_span(&self) -> u32 {
        self.query_end.saturating_sub(self.query_start)
    }

    pub fn target_span(&self) -> u32 {
        self.target_end.saturating_sub(self.target_start)
    }

    /// Approximate alignment length reported in PAF column 11
    pub fn alignment_length(&self) -> u32 {
        let target = (self.target_end as i64 - self.target_start as i64).unsigned_abs();
        let query = (self.query_end as i64 - self.query_start as i64).unsigned_abs();
        target.max(query) as u32
    }

    pub fn same_read_pair(&self, other: &Overlap) -> bool {
        self.query_read_id == other.query_read_id && self.target_read_id == other.target_read_id
    }

    /// Flip the overlap onto the opposite target strand.
    ///
    /// Target coordinates are mirrored within a target of `target_sequence_length`
    /// bases and the relative strand is toggled. Applying it twice restores the
    /// original overlap. The target interval must satisfy
    /// `target_start <= target_end <= target_sequence_length`; otherwise the
    /// overlap is left untouched and `InvalidRange` is returned.
    pub fn reverse_overlap(&mut self, target_sequence_length: u32) -> Result<()> {
        if self.target_start > self.target_end || self.target_end > target_sequence_length {
            return Err(OverlapError::InvalidRange {
                start: self.target_start as usize,
                length: self.target_end.saturating_sub(self.target_start) as usize,
                sequence_length: target_sequence_length as usize,
            });
        }
        self.relative_strand = self.relative_strand.flip();
        let start = self.target_start;
        self.target_start = target_sequence_length - self.target_end;
        self.target_end = target_sequence_length - start;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Overlap {
        Overlap {
            query_read_id: 1,
            target_read_id: 2,
            query_start: 100,
            query_end: 400,
            target_start: 250,
            target_end: 600,
            relative_strand: RelativeStrand::Reverse,
            num_residues: 12,
            ..Default::default()
        }
    }

    #[test]
    fn test_reverse_overlap_coordinates() {
        let mut o = sample();
        o.reverse_overlap(1000).unwrap();
        assert_eq!(o.relative_strand, RelativeStrand::Forward);
        assert_eq!((o.target_start, o.target_end), (400, 750));
        assert_eq!(o.target_span(), 350);
    }

    #[test]
    fn test_reverse_overlap_round_trip() {
        let original = sample();
        let mut o = original.clone();
        o.reverse_overlap(600).unwrap();
        o.reverse_overlap(600).unwrap();
        assert_eq!(o, original);
    }

    #[test]
    fn test_reverse_overlap_rejects_out_of_range_target() {
        let original = sample();

        // Target ends at 600, past a 500 base target
        let mut o = original.clone();
        assert_eq!(
            o.reverse_overlap(500),
            Err(OverlapError::InvalidRange {
                start: 250,
                length: 350,
                sequence_length: 500,
            })
        );
        assert_eq!(o, original);

        let mut inverted = Overlap {
            target_start: 700,
            target_end: 600,
            ..original
        };
        let before = inverted.clone();
        assert!(inverted.reverse_overlap(1000).is_err());
        assert_eq!(inverted, before);
    }

    #[test]
    fn test_alignment_length() {
        let o = sample();
        assert_eq!(o.alignment_length(), 350);
    }

    #[test]
    fn test_strand_from_directions() {
        use Direction::*;
        assert_eq!(RelativeStrand::from_directions(Forward, Forward), RelativeStrand::Forward);
        assert_eq!(RelativeStrand::from_directions(Reverse, Reverse), RelativeStrand::Forward);
        assert_eq!(RelativeStrand::from_directions(Forward, Reverse), RelativeStrand::Reverse);
        assert_eq!(RelativeStrand::Reverse.to_string(), "-");
    }
}
