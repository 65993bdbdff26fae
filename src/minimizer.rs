//! Canonical k-mer encoding.
//!
//! A k-mer is packed two bits per base (A=0, C=1, G=2, T=3) on both strands and
//! the numerically smaller of the two codes is kept, so the same window read off
//! either strand gets the same representation.

use crate::error::{OverlapError, Result};

/// Longest window whose 2-bit packing fits in a u64
pub const MAX_KMER_LENGTH: usize = 32;

/// Strand that produced a canonical representation
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// One occurrence of a minimizer in a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minimizer {
    representation: u64,
    position: usize,
    direction: Direction,
    sequence_id: u64,
}

impl Minimizer {
    pub fn new(representation: u64, position: usize, direction: Direction, sequence_id: u64) -> Self {
        Minimizer {
            representation,
            position,
            direction,
            sequence_id,
        }
    }

    pub fn representation(&self) -> u64 {
        self.representation
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }
}

/// 2-bit code of a base; anything outside ACGT packs as A
#[inline]
fn base_code(base: u8) -> u64 {
    match base.to_ascii_uppercase() {
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 0,
    }
}

/// Check if byte represents a DNA base
#[inline]
pub fn is_dna_base(b: u8) -> bool {
    matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

/// Encode `bases[start..start + length]` as its canonical representation.
///
/// Returns the smaller of the forward and reverse-complement packings along with
/// the strand it came from. Ties go to `Forward`.
pub fn encode(bases: &[u8], start: usize, length: usize) -> Result<(u64, Direction)> {
    let end = start.checked_add(length);
    if length > MAX_KMER_LENGTH || end.map_or(true, |end| end > bases.len()) {
        return Err(OverlapError::InvalidRange {
            start,
            length,
            sequence_length: bases.len(),
        });
    }

    let window = &bases[start..start + length];

    let forward = window
        .iter()
        .fold(0u64, |acc, &b| (acc << 2) | base_code(b));
    let reverse = window
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 2) | (3 - base_code(b)));

    if reverse < forward {
        Ok((reverse, Direction::Reverse))
    } else {
        Ok((forward, Direction::Forward))
    }
}
