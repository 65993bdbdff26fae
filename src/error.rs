//! Contract-violation errors raised by the overlap engine.
//!
//! None of these are recovered locally: each one means the caller fed a
//! stage something it promised not to (an out-of-range window, unsorted
//! anchors, a read id the sequence provider does not know).

#[derive(Debug, Clone, PartialEq)]
pub enum OverlapError {
    /// A base window does not fit in the sequence or in a 64-bit code.
    InvalidRange {
        start: usize,
        length: usize,
        sequence_length: usize,
    },
    /// Input violated an ordering or id-range precondition of a stage.
    PreconditionViolation(String),
    /// The sequence provider has no read with this id.
    UnknownReadId(u64),
}

impl std::fmt::Display for OverlapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapError::InvalidRange {
                start,
                length,
                sequence_length,
            } => write!(
                f,
                "Invalid range: window {}..{} (length {}) on a sequence of length {}",
                start,
                start.saturating_add(*length),
                length,
                sequence_length
            ),
            OverlapError::PreconditionViolation(msg) => {
                write!(f, "Precondition violation: {}", msg)
            }
            OverlapError::UnknownReadId(id) => write!(f, "Unknown read id: {}", id),
        }
    }
}

impl std::error::Error for OverlapError {}

pub type Result<T> = std::result::Result<T, OverlapError>;
