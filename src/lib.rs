// Library exports for ovlrefine
pub mod error;
pub mod finalize;
pub mod fusion;
pub mod index;
pub mod matcher;
pub mod minimizer;
pub mod overlap;
pub mod overlapper;
pub mod paf;
pub mod pipeline;
pub mod rescue;
pub mod sequence;
