//! Attaching read names and lengths to overlaps before output.

use crate::error::Result;
use crate::overlap::Overlap;
use crate::sequence::SequenceProvider;
use rayon::prelude::*;

/// Fill `query_read_name`, `target_read_name`, `query_length` and
/// `target_length` of every overlap.
///
/// Lookups run in parallel; on an unknown read id nothing is written.
pub fn update_read_names<Q, T>(overlaps: &mut [Overlap], query_reads: &Q, target_reads: &T) -> Result<()>
where
    Q: SequenceProvider + ?Sized,
    T: SequenceProvider + ?Sized,
{
    let names = overlaps
        .par_iter()
        .map(|o| {
            let query = query_reads.get_sequence_by_id(o.query_read_id)?;
            let target = target_reads.get_sequence_by_id(o.target_read_id)?;
            Ok((query, target))
        })
        .collect::<Result<Vec<_>>>()?;

    overlaps
        .par_iter_mut()
        .zip(names)
        .for_each(|(o, (query, target))| {
            o.query_read_name = query.name.clone();
            o.query_length = query.len() as u32;
            o.target_read_name = target.name.clone();
            o.target_length = target.len() as u32;
        });

    Ok(())
}
