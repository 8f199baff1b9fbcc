//! Global material-slot offsets for rank-local cell blocks.
//!
//! Flat material arrays are written in file order, so the slots of the cells
//! owned by rank `r` start after all slots owned by ranks `0..r`. Each rank
//! knows only its own slot total; one all-gather of those totals lets every
//! rank compute its exclusive prefix sum and translate local row-pointer
//! ranges into file-relative slot ranges.

use crate::algs::communicator::Communicator;
use crate::mesh_error::{CommFailure, PioError};
use std::ops::Range;

/// Exclusive prefix sum over the ranks below `rank`.
pub fn exclusive_prefix(totals: &[i64], rank: usize) -> Result<u64, PioError> {
    let mut offset = 0u64;
    for (r, &t) in totals.iter().enumerate().take(rank) {
        let t = u64::try_from(t).map_err(|_| PioError::CommError {
            neighbor: r,
            source: CommFailure(format!("negative slot total {t}")),
        })?;
        offset += t;
    }
    Ok(offset)
}

/// Exchange the local slot total and return the global slot offset of this
/// rank's first slot. Collective: every rank must call it.
pub fn exchange_slot_offset<C: Communicator>(comm: &C, local_total: u64) -> Result<u64, PioError> {
    let totals = comm.all_gather_i64(local_total as i64)?;
    if totals.len() != comm.size() {
        return Err(PioError::CommError {
            neighbor: comm.rank(),
            source: CommFailure(format!(
                "all-gather returned {} values for {} ranks",
                totals.len(),
                comm.size()
            )),
        });
    }
    let offset = exclusive_prefix(&totals, comm.rank())?;
    log::debug!(
        "rank {} of {}: {} local slots at global slot {}",
        comm.rank(),
        comm.size(),
        local_total,
        offset
    );
    Ok(offset)
}

/// Contiguous block of cells owned by `rank` when `num_cell` cells are split
/// as evenly as possible, lower ranks taking the remainder.
pub fn rank_block(num_cell: usize, rank: usize, size: usize) -> Range<usize> {
    let size = size.max(1);
    let base = num_cell / size;
    let extra = num_cell % size;
    let start = rank * base + rank.min(extra);
    let len = base + usize::from(rank < extra);
    start.min(num_cell)..(start + len).min(num_cell)
}
