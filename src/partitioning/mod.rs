//! Processor assignment of cells and decomposition quality.
//!
//! A decomposition is an ordered list of per-processor cell counts; their
//! prefix sums split `0..num_cell` into contiguous disjoint blocks, block `p`
//! going to processor `p`.

pub mod metrics;

pub use self::metrics::{CloneStats, NeighborArrays, count_clones};

use crate::mesh_error::PioError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Processor index.
pub type ProcId = usize;

/// Contiguous per-processor cell blocks covering `0..num_cell`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorAssignment {
    /// `starts[p]..starts[p + 1]` are the cells of processor `p`.
    starts: Vec<usize>,
}

impl ProcessorAssignment {
    /// Build from per-processor cell counts, which must sum to `num_cell`.
    pub fn from_block_sizes(sizes: &[i64], num_cell: usize) -> Result<Self, PioError> {
        let mut starts = Vec::with_capacity(sizes.len() + 1);
        let mut covered = 0usize;
        starts.push(0);
        for &n in sizes {
            let n = usize::try_from(n).map_err(|_| PioError::PartitionMismatch {
                covered,
                num_cell,
            })?;
            covered += n;
            starts.push(covered);
        }
        if covered != num_cell {
            return Err(PioError::PartitionMismatch { covered, num_cell });
        }
        Ok(Self { starts })
    }

    /// One processor owning every cell.
    pub fn single(num_cell: usize) -> Self {
        Self {
            starts: vec![0, num_cell],
        }
    }

    /// Stored decomposition (`global_numcell` values), or a single processor
    /// when the dump carries none.
    pub fn from_stored(sizes: &[i64], num_cell: usize) -> Result<Self, PioError> {
        if sizes.is_empty() {
            log::info!("no stored decomposition; assigning all {num_cell} cells to processor 0");
            return Ok(Self::single(num_cell));
        }
        Self::from_block_sizes(sizes, num_cell)
    }

    /// Even decomposition for a hypothetical processor count, see
    /// [`synthetic_partition`].
    pub fn synthetic(num_cell: usize, ndim: usize, nprocs: usize) -> Result<Self, PioError> {
        let sizes = synthetic_partition(num_cell, ndim, nprocs);
        let sizes: Vec<i64> = sizes.into_iter().map(|n| n as i64).collect();
        Self::from_block_sizes(&sizes, num_cell)
    }

    pub fn num_procs(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn num_cell(&self) -> usize {
        self.starts[self.num_procs()]
    }

    /// Cells owned by processor `p`.
    pub fn block(&self, p: ProcId) -> Range<usize> {
        self.starts[p]..self.starts[p + 1]
    }

    pub fn block_sizes(&self) -> Vec<usize> {
        self.starts.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Owner of `cell`, or `None` past the last cell.
    pub fn proc_of(&self, cell: usize) -> Option<ProcId> {
        if cell >= self.num_cell() {
            return None;
        }
        // Last start <= cell; empty blocks share a start, so skip past them.
        Some(self.starts.partition_point(|&s| s <= cell) - 1)
    }

    /// Owner of every cell, in cell order.
    pub fn processor_ids(&self) -> Vec<ProcId> {
        let mut ids = Vec::with_capacity(self.num_cell());
        for p in 0..self.num_procs() {
            ids.extend(std::iter::repeat(p).take(self.block(p).len()));
        }
        ids
    }
}

/// Per-processor cell counts for `nprocs` processors.
///
/// Blocks are multiples of `2^ndim` cells (one refinement family): the
/// nominal share is rounded down to a block multiple, the discarded
/// remainder accumulates and an extra block is handed out whenever a full
/// block's worth has built up. The last processor takes the rest.
pub fn synthetic_partition(num_cell: usize, ndim: usize, nprocs: usize) -> Vec<usize> {
    let nprocs = nprocs.max(1);
    let block = 1usize << ndim.min(3);
    let share = (num_cell as f64 / nprocs as f64).round() as usize;
    let remainder = share % block;
    let quantum = share - remainder;
    log::debug!("quantum={quantum}, remainder={remainder}, block={block}");

    let mut sizes = Vec::with_capacity(nprocs);
    let mut end = 0usize;
    let mut carried = 0usize;
    for p in 0..nprocs {
        let start = end;
        if p == nprocs - 1 {
            end = num_cell;
        } else {
            carried += remainder;
            let extra = if carried >= block {
                carried -= block;
                block
            } else {
                0
            };
            end = (start + quantum + extra).min(num_cell);
        }
        sizes.push(end - start);
    }
    sizes
}

#[cfg(test)]
mod tests;
