//! Clone (ghost) cell counting.
//!
//! Every leaf cell looks at its low and high neighbor in each dimension. A
//! neighbor reference is a *clone* when it crosses the domain boundary (no
//! neighbor, or the cell pointing at itself) or crosses a processor
//! boundary. Mother cells are tallied once per dimension instead. The ratio
//! `(clones + mothers) / leaf_evaluations` estimates the ghost-layer overhead
//! of a decomposition.

use super::ProcessorAssignment;
use crate::mesh_error::PioError;
use itertools::izip;
use std::fmt;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Neighbor arrays of one dimension, 1-based with 0 meaning "none".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborArrays {
    pub low: Vec<i64>,
    pub high: Vec<i64>,
}

/// Tallies of one clone count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CloneStats {
    pub num_cell: usize,
    pub clones: u64,
    pub mothers: u64,
    pub leaf_evaluations: u64,
}

impl CloneStats {
    /// `(clones + mothers) / leaf_evaluations`; NaN for a mesh without leaves.
    pub fn ratio(&self) -> f64 {
        if self.leaf_evaluations == 0 {
            return f64::NAN;
        }
        (self.clones + self.mothers) as f64 / self.leaf_evaluations as f64
    }

    fn merge(self, other: Self) -> Self {
        Self {
            num_cell: self.num_cell,
            clones: self.clones + other.clones,
            mothers: self.mothers + other.mothers,
            leaf_evaluations: self.leaf_evaluations + other.leaf_evaluations,
        }
    }
}

impl fmt::Display for CloneStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "numcell = {}", self.num_cell)?;
        writeln!(f, "nClones = {}", self.clones)?;
        writeln!(f, "nMother = {}", self.mothers)?;
        writeln!(f, "nTop = {}", self.leaf_evaluations)?;
        write!(f, "Ratio = {}", self.ratio())
    }
}

/// Is the 1-based `neighbor` of `cell` a clone under `owner`?
fn is_clone(
    cell: usize,
    neighbor: i64,
    owner: &[usize],
    num_cell: usize,
) -> Result<bool, PioError> {
    let nbr = neighbor - 1;
    if nbr < 0 || nbr as usize == cell {
        return Ok(true);
    }
    let nbr = nbr as usize;
    if nbr >= num_cell {
        return Err(PioError::NeighborOutOfRange {
            cell,
            neighbor,
            num_cell,
        });
    }
    Ok(owner[nbr] != owner[cell])
}

fn count_dimension(
    dim: &NeighborArrays,
    daughters: &[i64],
    owner: &[usize],
) -> Result<CloneStats, PioError> {
    let num_cell = owner.len();
    let mut stats = CloneStats {
        num_cell,
        ..CloneStats::default()
    };
    for (cell, (&dtr, &lo, &hi)) in izip!(daughters, &dim.low, &dim.high).enumerate() {
        if dtr > 0 {
            stats.mothers += 1;
            continue;
        }
        stats.leaf_evaluations += 1;
        stats.clones += u64::from(is_clone(cell, lo, owner, num_cell)?);
        stats.clones += u64::from(is_clone(cell, hi, owner, num_cell)?);
    }
    Ok(stats)
}

/// Count clones of a decomposition over all `neighbors.len()` dimensions.
pub fn count_clones(
    daughters: &[i64],
    neighbors: &[NeighborArrays],
    assignment: &ProcessorAssignment,
) -> Result<CloneStats, PioError> {
    let num_cell = assignment.num_cell();
    if daughters.len() != num_cell {
        return Err(PioError::PartitionMismatch {
            covered: num_cell,
            num_cell: daughters.len(),
        });
    }
    if let Some(short) = neighbors
        .iter()
        .find(|n| n.low.len() != num_cell || n.high.len() != num_cell)
    {
        return Err(PioError::MissingField(format!(
            "neighbor arrays hold {}/{} values for {num_cell} cells",
            short.low.len(),
            short.high.len()
        )));
    }
    let owner = assignment.processor_ids();
    let empty = CloneStats {
        num_cell,
        ..CloneStats::default()
    };

    #[cfg(feature = "rayon")]
    let per_dim: Vec<CloneStats> = neighbors
        .par_iter()
        .map(|dim| count_dimension(dim, daughters, &owner))
        .collect::<Result<_, _>>()?;
    #[cfg(not(feature = "rayon"))]
    let per_dim: Vec<CloneStats> = neighbors
        .iter()
        .map(|dim| count_dimension(dim, daughters, &owner))
        .collect::<Result<_, _>>()?;

    Ok(per_dim.into_iter().fold(empty, CloneStats::merge))
}
