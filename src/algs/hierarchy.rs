//! AMR level hierarchy: dimensionality, level count, per-level cell extents,
//! leaf cells by level, and the root mesh shape.
//!
//! The hydrodynamics code refines by halving in every dimension and stores
//! the first block of the coarsest level in child order, so the neighbor of
//! cell 0 in dimension `d` is cell [`CHILD_NEIGHBOR_OFFSETS`]`[d]`. Extents
//! are derived from that structural convention rather than from a general
//! geometric search.

use crate::io::reader::PioFile;

/// Index of cell 0's neighbor in each dimension within the first block of
/// the coarsest level (child order `x + 2y + 4z`).
pub const CHILD_NEIGHBOR_OFFSETS: [usize; 3] = [1, 2, 4];

/// Extents are carried for three dimensions; those beyond `ndim` stay 1.0.
pub const PADDED_DIMS: usize = 3;

/// Cell count and dimensionality read off the directory.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CellLayout {
    pub ndim: usize,
    pub num_cell: usize,
}

/// `ndim` is the highest sub-index of the center field; `num_cell` its length.
pub fn cell_layout<R>(file: &PioFile<R>, center: &str) -> CellLayout {
    file.entries()
        .iter()
        .filter(|e| e.name == center)
        .fold(CellLayout::default(), |acc, e| CellLayout {
            ndim: acc.ndim.max(e.index as usize),
            num_cell: e.length as usize,
        })
}

/// Highest level value in `levels` (0 for an empty mesh).
pub fn max_level(levels: &[i64]) -> usize {
    levels.iter().copied().max().unwrap_or(0).max(0) as usize
}

/// Cell extent of every level `0..=n_level`, computed once and immutable.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelHierarchy {
    n_level: usize,
    ndim: usize,
    dxyz: Vec<[f64; PADDED_DIMS]>,
}

impl LevelHierarchy {
    /// Build from the level array and cell centers (`centers[d][cell]`).
    ///
    /// Level 1 takes half the center distance between cell 0 and its
    /// child-order neighbor; each finer level halves the previous one.
    /// Levels 0 and 1 are always present.
    pub fn build(levels: &[i64], centers: &[Vec<f64>]) -> Self {
        let n_level = max_level(levels);
        let ndim = centers.len().min(PADDED_DIMS);
        let mut dxyz = vec![[1.0; PADDED_DIMS]; n_level.max(1) + 1];

        for d in 0..ndim {
            let c = &centers[d];
            match (c.first(), c.get(CHILD_NEIGHBOR_OFFSETS[d])) {
                (Some(&c0), Some(&cn)) => dxyz[1][d] = 0.5 * (cn - c0),
                _ => log::warn!(
                    "dimension {d}: {} cells are too few to derive the level-1 extent",
                    c.len()
                ),
            }
        }
        for l in 2..dxyz.len() {
            for d in 0..ndim {
                dxyz[l][d] = 0.5 * dxyz[l - 1][d];
            }
        }
        Self { n_level, ndim, dxyz }
    }

    /// Highest level present in the mesh.
    pub fn n_level(&self) -> usize {
        self.n_level
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Extents indexed by level.
    pub fn dxyz(&self) -> &[[f64; PADDED_DIMS]] {
        &self.dxyz
    }

    pub fn extent(&self, level: usize) -> Option<&[f64; PADDED_DIMS]> {
        self.dxyz.get(level)
    }

    /// Extent of the finest level present.
    pub fn finest(&self) -> &[f64; PADDED_DIMS] {
        &self.dxyz[self.n_level]
    }
}

/// Leaf cells grouped by level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafLevels {
    /// `cells[l]` lists the leaf cells on level `l`, in file order.
    pub cells: Vec<Vec<usize>>,
}

impl LeafLevels {
    /// Number of leaves on each level.
    pub fn counts(&self) -> Vec<usize> {
        self.cells.iter().map(Vec::len).collect()
    }

    pub fn total(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }
}

/// Group every leaf cell (daughter <= 0) by its level.
pub fn leaves_by_level(levels: &[i64], daughters: &[i64]) -> LeafLevels {
    let mut cells = vec![Vec::new(); max_level(levels) + 1];
    for (i, (&lvl, &dtr)) in levels.iter().zip(daughters).enumerate() {
        if dtr > 0 {
            continue;
        }
        cells[lvl.max(0) as usize].push(i);
    }
    LeafLevels { cells }
}

/// Root (coarsest) mesh size in cells per dimension.
///
/// Uses cell 0, its child-order neighbor, and the last cell on cell 0's
/// level: `r[d] = 1 + round((c_last - c_0) / (c_nbr - c_0))`.
pub fn root_mesh_size(levels: &[i64], centers: &[Vec<f64>]) -> Vec<usize> {
    let ndim = centers.len().min(PADDED_DIMS);
    let Some(&l0) = levels.first() else {
        return vec![0; ndim];
    };
    let last = levels.iter().rposition(|&l| l == l0).unwrap_or(0);
    (0..ndim)
        .map(|d| {
            let c = &centers[d];
            let (Some(&c0), Some(&cn), Some(&ce)) =
                (c.first(), c.get(CHILD_NEIGHBOR_OFFSETS[d]), c.get(last))
            else {
                return 1;
            };
            let step = cn - c0;
            if step == 0.0 {
                return 1;
            }
            (1.0 + ((ce - c0) / step).round()).max(1.0) as usize
        })
        .collect()
}
