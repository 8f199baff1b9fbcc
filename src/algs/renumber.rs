//! Processor-count independent cell ordering.
//!
//! Two dumps of the same logical mesh written by runs with different
//! processor counts store their cells in different orders. Quantizing every
//! center onto the finest-level grid and sorting by a mixed-radix key of the
//! grid indices yields an order that depends only on geometry.
//!
//! Cells sharing a key keep their relative file order (stable sort), so the
//! map is deterministic even for coincident centers.

use crate::algs::hierarchy::{LevelHierarchy, PADDED_DIMS};
use crate::mesh_error::PioError;
use num_traits::ToPrimitive;

/// Grid indices of one cell on the finest level.
pub type GridIndex = [i128; PADDED_DIMS];

/// Integer grid index of every cell on the finest level:
/// `round(c * 2^n_level / dxyz[n_level])`.
///
/// Every center component must hold as many values as the first one.
pub fn quantize_centers(
    centers: &[Vec<f64>],
    hierarchy: &LevelHierarchy,
) -> Result<Vec<GridIndex>, PioError> {
    let num_cell = centers.first().map_or(0, Vec::len);
    let scale = 2f64.powi(hierarchy.n_level().min(i32::MAX as usize) as i32);
    let dxyz = hierarchy.finest();

    let mut grid = vec![[0i128; PADDED_DIMS]; num_cell];
    for (d, column) in centers.iter().take(PADDED_DIMS).enumerate() {
        if column.len() != num_cell {
            return Err(PioError::LengthMismatch {
                field: format!("center component {}", d + 1),
                expected: num_cell,
                found: column.len(),
            });
        }
        for (cell, (g, &c)) in grid.iter_mut().zip(column).enumerate() {
            g[d] = (scale * c / dxyz[d] + 0.5)
                .floor()
                .to_i128()
                .ok_or(PioError::KeyOverflow { cell })?;
        }
    }
    Ok(grid)
}

/// Mixed-radix keys `g0 + n0*g1 + n0*n1*g2`, where `n` is the largest grid
/// index seen per dimension. Terms beyond `ndim` are omitted.
pub fn spatial_keys(grid: &[GridIndex], ndim: usize) -> Result<Vec<i128>, PioError> {
    let mut n_max = [0i128; PADDED_DIMS];
    for g in grid {
        for d in 0..ndim.min(PADDED_DIMS) {
            n_max[d] = n_max[d].max(g[d]);
        }
    }
    grid.iter()
        .enumerate()
        .map(|(cell, g)| {
            let mut key = Some(g[0]);
            if ndim > 1 {
                key = key.zip(n_max[0].checked_mul(g[1])).and_then(|(k, t)| k.checked_add(t));
            }
            if ndim > 2 {
                let term = n_max[0]
                    .checked_mul(n_max[1])
                    .and_then(|r| r.checked_mul(g[2]));
                key = key.zip(term).and_then(|(k, t)| k.checked_add(t));
            }
            key.ok_or(PioError::KeyOverflow { cell })
        })
        .collect()
}

/// Canonical permutation: entry `i` is the file index of the `i`-th cell in
/// spatial order.
pub fn unique_spatial_map(
    centers: &[Vec<f64>],
    hierarchy: &LevelHierarchy,
) -> Result<Vec<usize>, PioError> {
    let grid = quantize_centers(centers, hierarchy)?;
    let keys = spatial_keys(&grid, centers.len())?;
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&i| keys[i]);
    Ok(order)
}

/// Reorder a per-cell array into canonical order: `out[i] = field[map[i]]`.
pub fn apply_permutation<T: Copy>(field: &[T], map: &[usize]) -> Result<Vec<T>, PioError> {
    map.iter()
        .map(|&src| {
            field.get(src).copied().ok_or(PioError::RangeOutOfBounds {
                start: src,
                end: src + 1,
                len: field.len(),
            })
        })
        .collect()
}

/// True if `map` holds every index `0..map.len()` exactly once.
pub fn is_permutation(map: &[usize]) -> bool {
    let mut seen = vec![false; map.len()];
    for &i in map {
        match seen.get_mut(i) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}
