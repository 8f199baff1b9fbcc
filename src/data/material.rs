//! Compressed-row material layout.
//!
//! Each cell owns a contiguous run of material *slots* in flat arrays; the
//! row pointer maps cell `i` to slots `row_ptr[i]..row_ptr[i + 1]`. The
//! slot-indexed id array names the material of each slot, and every
//! material-valued field (volume fraction, density, ...) stores one value
//! per slot with the same addressing.
//!
//! # Invariants
//! - `row_ptr.len() == num_cells + 1`, `row_ptr[0] == 0`, non-decreasing.
//! - `row_ptr[num_cells] == material_ids.len()`.

use crate::mesh_error::PioError;
use std::collections::BTreeMap;
use std::ops::Range;

/// Dense per-material arrays keyed by material id.
pub type MaterialMap = BTreeMap<i64, Vec<f64>>;

/// Exclusive prefix sum of per-cell material counts (length `n + 1`).
pub fn row_pointer(counts: &[i64]) -> Result<Vec<usize>, PioError> {
    let mut row_ptr = Vec::with_capacity(counts.len() + 1);
    let mut acc = 0usize;
    row_ptr.push(acc);
    for (cell, &n) in counts.iter().enumerate() {
        let n = usize::try_from(n).map_err(|_| {
            PioError::MaterialLayout(format!("cell {cell} has negative material count {n}"))
        })?;
        acc += n;
        row_ptr.push(acc);
    }
    Ok(row_ptr)
}

/// Material layout of a contiguous block of cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialCsr {
    row_ptr: Vec<usize>,
    material_ids: Vec<i64>,
    n_material: usize,
}

impl MaterialCsr {
    /// Build from per-cell counts and the slot-indexed ids.
    ///
    /// `n_material` is the system-wide material count (the width of the
    /// material definition field), not the number of ids seen here.
    pub fn new(counts: &[i64], material_ids: Vec<i64>, n_material: usize) -> Result<Self, PioError> {
        let row_ptr = row_pointer(counts)?;
        let total = *row_ptr.last().unwrap_or(&0);
        if material_ids.len() != total {
            return Err(PioError::MaterialLayout(format!(
                "{} material ids for {} slots",
                material_ids.len(),
                total
            )));
        }
        Ok(Self {
            row_ptr,
            material_ids,
            n_material,
        })
    }

    /// Layout with no material slots in any of `num_cells` cells.
    pub fn empty(num_cells: usize, n_material: usize) -> Self {
        Self {
            row_ptr: vec![0; num_cells + 1],
            material_ids: Vec::new(),
            n_material,
        }
    }

    /// Cells covered by the layout.
    pub fn num_cells(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// System-wide material count.
    pub fn n_material(&self) -> usize {
        self.n_material
    }

    /// Row pointer, length `num_cells + 1`.
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Material id of every slot.
    pub fn material_ids(&self) -> &[i64] {
        &self.material_ids
    }

    /// Total slot count, `row_ptr[num_cells]`.
    pub fn total_slots(&self) -> usize {
        self.row_ptr[self.num_cells()]
    }

    /// Slots owned by one cell.
    pub fn slots(&self, cell: usize) -> Range<usize> {
        self.row_ptr[cell]..self.row_ptr[cell + 1]
    }

    /// Slots owned by cells `start..start + count`.
    pub fn slot_range(&self, start: usize, count: usize) -> Result<Range<usize>, PioError> {
        let out_of_bounds = PioError::RangeOutOfBounds {
            start,
            end: start.saturating_add(count),
            len: self.num_cells(),
        };
        match start.checked_add(count) {
            Some(end) if end <= self.num_cells() => Ok(self.row_ptr[start]..self.row_ptr[end]),
            _ => Err(out_of_bounds),
        }
    }

    /// Scatter slot values of cells `start..start + count` into one dense,
    /// zero-filled array of length `count` per material.
    ///
    /// `values[k]` belongs to slot `slot_range(start, count).start + k`. The
    /// map holds every id `1..=n_material` plus any other id present in the
    /// range; materials absent from a cell read as 0.0 there. A `values`
    /// slice shorter than the slot range (a short read) fills what it covers.
    pub fn materials_by_id(
        &self,
        values: &[f64],
        start: usize,
        count: usize,
    ) -> Result<MaterialMap, PioError> {
        let slots = self.slot_range(start, count)?;
        if values.len() < slots.len() {
            log::warn!(
                "material values cover {} of {} slots; missing slots read as 0",
                values.len(),
                slots.len()
            );
        }
        let mut out = MaterialMap::new();
        for id in 1..=self.n_material as i64 {
            out.insert(id, vec![0.0; count]);
        }

        // One material system-wide and one slot per cell: the values are the field.
        if self.n_material == 1 && slots.len() == count {
            let dense = out.entry(1).or_default();
            let n = values.len().min(count);
            dense[..n].copy_from_slice(&values[..n]);
            return Ok(out);
        }

        for local in 0..count {
            for slot in self.slots(start + local) {
                let Some(&v) = values.get(slot - slots.start) else {
                    continue;
                };
                let id = self.material_ids[slot];
                out.entry(id).or_insert_with(|| vec![0.0; count])[local] = v;
            }
        }
        Ok(out)
    }

    /// Dense array of one material over cells `start..start + count`.
    pub fn material_values(
        &self,
        values: &[f64],
        material: i64,
        start: usize,
        count: usize,
    ) -> Result<Vec<f64>, PioError> {
        let slots = self.slot_range(start, count)?;
        let mut dense = vec![0.0; count];
        for (local, d) in dense.iter_mut().enumerate() {
            for slot in self.slots(start + local) {
                if self.material_ids[slot] == material {
                    if let Some(&v) = values.get(slot - slots.start) {
                        *d = v;
                    }
                }
            }
        }
        Ok(dense)
    }

    /// Check the row-pointer invariants.
    pub fn validate(&self) -> Result<(), PioError> {
        if self.row_ptr.first() != Some(&0) {
            return Err(PioError::MaterialLayout("row pointer must start at 0".into()));
        }
        if let Some(i) = self.row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(PioError::MaterialLayout(format!(
                "row pointer decreases at cell {i}"
            )));
        }
        if self.total_slots() != self.material_ids.len() {
            return Err(PioError::MaterialLayout(format!(
                "{} slots but {} ids",
                self.total_slots(),
                self.material_ids.len()
            )));
        }
        Ok(())
    }
}
