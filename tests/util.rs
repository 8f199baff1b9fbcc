#![allow(dead_code)]
use pio_mesh::io::{HeaderTemplate, PioWriter};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// One material slot: (material id, volume fraction, density).
pub type Slot = (i64, f64, f64);

/// In-memory description of a dump, written with the conventional names.
#[derive(Clone, Debug)]
pub struct MeshFixture {
    /// Logical grid position `(x, y, z)` of every cell.
    pub positions: Vec<(usize, usize, usize)>,
    /// `centers[d][cell]`
    pub centers: Vec<Vec<f64>>,
    pub levels: Vec<i64>,
    pub daughters: Vec<i64>,
    /// `neighbors[2d + side][cell]`, 1-based, 0 = boundary.
    pub neighbors: Vec<Vec<i64>>,
    pub materials: Vec<Vec<Slot>>,
    pub n_mat: usize,
    pub pressure: Vec<f64>,
    pub partition: Option<Vec<i64>>,
}

fn slots_for(cell: usize) -> Vec<Slot> {
    let den = |id: i64| 100.0 * id as f64 + cell as f64;
    match cell % 3 {
        0 => vec![(1, 1.0, den(1))],
        1 => vec![(2, 1.0, den(2))],
        _ => vec![(1, 0.25, den(1)), (2, 0.75, den(2))],
    }
}

impl MeshFixture {
    /// `nx` x `ny` level-1 cells of unit width (both even), stored in 2x2
    /// child-order blocks, blocks in row-major order.
    pub fn uniform_grid(nx: usize, ny: usize) -> Self {
        assert!(nx % 2 == 0 && ny % 2 == 0);
        let n = nx * ny;
        let mut positions = Vec::with_capacity(n);
        for by in 0..ny / 2 {
            for bx in 0..nx / 2 {
                for c in 0..4 {
                    positions.push((2 * bx + c % 2, 2 * by + c / 2, 0));
                }
            }
        }
        let mut at = vec![0usize; n];
        for (cell, &(ix, iy, _)) in positions.iter().enumerate() {
            at[iy * nx + ix] = cell;
        }
        let nbr = |ix: isize, iy: isize| -> i64 {
            if ix < 0 || iy < 0 || ix >= nx as isize || iy >= ny as isize {
                0
            } else {
                at[iy as usize * nx + ix as usize] as i64 + 1
            }
        };
        let mut neighbors = vec![Vec::with_capacity(n); 4];
        for &(ix, iy, _) in &positions {
            let (ix, iy) = (ix as isize, iy as isize);
            neighbors[0].push(nbr(ix - 1, iy));
            neighbors[1].push(nbr(ix + 1, iy));
            neighbors[2].push(nbr(ix, iy - 1));
            neighbors[3].push(nbr(ix, iy + 1));
        }
        Self {
            centers: vec![
                positions.iter().map(|p| p.0 as f64 + 0.5).collect(),
                positions.iter().map(|p| p.1 as f64 + 0.5).collect(),
            ],
            positions,
            levels: vec![1; n],
            daughters: vec![0; n],
            neighbors,
            materials: (0..n).map(slots_for).collect(),
            n_mat: 2,
            pressure: (0..n).map(|i| 1000.0 + i as f64).collect(),
            partition: None,
        }
    }

    /// `nx` x `ny` x `nz` level-1 unit cells (all even), stored in 2x2x2
    /// child-order blocks, blocks in x-fastest order.
    pub fn uniform_grid_3d(nx: usize, ny: usize, nz: usize) -> Self {
        assert!(nx % 2 == 0 && ny % 2 == 0 && nz % 2 == 0);
        let n = nx * ny * nz;
        let mut positions = Vec::with_capacity(n);
        for bz in 0..nz / 2 {
            for by in 0..ny / 2 {
                for bx in 0..nx / 2 {
                    for c in 0..8 {
                        positions.push((2 * bx + c % 2, 2 * by + (c / 2) % 2, 2 * bz + c / 4));
                    }
                }
            }
        }
        let linear = |(ix, iy, iz): (usize, usize, usize)| (iz * ny + iy) * nx + ix;
        let mut at = vec![0usize; n];
        for (cell, &p) in positions.iter().enumerate() {
            at[linear(p)] = cell;
        }
        let shape = [nx as isize, ny as isize, nz as isize];
        let nbr = |q: [isize; 3]| -> i64 {
            if (0..3).any(|d| q[d] < 0 || q[d] >= shape[d]) {
                0
            } else {
                at[linear((q[0] as usize, q[1] as usize, q[2] as usize))] as i64 + 1
            }
        };
        let mut neighbors = vec![Vec::with_capacity(n); 6];
        for &(ix, iy, iz) in &positions {
            let p = [ix as isize, iy as isize, iz as isize];
            for d in 0..3 {
                for (side, step) in [-1isize, 1].into_iter().enumerate() {
                    let mut q = p;
                    q[d] += step;
                    neighbors[2 * d + side].push(nbr(q));
                }
            }
        }
        Self {
            centers: vec![
                positions.iter().map(|p| p.0 as f64 + 0.5).collect(),
                positions.iter().map(|p| p.1 as f64 + 0.5).collect(),
                positions.iter().map(|p| p.2 as f64 + 0.5).collect(),
            ],
            positions,
            levels: vec![1; n],
            daughters: vec![0; n],
            neighbors,
            materials: (0..n).map(slots_for).collect(),
            n_mat: 2,
            pressure: (0..n).map(|i| 1000.0 + i as f64).collect(),
            partition: None,
        }
    }

    /// `n` unit cells along x, one material everywhere.
    pub fn chain(n: usize) -> Self {
        let n64 = n as i64;
        Self {
            positions: (0..n).map(|i| (i, 0, 0)).collect(),
            centers: vec![(0..n).map(|i| i as f64 + 0.5).collect()],
            levels: vec![1; n],
            daughters: vec![0; n],
            neighbors: vec![
                (0..n64).collect(),
                (0..n64).map(|i| if i + 1 < n64 { i + 2 } else { 0 }).collect(),
            ],
            materials: (0..n).map(|i| vec![(1, 1.0, i as f64)]).collect(),
            n_mat: 1,
            pressure: (0..n).map(|i| i as f64).collect(),
            partition: None,
        }
    }

    pub fn with_partition(mut self, sizes: &[i64]) -> Self {
        self.partition = Some(sizes.to_vec());
        self
    }

    pub fn n_cell(&self) -> usize {
        self.levels.len()
    }

    /// Same mesh with cells stored in a different order: new cell `j` is
    /// old cell `order[j]`.
    pub fn permuted(&self, order: &[usize]) -> Self {
        let mut new_of_old = vec![0usize; order.len()];
        for (j, &old) in order.iter().enumerate() {
            new_of_old[old] = j;
        }
        let pick = |v: &Vec<f64>| order.iter().map(|&o| v[o]).collect::<Vec<_>>();
        Self {
            positions: order.iter().map(|&o| self.positions[o]).collect(),
            centers: self.centers.iter().map(pick).collect(),
            levels: order.iter().map(|&o| self.levels[o]).collect(),
            daughters: order.iter().map(|&o| self.daughters[o]).collect(),
            neighbors: self
                .neighbors
                .iter()
                .map(|nb| {
                    order
                        .iter()
                        .map(|&o| match nb[o] {
                            0 => 0,
                            v => new_of_old[v as usize - 1] as i64 + 1,
                        })
                        .collect()
                })
                .collect(),
            materials: order.iter().map(|&o| self.materials[o].clone()).collect(),
            n_mat: self.n_mat,
            pressure: pick(&self.pressure),
            partition: self.partition.clone(),
        }
    }

    pub fn nummat(&self) -> Vec<f64> {
        self.materials.iter().map(|m| m.len() as f64).collect()
    }

    pub fn flat(&self, pick: impl Fn(&Slot) -> f64) -> Vec<f64> {
        self.materials.iter().flatten().map(pick).collect()
    }

    /// Expected dense array of material `id` for one value column.
    pub fn dense(&self, id: i64, pick: impl Fn(&Slot) -> f64) -> Vec<f64> {
        self.materials
            .iter()
            .map(|m| m.iter().find(|s| s.0 == id).map_or(0.0, &pick))
            .collect()
    }

    /// Arrays in the order they are written.
    pub fn arrays(&self) -> Vec<(String, u32, Vec<f64>)> {
        let f = |v: &[i64]| v.iter().map(|&x| x as f64).collect::<Vec<_>>();
        let mut out = Vec::new();
        for (d, c) in self.centers.iter().enumerate() {
            out.push(("cell_center".to_string(), d as u32 + 1, c.clone()));
        }
        out.push(("cell_level".into(), 0, f(&self.levels)));
        out.push(("cell_daughter".into(), 0, f(&self.daughters)));
        for (i, nb) in self.neighbors.iter().enumerate() {
            out.push(("cell_index".into(), i as u32 + 1, f(nb)));
        }
        for m in 1..=self.n_mat {
            out.push(("matdef".into(), m as u32, vec![m as f64]));
        }
        out.push(("chunk_nummat".into(), 0, self.nummat()));
        out.push(("chunk_mat".into(), 0, self.flat(|s| s.0 as f64)));
        out.push(("chunk_vol".into(), 0, self.flat(|s| s.1)));
        out.push(("frac_den".into(), 0, self.flat(|s| s.2)));
        out.push(("pres".into(), 0, self.pressure.clone()));
        if let Some(p) = &self.partition {
            out.push(("global_numcell".into(), 0, f(p)));
        }
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bytes_with(|_, _, _| {})
    }

    /// Write the dump, letting `edit` alter each array on the way out.
    pub fn to_bytes_with(&self, edit: impl Fn(&str, u32, &mut Vec<f64>)) -> Vec<u8> {
        let mut w = PioWriter::new(Cursor::new(Vec::new()), HeaderTemplate::default()).unwrap();
        for (name, index, mut data) in self.arrays() {
            edit(&name, index, &mut data);
            w.write_array(&name, index, &data).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}

/// Overwrite the `f64` at byte `pos`.
pub fn patch_f64(bytes: &mut [u8], pos: usize, value: f64) {
    bytes[pos..pos + 8].copy_from_slice(&value.to_ne_bytes());
}
