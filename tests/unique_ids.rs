mod util;

use pio_mesh::algs::renumber::is_permutation;
use pio_mesh::config::PioMeshConfig;
use pio_mesh::mesh::PioMesh;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::io::Cursor;
use util::MeshFixture;

fn mesh_of(fx: &MeshFixture) -> PioMesh<Cursor<Vec<u8>>> {
    PioMesh::from_reader(Cursor::new(fx.to_bytes()), PioMeshConfig::with_unique_ids())
        .unwrap()
}

/// Keep the first child-order block of `block` cells in place and shuffle
/// the rest.
fn shuffled_order(n: usize, block: usize, seed: u64) -> Vec<usize> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    order[block..].shuffle(&mut rng);
    order
}

/// Grid positions of `fx` in z-major, then y, then x order.
fn row_major(fx: &MeshFixture) -> Vec<(usize, usize, usize)> {
    let mut expected = fx.positions.clone();
    expected.sort_by_key(|&(ix, iy, iz)| (iz, iy, ix));
    expected
}

#[test]
fn map_is_a_permutation() {
    let mesh = mesh_of(&MeshFixture::uniform_grid(8, 6));
    let map = mesh.unique_map().unwrap();
    assert_eq!(map.len(), 48);
    assert!(is_permutation(map));
    let mut sorted = map.to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..48).collect::<Vec<_>>());
}

#[test]
fn canonical_order_is_row_major() {
    let fx = MeshFixture::uniform_grid(6, 4);
    let mesh = mesh_of(&fx);
    let positions: Vec<_> = mesh
        .unique_map()
        .unwrap()
        .iter()
        .map(|&cell| fx.positions[cell])
        .collect();
    assert_eq!(positions, row_major(&fx));
}

#[test]
fn independent_of_storage_order() {
    let fx = MeshFixture::uniform_grid(8, 8);
    let reference = mesh_of(&fx);
    let want_x = reference.apply_unique_map(&fx.centers[0]).unwrap();
    let want_p = reference.apply_unique_map(&fx.pressure).unwrap();

    for seed in [1, 7, 42] {
        let other = fx.permuted(&shuffled_order(fx.n_cell(), 4, seed));
        let mut mesh = mesh_of(&other);
        assert_eq!(mesh.dxyz(), reference.dxyz());
        let centers = mesh.apply_unique_map_2d(mesh.centers()).unwrap();
        assert_eq!(centers[0], want_x);
        let pres = mesh.get_field("pres", 0).unwrap();
        assert_eq!(mesh.apply_unique_map(&pres).unwrap(), want_p);
    }
}

#[test]
fn built_lazily_without_config_flag() {
    let fx = MeshFixture::chain(6).permuted(&[0, 1, 5, 3, 4, 2]);
    let mesh = PioMesh::from_reader(Cursor::new(fx.to_bytes()), PioMeshConfig::default()).unwrap();
    assert_eq!(mesh.unique_map().unwrap(), &[0, 1, 5, 3, 4, 2]);
}

#[test]
fn wrong_length_field_is_rejected() {
    let mesh = mesh_of(&MeshFixture::uniform_grid(2, 2));
    assert!(mesh.apply_unique_map(&[1.0, 2.0]).is_err());
}

#[test]
fn map_is_a_permutation_in_3d() {
    let fx = MeshFixture::uniform_grid_3d(4, 4, 4);
    let mesh = mesh_of(&fx);
    let map = mesh.unique_map().unwrap();
    assert_eq!(map.len(), 64);
    assert!(is_permutation(map));
    let positions: Vec<_> = map.iter().map(|&cell| fx.positions[cell]).collect();
    assert_eq!(positions, row_major(&fx));
}

#[test]
fn independent_of_storage_order_in_3d() {
    let fx = MeshFixture::uniform_grid_3d(4, 4, 2);
    let reference = mesh_of(&fx);
    let want_centers = reference.apply_unique_map_2d(&fx.centers).unwrap();
    let want_p = reference.apply_unique_map(&fx.pressure).unwrap();

    for seed in [3, 11] {
        let other = fx.permuted(&shuffled_order(fx.n_cell(), 8, seed));
        let mut mesh = mesh_of(&other);
        assert_eq!(mesh.dxyz(), reference.dxyz());
        assert_eq!(mesh.apply_unique_map_2d(mesh.centers()).unwrap(), want_centers);
        let pres = mesh.get_field("pres", 0).unwrap();
        assert_eq!(mesh.apply_unique_map(&pres).unwrap(), want_p);
    }
}

#[test]
fn deep_refinement_far_from_origin() {
    // grid indices near 6.6e6 per axis; the z term alone exceeds i64
    let mut fx = MeshFixture::uniform_grid_3d(4, 4, 4);
    let last = fx.n_cell() - 1;
    fx.levels[last] = 8;
    for d in 0..3 {
        fx.centers[d][last] = 100.5;
    }
    let mesh = mesh_of(&fx);
    assert_eq!(mesh.n_level(), 8);
    let map = mesh.unique_map().unwrap();
    assert!(is_permutation(map));
    assert_eq!(map[last], last);
    let rest: Vec<_> = map[..last].iter().map(|&cell| fx.positions[cell]).collect();
    let mut expected = row_major(&fx);
    expected.retain(|&p| p != fx.positions[last]);
    assert_eq!(rest, expected);
}
