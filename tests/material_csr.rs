mod util;

use pio_mesh::config::PioMeshConfig;
use pio_mesh::mesh::PioMesh;
use pio_mesh::mesh_error::PioError;
use std::io::Cursor;
use util::MeshFixture;

fn mesh_of(fx: &MeshFixture, config: PioMeshConfig) -> PioMesh<Cursor<Vec<u8>>> {
    PioMesh::from_reader(Cursor::new(fx.to_bytes()), config).unwrap()
}

#[test]
fn layout_matches_slot_arrays() {
    let fx = MeshFixture::uniform_grid(4, 4);
    let mesh = mesh_of(&fx, PioMeshConfig::default());
    let csr = mesh.materials();
    csr.validate().unwrap();
    assert_eq!(csr.num_cells(), 16);
    assert_eq!(csr.total_slots(), mesh.field_length("chunk_mat") as usize);
    assert_eq!(csr.total_slots(), mesh.field_length("chunk_vol") as usize);
    assert!(csr.row_ptr().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(mesh.slot_offset(), 0);
}

#[test]
fn whole_mesh_scatter() {
    let fx = MeshFixture::uniform_grid(4, 4);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    let vol = mesh.material_field("chunk_vol").unwrap();
    assert_eq!(vol.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(vol[&1], fx.dense(1, |s| s.1));
    assert_eq!(vol[&2], fx.dense(2, |s| s.1));
    // volume fractions of every cell sum to one
    for cell in 0..16 {
        assert_eq!(vol[&1][cell] + vol[&2][cell], 1.0);
    }
}

#[test]
fn ranged_scatter_equals_slice_of_whole() {
    let fx = MeshFixture::uniform_grid(4, 4);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    let whole = mesh.material_field("chunk_vol").unwrap();
    for (start, count) in [(0, 1), (5, 4), (11, 5), (16, 0)] {
        let part = mesh.material_field_range("chunk_vol", start, count).unwrap();
        for (id, dense) in &part {
            assert_eq!(dense.len(), count);
            assert_eq!(dense, &whole[id][start..start + count], "id {id} at {start}");
        }
    }
    assert!(matches!(
        mesh.material_field_range("chunk_vol", 12, 5),
        Err(PioError::RangeOutOfBounds { .. })
    ));
}

#[test]
fn single_material_extraction() {
    let fx = MeshFixture::uniform_grid(4, 2);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    assert_eq!(
        mesh.material_field_index("chunk_vol", 2).unwrap(),
        fx.dense(2, |s| s.1)
    );
    assert_eq!(
        mesh.material_field_index_range("chunk_vol", 1, 2, 3).unwrap(),
        &fx.dense(1, |s| s.1)[2..5]
    );
}

#[test]
fn cells_without_materials_read_zero() {
    let mut fx = MeshFixture::uniform_grid(4, 2);
    fx.materials[3].clear();
    fx.materials[4].clear();
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    assert_eq!(mesh.materials().slots(3).len(), 0);
    let vol = mesh.material_field("chunk_vol").unwrap();
    for dense in vol.values() {
        assert_eq!(dense.len(), 8);
        assert_eq!(dense[3], 0.0);
        assert_eq!(dense[4], 0.0);
    }
}

#[test]
fn absent_material_in_range_is_zero_filled() {
    // cells 0 and 3 hold material 1 only
    let fx = MeshFixture::uniform_grid(4, 2);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    let part = mesh.material_field_range("chunk_vol", 3, 1).unwrap();
    assert_eq!(part[&1], vec![1.0]);
    assert_eq!(part[&2], vec![0.0]);
}

#[test]
fn fallback_name_is_tried_once() {
    let fx = MeshFixture::uniform_grid(4, 2);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    assert_eq!(mesh.resolve_material_field("chunk_den").as_deref(), Some("frac_den"));
    let den = mesh.material_field("chunk_den").unwrap();
    assert_eq!(den[&1], fx.dense(1, |s| s.2));
    assert!(mesh.material_field("chunk_missing").unwrap().is_empty());
    assert!(mesh.material_field("other_den").unwrap().is_empty());
}

#[test]
fn fallback_can_be_disabled() {
    let fx = MeshFixture::uniform_grid(4, 2);
    let config = PioMeshConfig {
        material_fallback: None,
        ..PioMeshConfig::default()
    };
    let mut mesh = mesh_of(&fx, config);
    assert!(mesh.material_field("chunk_den").unwrap().is_empty());
}

#[test]
fn one_material_system_copies() {
    let fx = MeshFixture::chain(6);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    assert_eq!(mesh.n_mat(), 1);
    let den = mesh.material_field("frac_den").unwrap();
    assert_eq!(den.len(), 1);
    assert_eq!(den[&1], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn oversized_count_is_out_of_bounds() {
    let fx = MeshFixture::uniform_grid(4, 2);
    let mut mesh = mesh_of(&fx, PioMeshConfig::default());
    assert!(matches!(
        mesh.material_field_range("chunk_vol", 1, usize::MAX),
        Err(PioError::RangeOutOfBounds { start: 1, end: usize::MAX, .. })
    ));
    assert!(matches!(
        mesh.material_field_index_range("chunk_vol", 1, 2, usize::MAX),
        Err(PioError::RangeOutOfBounds { .. })
    ));
}
