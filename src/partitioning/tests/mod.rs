use super::*;

/// 1-D chain: cell `i` has low neighbor `i - 1` and high `i + 1`, 1-based.
fn chain(n: usize) -> NeighborArrays {
    NeighborArrays {
        low: (0..n as i64).collect(),
        high: (0..n as i64).map(|i| if i + 1 < n as i64 { i + 2 } else { 0 }).collect(),
    }
}

#[test]
fn chain_of_four_on_two_procs() {
    let assignment = ProcessorAssignment::from_block_sizes(&[2, 2], 4).unwrap();
    let stats = count_clones(&[0; 4], &[chain(4)], &assignment).unwrap();
    assert_eq!(stats.clones, 4);
    assert_eq!(stats.mothers, 0);
    assert_eq!(stats.leaf_evaluations, 4);
    assert_eq!(stats.ratio(), 1.0);
}

#[test]
fn mothers_counted_per_dimension() {
    let assignment = ProcessorAssignment::single(4);
    let dims = [chain(4), chain(4)];
    let stats = count_clones(&[0, 3, 0, 0], &dims, &assignment).unwrap();
    assert_eq!(stats.mothers, 2);
    assert_eq!(stats.leaf_evaluations, 6);
    // boundary refs of cells 0 and 3 in both dimensions
    assert_eq!(stats.clones, 4);
}

#[test]
fn self_reference_is_a_clone() {
    let nbrs = NeighborArrays {
        low: vec![1, 1],
        high: vec![2, 2],
    };
    let stats = count_clones(&[0, 0], &[nbrs], &ProcessorAssignment::single(2)).unwrap();
    // cell 0 low -> itself, cell 1 high -> itself
    assert_eq!(stats.clones, 2);
}

#[test]
fn neighbor_past_the_mesh_is_an_error() {
    let nbrs = NeighborArrays {
        low: vec![0, 9],
        high: vec![2, 0],
    };
    let err = count_clones(&[0, 0], &[nbrs], &ProcessorAssignment::single(2)).unwrap_err();
    assert!(matches!(err, PioError::NeighborOutOfRange { cell: 1, neighbor: 9, .. }));
}

#[test]
fn block_sizes_must_cover_cells() {
    assert!(matches!(
        ProcessorAssignment::from_block_sizes(&[2, 1], 4),
        Err(PioError::PartitionMismatch { covered: 3, num_cell: 4 })
    ));
    assert!(ProcessorAssignment::from_block_sizes(&[2, -1, 3], 4).is_err());
}

#[test]
fn owner_lookup_skips_empty_blocks() {
    let a = ProcessorAssignment::from_block_sizes(&[2, 0, 3], 5).unwrap();
    assert_eq!(a.proc_of(1), Some(0));
    assert_eq!(a.proc_of(2), Some(2));
    assert_eq!(a.proc_of(5), None);
    assert_eq!(a.processor_ids(), vec![0, 0, 2, 2, 2]);
    assert_eq!(a.block_sizes(), vec![2, 0, 3]);
}

#[test]
fn stored_falls_back_to_one_proc() {
    let a = ProcessorAssignment::from_stored(&[], 7).unwrap();
    assert_eq!(a.num_procs(), 1);
    assert_eq!(a.block(0), 0..7);
}

#[test]
fn synthetic_hands_out_carried_blocks() {
    assert_eq!(synthetic_partition(20, 1, 3), vec![6, 8, 6]);
    assert_eq!(synthetic_partition(64, 2, 4), vec![16, 16, 16, 16]);
    assert_eq!(synthetic_partition(10, 3, 1), vec![10]);
}

#[test]
fn stats_report() {
    let stats = CloneStats {
        num_cell: 4,
        clones: 4,
        mothers: 0,
        leaf_evaluations: 4,
    };
    let text = stats.to_string();
    assert!(text.contains("nClones = 4"));
    assert!(text.ends_with("Ratio = 1"));
}
