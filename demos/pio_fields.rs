// cargo run --example pio_fields -- <dump>
//! List the arrays of a dump with their dimensions.
use pio_mesh::config::PioMeshConfig;
use pio_mesh::mesh::PioMesh;
use std::process::exit;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("\n\n   Usage: {} <filename>\n\n", args[0]);
        exit(1);
    }
    let mesh = match PioMesh::open(&args[1], PioMeshConfig::default()) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("{e}");
            exit(2);
        }
    };

    println!("{}", mesh.file().header());
    for (name, dims) in mesh.file().all_dims() {
        println!("{name:>24}  length {:>10}  width {:>3}", dims.length, dims.width);
    }
    println!("ndim = {}", mesh.n_dim());
    println!("numcell = {}", mesh.n_cell());
    println!("nLevel = {}", mesh.n_level());
    println!("nMat = {}", mesh.n_mat());
    println!("root mesh = {:?}", mesh.root_mesh_size());
    for (level, n) in mesh.leaves_by_level().counts().iter().enumerate() {
        println!("level {level}: {n} leaf cells");
    }
}
