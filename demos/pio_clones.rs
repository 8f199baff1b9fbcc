// cargo run --example pio_clones -- <dump> [nprocs]
//! Clone-cell report for the decomposition stored in a dump, or for an even
//! split over a hypothetical processor count.
use pio_mesh::config::PioMeshConfig;
use pio_mesh::mesh::PioMesh;
use std::process::exit;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("\n\n   Usage: {} <filename> [nprocs]\n\n", args[0]);
        exit(1);
    }
    let nprocs = match args.get(2).map(|s| s.parse::<usize>()) {
        None => None,
        Some(Ok(n)) if n > 0 => Some(n),
        Some(_) => {
            eprintln!("nprocs must be a positive integer, got {}", args[2]);
            exit(1);
        }
    };

    let mut mesh = match PioMesh::open(&args[1], PioMeshConfig::default()) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("{e}");
            exit(2);
        }
    };
    let assignment = match mesh.processor_assignment(nprocs) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };
    println!("nprocs = {}", assignment.num_procs());
    match mesh.clone_stats(nprocs) {
        Ok(stats) => println!("{stats}"),
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    }
}
