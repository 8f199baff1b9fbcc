// cargo run --example pio_add_procid -- <dump> <output>
//! Copy a dump, appending a per-cell `processor_id` field computed from the
//! stored decomposition.
use pio_mesh::config::PioMeshConfig;
use pio_mesh::io::append_cell_array;
use pio_mesh::mesh::PioMesh;
use pio_mesh::mesh_error::PioError;
use std::fs::File;
use std::io::BufWriter;
use std::process::exit;

fn run(input: &str, output: &str) -> Result<usize, PioError> {
    let config = PioMeshConfig::default();
    let field = config.fields.processor_id.clone();
    let mut mesh = PioMesh::open(input, config)?;
    let ids: Vec<f64> = mesh
        .processor_assignment(None)?
        .processor_ids()
        .into_iter()
        .map(|p| p as f64)
        .collect();
    let mut src = mesh.into_file();
    let dst = BufWriter::new(File::create(output)?);
    append_cell_array(&mut src, dst, &field, 0, &ids)?;
    Ok(ids.len())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("\n\n   Usage: {} <filename> <output>\n\n", args[0]);
        exit(1);
    }
    match run(&args[1], &args[2]) {
        Ok(n) => println!("wrote {} with processor_id for {n} cells", args[2]),
        Err(e @ PioError::Construction { .. }) => {
            eprintln!("{e}");
            exit(2);
        }
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    }
}
