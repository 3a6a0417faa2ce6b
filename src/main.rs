use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};

use meshpart::error::{Error, Result};
use meshpart::io;
use meshpart::partition::{Partition, PartitionOptions};
use meshpart::topology::Topology;

/// Pre-process an unstructured mesh for a parallel solver: build its
/// topology, partition it and emit the renumbered per-rank local meshes.
#[derive(Parser, Debug)]
#[command(name = "meshpart", version, group(
    ArgGroup::new("input_source").required(true).args(["input", "input_positional"])
))]
struct Cli {
    /// The input mesh file (gmsh only)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Positional form of --input
    #[arg(value_name = "INPUT")]
    input_positional: Option<PathBuf>,

    /// Format of the input file (gmsh only)
    #[arg(long = "input_fmt", default_value = "msh")]
    input_fmt: String,

    /// The output mesh file
    #[arg(short, long)]
    output: PathBuf,

    /// Format of the output mesh file
    #[arg(long = "output_fmt", default_value = "h5")]
    output_fmt: String,

    /// Partition the mesh into N parts
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    num: u64,

    /// File of nodal mappings for periodic boundary conditions
    #[arg(short, long)]
    periodic: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::from(match error {
                Error::InvalidInput(_) => 3,
                Error::Io(_) => 4,
                Error::OracleFailure(_) | Error::ConsistencyViolation(_) => 1,
            })
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let input = cli
        .input
        .as_ref()
        .or(cli.input_positional.as_ref())
        .expect("clap enforces an input source");
    let num_parts = cli.num as usize;

    let mesh = io::read(input, &cli.input_fmt)?;
    log::info!(
        "read {}d mesh: {} nodes, {} elements",
        mesh.dim(),
        mesh.num_nodes(),
        mesh.num_elements()
    );

    let periodic = cli
        .periodic
        .as_deref()
        .map(|path| io::read_periodic_pairs(path, mesh.num_nodes()))
        .transpose()?;

    let topology = Topology::build(&mesh)?;
    log::info!(
        "topology built: {} boundary entities",
        topology.element_collections(mesh.dim() - 1).len()
    );

    let partition = Partition::metis(&mesh, num_parts, &PartitionOptions::default())?;
    let locals = (0..num_parts)
        .map(|rank| {
            let local = partition.local_mesh_data(&mesh, &topology, rank)?;
            log::info!(
                "rank {rank}: {} cells, {} nodes ({} ghosted)",
                local.elements.len(),
                local.nodes_g2l.len(),
                local.nodes_g2l.len() - local.num_owned
            );
            Ok(local)
        })
        .collect::<Result<Vec<_>>>()?;

    io::write(
        &cli.output,
        &cli.output_fmt,
        &mesh,
        &partition,
        &locals,
        periodic.as_deref(),
    )?;
    log::info!("wrote {}", cli.output.display());
    Ok(())
}
