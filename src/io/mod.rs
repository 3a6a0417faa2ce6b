//! Mesh input and partitioned-output serialisation.
//!
//! `read` dispatches on the input format tag, `write` on the output one.
//! The partitioned output is a hierarchical dataset container (see
//! [`datafile`]) serialised either as a compact binary file (`h5` tag) or
//! as JSON/YAML for inspection.

mod datafile;
pub mod gmsh;

pub use datafile::{DataFile, Dataset};

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::partition::{LocalMesh, Partition};

/// Reads a mesh file in the given format (`msh`/`gmsh`).
pub fn read(path: &Path, format: &str) -> Result<Mesh> {
    match format {
        "msh" | "gmsh" => gmsh::read(path),
        other => Err(Error::InvalidInput(format!(
            "unsupported input format: {other}"
        ))),
    }
}

/// Writes the partitioned mesh in the given format (`h5`/`json`/`yaml`).
pub fn write(
    path: &Path,
    format: &str,
    mesh: &Mesh,
    partition: &Partition,
    locals: &[LocalMesh],
    periodic: Option<&[(usize, usize)]>,
) -> Result<()> {
    let data = build_data_file(mesh, partition, locals, periodic);
    let mut file = File::create(path)?;
    match format {
        "h5" => file.write_all(&data.to_postcard()?)?,
        "json" => serde_json::to_writer(file, &data).map_err(std::io::Error::other)?,
        "yaml" | "yml" => serde_yaml::to_writer(file, &data).map_err(std::io::Error::other)?,
        other => {
            return Err(Error::InvalidInput(format!(
                "unsupported output format: {other}"
            )));
        }
    }
    Ok(())
}

/// Assembles the full output container: global mesh artefacts, one group of
/// local artefacts per rank, and the periodic node map when present.
pub fn build_data_file(
    mesh: &Mesh,
    partition: &Partition,
    locals: &[LocalMesh],
    periodic: Option<&[(usize, usize)]>,
) -> DataFile {
    let mut data = DataFile::new();
    data.put_vector_f64("/node", mesh.nodes().iter().copied());

    let dim = mesh.dim();
    data.put_csr("/prime/element", &mesh.elements_of_dim(dim));
    data.put_vector_u64("/prime/ID", mesh.ids_of_dim(dim).iter().map(|&v| v as u64));
    data.put_csr("/secondary/element", &mesh.elements_of_dim(dim - 1));
    data.put_vector_u64(
        "/secondary/ID",
        mesh.ids_of_dim(dim - 1).iter().map(|&v| v as u64),
    );

    data.put_csr("/partition/element", partition.element_attribution());
    data.put_csr("/partition/node", partition.node_attribution());

    for (rank, local) in locals.iter().enumerate() {
        let prefix = format!("/rank/{rank}");
        data.put_vector_u64(
            &format!("{prefix}/nodes_g2l"),
            local.nodes_g2l.iter().map(|&v| v as u64),
        );
        data.put_csr(&format!("{prefix}/local_elements"), &local.elements);
        data.put_csr(&format!("{prefix}/local_adjacency"), &local.adjacency);
        data.put_vector_u64(
            &format!("{prefix}/ghost_mask"),
            local.ghost_mask.iter().map(|&v| u64::from(v)),
        );
        data.put_scalar(&format!("{prefix}/num_owned"), local.num_owned as u64);
    }

    if let Some(pairs) = periodic {
        data.put_map(
            "/periodic",
            pairs
                .iter()
                .map(|&(a, b)| (a as u64, b as u64))
                .collect::<Vec<_>>(),
        );
    }
    data
}

/// Reads a periodic boundary-condition file: whitespace-separated pairs of
/// 1-based node identifiers, one pair per line, `#` starting a comment.
pub fn read_periodic_pairs(path: &Path, num_nodes: usize) -> Result<Vec<(usize, usize)>> {
    let file = File::open(path)?;
    let mut pairs = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let mut tokens = content.split_whitespace();
        let pair = (tokens.next(), tokens.next(), tokens.next());
        let (Some(first), Some(second), None) = pair else {
            return Err(Error::InvalidInput(format!(
                "periodic file line {} is not a node pair: {line}",
                index + 1
            )));
        };
        let mut parse = |token: &str| -> Result<usize> {
            let id: usize = token.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "periodic file line {}: bad node id `{token}`",
                    index + 1
                ))
            })?;
            let id = id.checked_sub(1).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "periodic file line {}: node ids are 1-based",
                    index + 1
                ))
            })?;
            if id >= num_nodes {
                return Err(Error::InvalidInput(format!(
                    "periodic file line {}: node {} outside the mesh",
                    index + 1,
                    id + 1
                )));
            }
            Ok(id)
        };
        pairs.push((parse(first)?, parse(second)?));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::examples::two_tets;
    use crate::partition::PartitionOptions;
    use crate::topology::Topology;

    fn partitioned() -> (Mesh, Partition, Vec<LocalMesh>) {
        let mesh = two_tets();
        let topology = Topology::build(&mesh).unwrap();
        let partition = Partition::metis(&mesh, 2, &PartitionOptions::default()).unwrap();
        let locals = (0..2)
            .map(|rank| partition.local_mesh_data(&mesh, &topology, rank).unwrap())
            .collect();
        (mesh, partition, locals)
    }

    #[test]
    fn test_data_file_layout() {
        let (mesh, partition, locals) = partitioned();
        let data = build_data_file(&mesh, &partition, &locals, Some(&[(0, 4)]));

        assert_eq!(
            data.float("/node/vector/0").unwrap().len(),
            mesh.num_nodes() * mesh.dim()
        );
        let prime = data.csr("/prime/element").unwrap();
        assert_eq!(prime.len(), 2);
        assert_eq!(data.uint("/prime/ID/vector/0").unwrap(), &[10, 11]);
        assert_eq!(data.csr("/secondary/element").unwrap().len(), 2);

        for rank in 0..2 {
            let owned = data
                .uint(&format!("/rank/{rank}/num_owned/scalar/0"))
                .unwrap()[0] as usize;
            let mask = data
                .uint(&format!("/rank/{rank}/ghost_mask/vector/0"))
                .unwrap();
            assert_eq!(mask.iter().filter(|&&g| g == 0).count(), owned);
            assert!(data.csr(&format!("/rank/{rank}/local_elements")).is_some());
        }
        assert_eq!(data.uint("/periodic/map/0").unwrap(), &[0]);
        assert_eq!(data.uint("/periodic/map/1").unwrap(), &[4]);
    }

    #[test]
    fn test_binary_write_read_round_trip() {
        let (mesh, partition, locals) = partitioned();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.h5");
        write(&path, "h5", &mesh, &partition, &locals, None).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let back = DataFile::from_postcard(&bytes).unwrap();
        assert_eq!(back, build_data_file(&mesh, &partition, &locals, None));
    }

    #[test]
    fn test_unknown_formats_are_rejected() {
        let (mesh, partition, locals) = partitioned();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.out");
        assert!(write(&path, "vtk", &mesh, &partition, &locals, None).is_err());
        assert!(read(&path, "stl").is_err());
    }

    #[test]
    fn test_periodic_pairs_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("periodic.txt");
        std::fs::write(&path, "# header\n1 5\n2 6 # inline\n\n").unwrap();
        let pairs = read_periodic_pairs(&path, 6).unwrap();
        assert_eq!(pairs, vec![(0, 4), (1, 5)]);

        std::fs::write(&path, "1 99\n").unwrap();
        assert!(read_periodic_pairs(&path, 6).is_err());
        std::fs::write(&path, "1\n").unwrap();
        assert!(read_periodic_pairs(&path, 6).is_err());
    }
}
