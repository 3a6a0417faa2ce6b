//! End-to-end runs of the full pre-processing pipeline on generated box
//! meshes: read, topology, partitioning, local meshes, output file.

use std::fmt::Write as _;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;

use meshpart::element::ElementType;
use meshpart::io::{self, DataFile};
use meshpart::partition::{Partition, PartitionOptions};
use meshpart::topology::Topology;

/// Generator v2.2 text for a structured box of `cells`^3 cubes, each split
/// into five tetrahedra, with the bottom boundary declared as triangles.
fn box_msh(cells: usize) -> String {
    let side = cells + 1;
    let node = |i: usize, j: usize, k: usize| (k * side + j) * side + i + 1;

    let mut text = String::from("$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n");
    let _ = writeln!(text, "{}", side * side * side);
    for k in 0..side {
        for j in 0..side {
            for i in 0..side {
                let _ = writeln!(text, "{} {} {} {}", node(i, j, k), i, j, k);
            }
        }
    }
    text.push_str("$EndNodes\n$Elements\n");
    let _ = writeln!(text, "{}", 2 * cells * cells + 5 * cells * cells * cells);

    let mut element = 0;
    for j in 0..cells {
        for i in 0..cells {
            // Bottom faces of the five-tet decomposition.
            let (v0, v1) = (node(i, j, 0), node(i + 1, j, 0));
            let (v2, v3) = (node(i, j + 1, 0), node(i + 1, j + 1, 0));
            for tri in [[v0, v1, v3], [v0, v3, v2]] {
                element += 1;
                let _ = writeln!(text, "{element} 2 2 0 7 {} {} {}", tri[0], tri[1], tri[2]);
            }
        }
    }
    for k in 0..cells {
        for j in 0..cells {
            for i in 0..cells {
                let v = [
                    node(i, j, k),
                    node(i + 1, j, k),
                    node(i, j + 1, k),
                    node(i + 1, j + 1, k),
                    node(i, j, k + 1),
                    node(i + 1, j, k + 1),
                    node(i, j + 1, k + 1),
                    node(i + 1, j + 1, k + 1),
                ];
                for tet in [
                    [v[0], v[1], v[3], v[5]],
                    [v[0], v[3], v[2], v[6]],
                    [v[0], v[5], v[4], v[6]],
                    [v[3], v[5], v[6], v[7]],
                    [v[0], v[3], v[5], v[6]],
                ] {
                    element += 1;
                    let _ = writeln!(
                        text,
                        "{element} 4 2 0 1 {} {} {} {}",
                        tet[0], tet[1], tet[2], tet[3]
                    );
                }
            }
        }
    }
    text.push_str("$EndElements\n");
    text
}

fn write_box(cells: usize) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.msh");
    std::fs::write(&path, box_msh(cells)).unwrap();
    (dir, path)
}

#[test]
fn test_box_mesh_counts_and_centroid() {
    let cells = 3;
    let (_dir, path) = write_box(cells);
    let mesh = io::read(&path, "msh").unwrap();

    let side = cells + 1;
    assert_eq!(mesh.dim(), 3);
    assert_eq!(mesh.num_nodes(), side * side * side);
    assert_eq!(
        mesh.elements_of_type(ElementType::Triangle).len(),
        2 * cells * cells
    );
    assert_eq!(
        mesh.elements_of_type(ElementType::Tetrahedron).len(),
        5 * cells * cells * cells
    );

    let centroid = mesh.nodes().mean_axis(ndarray::Axis(0)).unwrap();
    let expected = cells as f64 / 2.0;
    for axis in 0..3 {
        assert_abs_diff_eq!(centroid[axis], expected, epsilon = 1e-10);
    }
}

#[test]
fn test_attributions_cover_the_mesh_exactly_once() {
    let (_dir, path) = write_box(3);
    let mesh = io::read(&path, "msh").unwrap();
    let num_parts = 8;
    let partition = Partition::metis(&mesh, num_parts, &PartitionOptions::default()).unwrap();

    let num_cells = mesh.elements_of_dim(3).len();
    let mut cells: Vec<usize> = partition
        .element_attribution()
        .iter()
        .flatten()
        .copied()
        .collect();
    cells.sort_unstable();
    assert_eq!(cells, (0..num_cells).collect::<Vec<_>>());

    let mut nodes: Vec<usize> = partition
        .node_attribution()
        .iter()
        .flatten()
        .copied()
        .collect();
    nodes.sort_unstable();
    assert_eq!(nodes, (0..mesh.num_nodes()).collect::<Vec<_>>());
}

#[test]
fn test_partition_locality() {
    let (_dir, path) = write_box(3);
    let mesh = io::read(&path, "msh").unwrap();
    let topology = Topology::build(&mesh).unwrap();
    let num_parts = 4;
    let partition = Partition::metis(&mesh, num_parts, &PartitionOptions::default()).unwrap();

    for rank in 0..num_parts {
        let local = partition.local_mesh_data(&mesh, &topology, rank).unwrap();
        let owned = partition.node_attribution().group(rank);
        assert_eq!(local.num_owned, owned.len());
        for (position, &global) in local.nodes_g2l.iter().enumerate() {
            assert_eq!(
                position < local.num_owned,
                owned.binary_search(&global).is_ok()
            );
        }
        // The local adjacency restricted to the rank is symmetric.
        for (position, row) in local.adjacency.iter().enumerate() {
            let u = local.nodes_g2l[position];
            for &v in row {
                assert!(topology.adjacent_vertices().group(v).contains(&u));
            }
        }
    }
}

#[test]
fn test_face_cell_incidence_and_orientation() {
    let (_dir, path) = write_box(2);
    let mesh = io::read(&path, "msh").unwrap();
    let topology = Topology::build(&mesh).unwrap();

    let face_to_cell = topology.connectivity(2, 3).unwrap();
    let faces = topology.element_collections(2);
    let cells = topology.element_collections(3);
    let orientation = topology.orientation();
    assert_eq!(face_to_cell.len(), faces.len());

    let mut single_parent_faces = 0;
    for (face, parents) in face_to_cell.iter().enumerate() {
        if let [cell] = parents {
            single_parent_faces += 1;
            for vertex in faces.group(face) {
                assert!(cells.group(*cell).contains(vertex));
            }
            let ty =
                ElementType::from_vertex_count(cells.group(*cell).len(), mesh.dim()).unwrap();
            assert!(orientation.group(face)[0] < ty.num_subentities());
        }
    }
    // Every declared bottom triangle is a face of exactly one tetrahedron.
    assert_eq!(single_parent_faces, faces.len());
}

#[test]
fn test_output_file_round_trip() {
    let (_dir, path) = write_box(2);
    let mesh = io::read(&path, "msh").unwrap();
    let topology = Topology::build(&mesh).unwrap();
    let num_parts = 3;
    let partition = Partition::metis(&mesh, num_parts, &PartitionOptions::default()).unwrap();
    let locals: Vec<_> = (0..num_parts)
        .map(|rank| partition.local_mesh_data(&mesh, &topology, rank).unwrap())
        .collect();

    let out = _dir.path().join("mesh.h5");
    io::write(&out, "h5", &mesh, &partition, &locals, None).unwrap();

    let data = DataFile::from_postcard(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(
        data.float("/node/vector/0").unwrap().len(),
        mesh.num_nodes() * 3
    );
    assert_eq!(
        data.csr("/prime/element").unwrap().len(),
        mesh.elements_of_dim(3).len()
    );
    assert_eq!(
        data.uint("/secondary/ID/vector/0").unwrap(),
        vec![7; 8].as_slice()
    );
    for rank in 0..num_parts {
        let nodes = data
            .uint(&format!("/rank/{rank}/nodes_g2l/vector/0"))
            .unwrap();
        let elements = data.csr(&format!("/rank/{rank}/local_elements")).unwrap();
        assert_eq!(elements.len(), partition.element_attribution().group(rank).len());
        assert!(elements.data().iter().all(|&v| v < nodes.len()));
    }
}

#[test]
fn test_json_output_is_readable() {
    let (_dir, path) = write_box(2);
    let mesh = io::read(&path, "msh").unwrap();
    let topology = Topology::build(&mesh).unwrap();
    let partition = Partition::metis(&mesh, 2, &PartitionOptions::default()).unwrap();
    let locals: Vec<_> = (0..2)
        .map(|rank| partition.local_mesh_data(&mesh, &topology, rank).unwrap())
        .collect();

    let out = _dir.path().join("mesh.json");
    io::write(&out, "json", &mesh, &partition, &locals, None).unwrap();
    let value: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(&out).unwrap()).unwrap();
    assert!(value.get("datasets").is_some());
}

/// The reference box mesh of the original tool (131 753 nodes, 3 220
/// triangles, 741 065 tetrahedra) does not ship with the repository; point
/// `MESHPART_BOX_MSH` at it to run this check.
#[test]
#[ignore]
fn test_reference_box_mesh() {
    let path = std::env::var("MESHPART_BOX_MSH").expect("set MESHPART_BOX_MSH to run");
    let mesh = io::read(std::path::Path::new(&path), "msh").unwrap();

    assert_eq!(mesh.num_nodes(), 131_753);
    assert_eq!(mesh.elements_of_type(ElementType::Triangle).len(), 3_220);
    assert_eq!(
        mesh.elements_of_type(ElementType::Tetrahedron).len(),
        741_065
    );

    let centroid = mesh.nodes().mean_axis(ndarray::Axis(0)).unwrap();
    assert_abs_diff_eq!(centroid[0], 3.749_647_865_8, epsilon = 1e-10);
    assert_abs_diff_eq!(centroid[1], -0.005_098_642_278, epsilon = 1e-10);
    assert_abs_diff_eq!(centroid[2], -0.018_828_790_780_4, epsilon = 1e-10);

    let partition = Partition::metis(&mesh, 8, &PartitionOptions::default()).unwrap();
    let total_cells: usize = partition
        .element_attribution()
        .iter()
        .map(<[usize]>::len)
        .sum();
    let total_nodes: usize = partition
        .node_attribution()
        .iter()
        .map(<[usize]>::len)
        .sum();
    assert_eq!(total_cells, 741_065);
    assert_eq!(total_nodes, 131_753);
}
