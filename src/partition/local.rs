//! Materialisation of one rank's local mesh.
//!
//! The local vertex numbering is the composition of a bandwidth-reducing
//! permutation of the rank's vertex graph with a ghost-last reshuffle:
//! vertices owned by the rank end up in the leading positions, vertices
//! borrowed from other ranks in the trailing ones, and within each class
//! the reducer's order is preserved.

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::csr::CsrList;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::reorder::BandwidthReduction;
use crate::topology::Topology;

use super::Partition;

/// The renumbered mesh of a single rank.
#[derive(Debug, Clone)]
pub struct LocalMesh {
    /// Global node index at each local position; owned nodes first.
    pub nodes_g2l: Vec<usize>,
    /// Cell connectivity in local vertex indices.
    pub elements: CsrList<usize>,
    /// Rows of the global vertex adjacency, one per local vertex in local
    /// order; entries keep their global indices.
    pub adjacency: CsrList<usize>,
    /// 1 for ghost positions; zeros first, ones last.
    pub ghost_mask: Vec<u8>,
    /// Number of leading non-ghost positions.
    pub num_owned: usize,
}

impl Partition {
    /// Builds the local mesh of `rank`.
    pub fn local_mesh_data(
        &self,
        mesh: &Mesh,
        topology: &Topology,
        rank: usize,
    ) -> Result<LocalMesh> {
        if rank >= self.num_parts() {
            return Err(Error::InvalidInput(format!(
                "rank {rank} out of range for {} parts",
                self.num_parts()
            )));
        }
        let prime_element_list = topology.element_collections(mesh.dim());
        let cells = self.element_attribution().group(rank);

        // Global indices of every vertex the rank touches.
        let local_to_global: Vec<usize> = cells
            .iter()
            .flat_map(|&cell| prime_element_list.group(cell).iter().copied())
            .sorted_unstable()
            .dedup()
            .collect();
        let num_local = local_to_global.len();

        let mut global_to_local: FxHashMap<usize, usize> = FxHashMap::default();
        global_to_local.reserve(num_local);
        for (local, &global) in local_to_global.iter().enumerate() {
            global_to_local.insert(global, local);
        }

        // Cell connectivity translated to local indices, cell order and
        // within-cell vertex order preserved.
        let mut elements = CsrList::new();
        for &cell in cells {
            elements.push_back(prime_element_list.group(cell));
        }
        for vertex in elements.data_mut() {
            *vertex = global_to_local[vertex];
        }

        // Ghost detection against the rank's owned-node set, which is
        // ascending by construction.
        let owned = self.node_attribution().group(rank);
        let ghosted: Vec<u8> = local_to_global
            .iter()
            .map(|global| u8::from(owned.binary_search(global).is_err()))
            .collect();
        let num_owned = ghosted.iter().filter(|&&g| g == 0).count();

        // Bandwidth reduction of the local vertex graph, then ghost-last
        // composition: ghost positions are pushed past the end and the
        // whole map is compacted back by ranking.
        let local_graph = local_vertex_connectivity(&elements);
        let mapping = BandwidthReduction::new(&local_graph).compute();
        debug_assert_eq!(mapping.len(), num_local);
        let shifted: Vec<usize> = mapping
            .iter()
            .zip(&ghosted)
            .map(|(&position, &ghost)| position + num_local * usize::from(ghost))
            .collect();
        let mut by_position: Vec<usize> = (0..num_local).collect();
        by_position.sort_unstable_by_key(|&local| shifted[local]);
        let mut permutation = vec![0; num_local];
        for (position, &local) in by_position.iter().enumerate() {
            permutation[local] = position;
        }

        // Apply the composed permutation to the vertex list, the cell
        // connectivity and the ghost mask.
        let mut nodes_g2l = vec![0; num_local];
        let mut ghost_mask = vec![0u8; num_local];
        for local in 0..num_local {
            nodes_g2l[permutation[local]] = local_to_global[local];
            ghost_mask[permutation[local]] = ghosted[local];
        }
        for vertex in elements.data_mut() {
            *vertex = permutation[*vertex];
        }
        debug_assert!(ghost_mask.windows(2).all(|w| w[0] <= w[1]));

        // Global adjacency rows in the new local order.
        let graph = topology.adjacent_vertices();
        let mut adjacency = CsrList::new();
        for &global in &nodes_g2l {
            adjacency.push_back(graph.group(global));
        }

        Ok(LocalMesh {
            nodes_g2l,
            elements,
            adjacency,
            ghost_mask,
            num_owned,
        })
    }
}

/// Symmetric vertex-vertex graph induced by a set of local cells: two
/// vertices are adjacent when they co-occur in at least one cell, and every
/// vertex is adjacent to itself.
fn local_vertex_connectivity(elements: &CsrList<usize>) -> CsrList<usize> {
    let num_local = elements.data().iter().max().map_or(0, |&m| m + 1);
    let expected_bandwidth = 24;
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_local];
    for cache in &mut adjacency {
        cache.reserve(expected_bandwidth);
    }

    for vertex_list in elements {
        for &vertex in vertex_list {
            adjacency[vertex].extend_from_slice(vertex_list);
        }
    }

    let mut local_graph = CsrList::new();
    for cache in &mut adjacency {
        cache.sort_unstable();
        cache.dedup();
        local_graph.push_back(cache);
    }
    local_graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::examples::{tet_box, two_tets};
    use crate::partition::PartitionOptions;

    fn pipeline(mesh: &Mesh, num_parts: usize) -> (Topology, Partition) {
        let topology = Topology::build(mesh).unwrap();
        let partition = Partition::metis(mesh, num_parts, &PartitionOptions::default()).unwrap();
        (topology, partition)
    }

    #[test]
    fn test_single_rank_has_no_ghosts() {
        let mesh = two_tets();
        let (topology, partition) = pipeline(&mesh, 1);
        let local = partition.local_mesh_data(&mesh, &topology, 0).unwrap();

        assert_eq!(local.nodes_g2l.len(), 5);
        assert_eq!(local.num_owned, 5);
        assert!(local.ghost_mask.iter().all(|&g| g == 0));
        assert_eq!(local.elements.len(), 2);
    }

    #[test]
    fn test_local_elements_reference_local_range() {
        let mesh = tet_box(3);
        let (topology, partition) = pipeline(&mesh, 4);
        for rank in 0..4 {
            let local = partition.local_mesh_data(&mesh, &topology, rank).unwrap();
            let n = local.nodes_g2l.len();
            assert!(local.elements.data().iter().all(|&v| v < n));
            assert_eq!(
                local.elements.len(),
                partition.element_attribution().group(rank).len()
            );
        }
    }

    #[test]
    fn test_ghosts_come_last_and_match_ownership() {
        let mesh = tet_box(3);
        let (topology, partition) = pipeline(&mesh, 4);
        for rank in 0..4 {
            let local = partition.local_mesh_data(&mesh, &topology, rank).unwrap();
            let owned = partition.node_attribution().group(rank);

            assert_eq!(local.num_owned, owned.len());
            for (position, &global) in local.nodes_g2l.iter().enumerate() {
                let is_owned = owned.binary_search(&global).is_ok();
                assert_eq!(position < local.num_owned, is_owned);
                assert_eq!(local.ghost_mask[position] == 0, is_owned);
            }
        }
    }

    #[test]
    fn test_every_local_vertex_is_referenced() {
        let mesh = tet_box(2);
        let (topology, partition) = pipeline(&mesh, 2);
        for rank in 0..2 {
            let local = partition.local_mesh_data(&mesh, &topology, rank).unwrap();
            let mut seen = vec![false; local.nodes_g2l.len()];
            for &v in local.elements.data() {
                seen[v] = true;
            }
            assert!(seen.into_iter().all(|s| s));
        }
    }

    #[test]
    fn test_adjacency_rows_follow_the_permutation() {
        let mesh = tet_box(2);
        let (topology, partition) = pipeline(&mesh, 2);
        let graph = topology.adjacent_vertices();
        for rank in 0..2 {
            let local = partition.local_mesh_data(&mesh, &topology, rank).unwrap();
            assert_eq!(local.adjacency.len(), local.nodes_g2l.len());
            for (position, &global) in local.nodes_g2l.iter().enumerate() {
                assert_eq!(local.adjacency.group(position), graph.group(global));
            }
        }
    }

    #[test]
    fn test_out_of_range_rank_is_rejected() {
        let mesh = two_tets();
        let (topology, partition) = pipeline(&mesh, 2);
        assert!(partition.local_mesh_data(&mesh, &topology, 2).is_err());
    }
}
