//! Construction of the full incidence lattice of a mesh.
//!
//! Starting from nothing but the per-dimension cell-to-vertex lists, the
//! builder derives every `(d0, d1)` incidence for `0 <= d0, d1 <= dim`, the
//! vertex adjacency graph of the volume cells, and the table giving, for
//! each boundary entity, the local face index it occupies inside each of
//! its parent cells.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::csr::CsrList;
use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// The fully built incidence lattice.
///
/// Immutable after [`Topology::build`]; all accessors hand out views.
#[derive(Debug)]
pub struct Topology {
    element_aggregations: Vec<CsrList<usize>>,
    connectivity: BTreeMap<(usize, usize), CsrList<usize>>,
    adjacent_vertices: CsrList<usize>,
    orientation: CsrList<usize>,
}

impl Topology {
    /// Builds every incidence of the mesh.
    ///
    /// Fails with [`Error::ConsistencyViolation`] when a boundary entity
    /// references a vertex absent from one of its parent cells, which means
    /// the input connectivity is corrupt.
    pub fn build(mesh: &Mesh) -> Result<Self> {
        let mut builder = Builder {
            mesh,
            element_aggregations: Vec::with_capacity(mesh.dim() + 1),
            connectivity: BTreeMap::new(),
        };
        for dim in 0..=mesh.dim() {
            builder.collect_mesh_entities(dim);
        }
        builder.build_all_connectivity();
        let adjacent_vertices = builder.build_vertex_adjacency_list();
        let orientation = builder.build_orientation_of_subentities()?;
        log::debug!(
            "incidence lattice built: {} tables, {} adjacency entries",
            builder.connectivity.len(),
            adjacent_vertices.data().len()
        );
        Ok(Self {
            element_aggregations: builder.element_aggregations,
            connectivity: builder.connectivity,
            adjacent_vertices,
            orientation,
        })
    }

    /// Incidence from dimension-`dim0` entities to dimension-`dim1`
    /// entities. `None` when the mesh has no entities supporting the pair;
    /// the diagonal is the identity and is not stored.
    pub fn connectivity(&self, dim0: usize, dim1: usize) -> Option<&CsrList<usize>> {
        self.connectivity.get(&(dim0, dim1))
    }

    /// Vertex-to-vertex adjacency over the volume cells. Every vertex is a
    /// member of its own group.
    pub fn adjacent_vertices(&self) -> &CsrList<usize> {
        &self.adjacent_vertices
    }

    /// All vertex lists of the dimension-`dim` entities, concatenated in
    /// canonical type order.
    pub fn element_collections(&self, dim: usize) -> &CsrList<usize> {
        &self.element_aggregations[dim]
    }

    /// For each boundary entity, the local sub-entity index it occupies in
    /// each parent cell; same group structure as `connectivity(dim - 1,
    /// dim)`.
    pub fn orientation(&self) -> &CsrList<usize> {
        &self.orientation
    }
}

struct Builder<'a> {
    mesh: &'a Mesh,
    element_aggregations: Vec<CsrList<usize>>,
    connectivity: BTreeMap<(usize, usize), CsrList<usize>>,
}

impl Builder<'_> {
    fn collect_mesh_entities(&mut self, dim: usize) {
        self.element_aggregations.push(self.mesh.elements_of_dim(dim));
    }

    fn size_of(&self, key: (usize, usize)) -> usize {
        self.connectivity.get(&key).map_or(0, CsrList::len)
    }

    /// `(dim0, dim1)` already exists; derives `(dim1, dim0)` by transposing
    /// it and padding trailing empty groups up to the entity count of
    /// `dim1`.
    fn construct_reverse_map(&mut self, dim0: usize, dim1: usize) {
        if self.size_of((dim0, dim1)) == 0 || self.size_of((dim1, dim0)) != 0 {
            return;
        }
        let mut reversed = self.connectivity[&(dim0, dim1)].reverse();
        let num_entities = self.element_aggregations[dim1].len();
        while reversed.len() < num_entities {
            reversed.push_back(&[]);
        }
        self.connectivity.insert((dim1, dim0), reversed);
    }

    fn build_all_connectivity(&mut self) {
        let dim = self.mesh.dim();
        for i in 0..=dim {
            for j in 0..=dim {
                self.build_connectivity_pair(j, i);
            }
        }
    }

    fn build_connectivity_pair(&mut self, dim0: usize, dim1: usize) {
        if dim0 == dim1 || self.size_of((dim0, dim1)) != 0 {
            return;
        }
        if dim0 == 0 || dim1 == 0 {
            let entity_dim = dim0 + dim1;
            if self.size_of((entity_dim, 0)) == 0 {
                self.connectivity
                    .insert((entity_dim, 0), self.element_aggregations[entity_dim].clone());
            }
            if dim0 < dim1 {
                self.construct_reverse_map(dim1, dim0);
            }
        } else if dim0 > dim1 {
            self.build_connectivity_pair(dim1, dim0);
            self.construct_reverse_map(dim1, dim0);
        } else {
            self.build_connectivity_pair(dim0, 0);
            self.build_connectivity_pair(0, dim1);
            if self.size_of((dim0, 0)) == 0 || self.size_of((0, dim1)) == 0 {
                return;
            }
            let down = &self.connectivity[&(dim0, 0)];
            let up = &self.connectivity[&(0, dim1)];

            // Shared-vertex vote: a dim1 entity is incident to a dim0
            // entity iff it contains every one of its vertices. The ordered
            // counter makes emission order ascending in the entity index.
            let mut result = CsrList::new();
            let mut counter: BTreeMap<usize, usize> = BTreeMap::new();
            for vertices in down {
                counter.clear();
                for &vertex in vertices {
                    for &entity in up.group(vertex) {
                        *counter.entry(entity).or_insert(0) += 1;
                    }
                }
                let connected: Vec<usize> = counter
                    .iter()
                    .filter(|&(_, &count)| count == vertices.len())
                    .map(|(&entity, _)| entity)
                    .collect();
                result.push_back(&connected);
            }
            self.connectivity.insert((dim0, dim1), result);
        }
    }

    fn build_vertex_adjacency_list(&self) -> CsrList<usize> {
        let prime_element_list = &self.element_aggregations[self.mesh.dim()];
        let num_nodes = self.mesh.num_nodes();
        let expected_bandwidth = 64;
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
        for cache in &mut adjacency {
            cache.reserve(expected_bandwidth);
        }

        for vertex_list in prime_element_list {
            for &vertex in vertex_list {
                adjacency[vertex].extend_from_slice(vertex_list);
            }
        }

        let mut result = CsrList::new();
        for cache in &mut adjacency {
            cache.sort_unstable();
            cache.dedup();
            result.push_back(cache);
        }
        result
    }

    /// Positions of the child's vertices inside the parent's vertex list,
    /// in child order. `None` when a vertex is missing.
    fn child_indices_in_parent(child: &[usize], parent: &[usize]) -> Option<SmallVec<[usize; 4]>> {
        let mut indices = SmallVec::with_capacity(child.len());
        for &vertex in child {
            indices.push(parent.iter().position(|&p| p == vertex)?);
        }
        Some(indices)
    }

    fn build_orientation_of_subentities(&self) -> Result<CsrList<usize>> {
        let dim = self.mesh.dim();
        let prime_element_list = &self.element_aggregations[dim];
        let secondary_element_list = &self.element_aggregations[dim - 1];
        let Some(subentity_to_entity) = self.connectivity.get(&(dim - 1, dim)) else {
            return Ok(CsrList::new());
        };

        let mut orientation = CsrList::new();
        for i in 0..subentity_to_entity.len() {
            let child = secondary_element_list.group(i);
            let mut subentity_orientation: SmallVec<[usize; 2]> = SmallVec::new();
            for &cell in subentity_to_entity.group(i) {
                let parent = prime_element_list.group(cell);
                let local = Self::child_indices_in_parent(child, parent).ok_or_else(|| {
                    Error::ConsistencyViolation(format!(
                        "vertices of boundary entity {i} not found in cell {cell}"
                    ))
                })?;
                let ty = ElementType::from_vertex_count(parent.len(), dim).ok_or_else(|| {
                    Error::ConsistencyViolation(format!(
                        "cell {cell} has {} vertices, unknown {dim}d shape",
                        parent.len()
                    ))
                })?;
                let index = ty.subentity_index(&local).ok_or_else(|| {
                    Error::ConsistencyViolation(format!(
                        "boundary entity {i} is not a sub-entity of cell {cell} ({ty:?})"
                    ))
                })?;
                debug_assert!(index < 8);
                subentity_orientation.push(index);
            }
            orientation.push_back(&subentity_orientation);
        }
        Ok(orientation)
    }
}
