use std::collections::BTreeMap;
use std::ops::Range;

use ndarray::Array2;

use crate::csr::CsrList;
use crate::element::ElementType;
use crate::error::{Error, Result};

/// Per-type element block as produced by a mesh reader: connectivity groups
/// plus the generator-assigned tag of each element.
pub type ElementBlock = (CsrList<usize>, Vec<usize>);

/// The central mesh container.
///
/// Holds the node coordinates and a single connectivity list in which the
/// elements of all types sit back to back in canonical type order, together
/// with a parallel tag vector and the per-type offset table delimiting each
/// block. A `Mesh` is assembled once by a reader and immutable afterwards;
/// topology and partitioning hold read-only views on it.
#[derive(Debug, Clone)]
pub struct Mesh {
    dim: usize,
    nodes: Array2<f64>,
    connectivity: CsrList<usize>,
    element_id: Vec<usize>,
    type_offset: Vec<usize>,
}

impl Mesh {
    /// Assembles a mesh from per-type element blocks.
    ///
    /// The `Vertex` block is always synthesised as one single-vertex group
    /// per node with tag 0; a `Vertex` entry in `blocks` is ignored. Blocks
    /// of topological dimension above `dim` are rejected.
    pub fn assemble(
        dim: usize,
        nodes: Array2<f64>,
        blocks: &BTreeMap<ElementType, ElementBlock>,
    ) -> Result<Self> {
        if !(1..=3).contains(&dim) {
            return Err(Error::InvalidInput(format!(
                "unsupported mesh dimension: {dim}"
            )));
        }
        if nodes.ncols() != dim {
            return Err(Error::InvalidInput(format!(
                "coordinate array has {} columns for a {dim}d mesh",
                nodes.ncols()
            )));
        }
        for (&ty, (csr, ids)) in blocks {
            if ty.topologic_dim() > dim {
                return Err(Error::InvalidInput(format!(
                    "{ty:?} elements cannot appear in a {dim}d mesh"
                )));
            }
            if csr.len() != ids.len() {
                return Err(Error::ConsistencyViolation(format!(
                    "{ty:?} block has {} elements but {} tags",
                    csr.len(),
                    ids.len()
                )));
            }
        }

        let num_nodes = nodes.nrows();
        let types = ElementType::all_types(dim);
        let mut connectivity = CsrList::new();
        let mut element_id = Vec::new();
        let mut type_offset = Vec::with_capacity(types.len() + 1);
        type_offset.push(0);
        for &ty in types {
            if ty == ElementType::Vertex {
                for i in 0..num_nodes {
                    connectivity.push_back(&[i]);
                }
                element_id.resize(num_nodes, 0);
            } else if let Some((csr, ids)) = blocks.get(&ty) {
                connectivity += csr;
                element_id.extend_from_slice(ids);
            }
            type_offset.push(connectivity.len());
        }

        if let Some(&max) = connectivity.data().iter().max()
            && max >= num_nodes
        {
            return Err(Error::ConsistencyViolation(format!(
                "element references node {max} but the mesh has {num_nodes} nodes"
            )));
        }

        Ok(Self {
            dim,
            nodes,
            connectivity,
            element_id,
            type_offset,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.nrows()
    }

    /// Node coordinates, one row per node.
    pub fn nodes(&self) -> &Array2<f64> {
        &self.nodes
    }

    /// The combined connectivity list and the parallel tag vector.
    pub fn elements(&self) -> (&CsrList<usize>, &[usize]) {
        (&self.connectivity, &self.element_id)
    }

    /// Total number of elements, the synthesised vertex block included.
    pub fn num_elements(&self) -> usize {
        self.connectivity.len()
    }

    /// Element index range of one type's block.
    pub fn type_range(&self, ty: ElementType) -> Range<usize> {
        let i = ty.index();
        if i + 1 >= self.type_offset.len() {
            return 0..0;
        }
        self.type_offset[i]..self.type_offset[i + 1]
    }

    /// Element index range spanned by all types of topological dimension
    /// `dim`; contiguous by canonical type order.
    pub fn dim_range(&self, dim: usize) -> Range<usize> {
        let mut range = 0..0;
        for &ty in ElementType::all_types(self.dim) {
            if ty.topologic_dim() == dim {
                let block = self.type_range(ty);
                if range.is_empty() {
                    range = block;
                } else {
                    range.end = block.end;
                }
            }
        }
        range
    }

    pub fn elements_of_type(&self, ty: ElementType) -> CsrList<usize> {
        self.slice(self.type_range(ty))
    }

    pub fn ids_of_type(&self, ty: ElementType) -> &[usize] {
        &self.element_id[self.type_range(ty)]
    }

    pub fn elements_of_dim(&self, dim: usize) -> CsrList<usize> {
        self.slice(self.dim_range(dim))
    }

    pub fn ids_of_dim(&self, dim: usize) -> &[usize] {
        &self.element_id[self.dim_range(dim)]
    }

    fn slice(&self, range: Range<usize>) -> CsrList<usize> {
        let offset = self.connectivity.offset();
        let start = offset[range.start];
        let end = offset[range.end];
        let data = self.connectivity.data()[start..end].to_vec();
        let offset = offset[range.start..=range.end]
            .iter()
            .map(|&o| o - start)
            .collect();
        CsrList::from_parts_unchecked(data, offset)
    }
}

#[cfg(test)]
pub(crate) mod examples {
    use super::*;
    use ndarray::array;

    /// Two tetrahedra sharing the face {1, 2, 3}, with that face declared
    /// as a boundary triangle together with one outer face of each cell.
    pub fn two_tets() -> Mesh {
        let nodes = array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ];
        let mut blocks = BTreeMap::new();
        let mut tets = CsrList::new();
        tets.push_back(&[0, 1, 2, 3]);
        tets.push_back(&[1, 2, 3, 4]);
        blocks.insert(ElementType::Tetrahedron, (tets, vec![10, 11]));
        let mut tris = CsrList::new();
        tris.push_back(&[0, 1, 2]);
        tris.push_back(&[2, 3, 4]);
        blocks.insert(ElementType::Triangle, (tris, vec![1, 2]));
        Mesh::assemble(3, nodes, &blocks).unwrap()
    }

    /// A planar strip: one quadrangle (0, 1, 2, 3) next to two triangles
    /// filling (1, 4, 5, 3), with three boundary lines declared.
    ///
    /// Quadrangle vertices follow the row-wise numbering in which vertex
    /// pairs (0,1), (0,2), (1,3) and (2,3) span the edges.
    pub fn tri_quad_strip() -> Mesh {
        let nodes = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 0.0],
            [2.0, 1.0],
        ];
        let mut blocks = BTreeMap::new();
        let mut quads = CsrList::new();
        quads.push_back(&[0, 1, 2, 3]);
        blocks.insert(ElementType::Quadrangle, (quads, vec![20]));
        let mut tris = CsrList::new();
        tris.push_back(&[1, 4, 3]);
        tris.push_back(&[4, 5, 3]);
        blocks.insert(ElementType::Triangle, (tris, vec![21, 22]));
        let mut lines = CsrList::new();
        lines.push_back(&[0, 1]);
        lines.push_back(&[1, 4]);
        lines.push_back(&[0, 2]);
        blocks.insert(ElementType::Line, (lines, vec![1, 2, 3]));
        Mesh::assemble(2, nodes, &blocks).unwrap()
    }

    /// A structured box of side `cells`, each cube split into five
    /// tetrahedra, boundary left undeclared.
    pub fn tet_box(cells: usize) -> Mesh {
        let side = cells + 1;
        let node = |i: usize, j: usize, k: usize| (k * side + j) * side + i;
        let mut coords = Vec::with_capacity(side * side * side * 3);
        for k in 0..side {
            for j in 0..side {
                for i in 0..side {
                    coords.extend_from_slice(&[i as f64, j as f64, k as f64]);
                }
            }
        }
        let nodes = Array2::from_shape_vec((side * side * side, 3), coords).unwrap();

        let mut tets = CsrList::new();
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
                    // Five-tet decomposition of the cube.
                    tets.push_back(&[v[0], v[1], v[3], v[5]]);
                    tets.push_back(&[v[0], v[3], v[2], v[6]]);
                    tets.push_back(&[v[0], v[5], v[4], v[6]]);
                    tets.push_back(&[v[3], v[5], v[6], v[7]]);
                    tets.push_back(&[v[0], v[3], v[5], v[6]]);
                }
            }
        }
        let ids = vec![1; tets.len()];
        let mut blocks = BTreeMap::new();
        blocks.insert(ElementType::Tetrahedron, (tets, ids));
        Mesh::assemble(3, nodes, &blocks).unwrap()
    }

    #[test]
    fn test_assemble_synthesises_vertex_block() {
        let mesh = two_tets();
        assert_eq!(mesh.num_nodes(), 5);
        assert_eq!(mesh.num_elements(), 5 + 2 + 2);

        let vertices = mesh.elements_of_type(ElementType::Vertex);
        assert_eq!(vertices.len(), 5);
        assert_eq!(vertices.group(3), &[3]);
        assert_eq!(mesh.ids_of_type(ElementType::Vertex), &[0; 5]);
    }

    #[test]
    fn test_type_and_dim_slicing() {
        let mesh = two_tets();
        let tets = mesh.elements_of_type(ElementType::Tetrahedron);
        assert_eq!(tets.len(), 2);
        assert_eq!(tets.group(1), &[1, 2, 3, 4]);
        assert_eq!(mesh.ids_of_type(ElementType::Tetrahedron), &[10, 11]);

        // Dimension 3 spans exactly the tetrahedron block here.
        assert_eq!(mesh.elements_of_dim(3), tets);
        assert_eq!(mesh.elements_of_dim(2).len(), 2);
        assert!(mesh.elements_of_type(ElementType::Hexahedron).is_empty());
        assert!(mesh.elements_of_dim(1).is_empty());
    }

    #[test]
    fn test_assemble_rejects_inconsistencies() {
        let nodes = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let mut blocks = BTreeMap::new();
        let mut tris = CsrList::new();
        tris.push_back(&[0, 1, 2]);
        blocks.insert(ElementType::Triangle, (tris.clone(), vec![]));
        assert!(Mesh::assemble(2, nodes.clone(), &blocks).is_err());

        let mut blocks = BTreeMap::new();
        let mut bad = CsrList::new();
        bad.push_back(&[0, 1, 7]);
        blocks.insert(ElementType::Triangle, (bad, vec![1]));
        assert!(Mesh::assemble(2, nodes.clone(), &blocks).is_err());

        let mut blocks = BTreeMap::new();
        blocks.insert(ElementType::Tetrahedron, (tris, vec![1]));
        assert!(Mesh::assemble(2, nodes, &blocks).is_err());
    }
}
