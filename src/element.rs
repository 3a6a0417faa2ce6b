use serde::{Deserialize, Serialize};

/// Finite-element shapes understood by the pre-processor.
///
/// The discriminants fix the canonical block order inside the mesh
/// container: element types of the same topological dimension are
/// contiguous, and the order matches the per-type offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum ElementType {
    // 0d
    Vertex = 0,

    // 1d
    Line = 1,

    // 2d
    Triangle = 2,
    Quadrangle = 3,

    // 3d
    Tetrahedron = 4,
    Hexahedron = 5,
    Prism = 6,
    Pyramid = 7,
    /// 27-node isogeometric brick.
    Iga2 = 8,
}

impl ElementType {
    /// Position of this type in the canonical block order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn num_vertices(self) -> usize {
        use ElementType::*;
        match self {
            Vertex => 1,
            Line => 2,
            Triangle => 3,
            Quadrangle | Tetrahedron => 4,
            Pyramid => 5,
            Prism => 6,
            Hexahedron => 8,
            Iga2 => 27,
        }
    }

    pub fn topologic_dim(self) -> usize {
        use ElementType::*;
        match self {
            Vertex => 0,
            Line => 1,
            Triangle | Quadrangle => 2,
            Tetrahedron | Hexahedron | Prism | Pyramid | Iga2 => 3,
        }
    }

    /// Number of codimension-1 sub-entities (edges in 2d, faces in 3d).
    pub fn num_subentities(self) -> usize {
        use ElementType::*;
        match self {
            Vertex | Iga2 => 0,
            Line => 2,
            Triangle => 3,
            Quadrangle | Tetrahedron => 4,
            Prism | Pyramid => 5,
            Hexahedron => 6,
        }
    }

    /// Resolves the element shape of a cell from its vertex count and the
    /// topological dimension it lives in.
    pub fn from_vertex_count(num_vertices: usize, dim: usize) -> Option<Self> {
        use ElementType::*;
        match dim {
            0 => Some(Vertex),
            1 => Some(Line),
            2 => match num_vertices {
                3 => Some(Triangle),
                4 => Some(Quadrangle),
                _ => None,
            },
            3 => match num_vertices {
                4 => Some(Tetrahedron),
                5 => Some(Pyramid),
                6 => Some(Prism),
                8 => Some(Hexahedron),
                27 => Some(Iga2),
                _ => None,
            },
            _ => None,
        }
    }

    /// Maps a generator element-type code to the internal shape.
    pub fn from_gmsh_code(code: usize) -> Option<Self> {
        use ElementType::*;
        match code {
            15 => Some(Vertex),
            1 => Some(Line),
            2 => Some(Triangle),
            3 => Some(Quadrangle),
            4 => Some(Tetrahedron),
            5 => Some(Hexahedron),
            6 => Some(Prism),
            7 => Some(Pyramid),
            12 => Some(Iga2),
            _ => None,
        }
    }

    /// Volume element types at mesh dimension `dim`.
    pub fn prime_types(dim: usize) -> &'static [ElementType] {
        use ElementType::*;
        match dim {
            0 => &[Vertex],
            1 => &[Line],
            2 => &[Triangle, Quadrangle],
            3 => &[Tetrahedron, Hexahedron, Prism, Pyramid, Iga2],
            _ => &[],
        }
    }

    /// Boundary element types at mesh dimension `dim`.
    pub fn secondary_types(dim: usize) -> &'static [ElementType] {
        use ElementType::*;
        match dim {
            1 => &[Vertex],
            2 => &[Line],
            3 => &[Triangle, Quadrangle],
            _ => &[],
        }
    }

    /// Every element type a mesh of dimension `dim` may contain, in
    /// canonical block order.
    pub fn all_types(dim: usize) -> &'static [ElementType] {
        use ElementType::*;
        match dim {
            0 => &[Vertex],
            1 => &[Vertex, Line],
            2 => &[Vertex, Line, Triangle, Quadrangle],
            3 => &[
                Vertex,
                Line,
                Triangle,
                Quadrangle,
                Tetrahedron,
                Hexahedron,
                Prism,
                Pyramid,
                Iga2,
            ],
            _ => &[],
        }
    }

    /// Local vertex indices composing sub-entity `i` of this shape.
    ///
    /// Returns the empty slice for sub-entity indices this shape does not
    /// have.
    pub fn subentity(self, i: usize) -> &'static [usize] {
        use ElementType::*;
        match self {
            Line => match i {
                0 => &[0],
                1 => &[1],
                _ => &[],
            },
            Triangle => match i {
                0 => &[1, 2],
                1 => &[2, 0],
                2 => &[0, 1],
                _ => &[],
            },
            Quadrangle => match i {
                0 => &[0, 1],
                1 => &[0, 2],
                2 => &[1, 3],
                3 => &[2, 3],
                _ => &[],
            },
            Tetrahedron => match i {
                0 => &[1, 2, 3],
                1 => &[0, 2, 3],
                2 => &[0, 1, 3],
                3 => &[0, 1, 2],
                _ => &[],
            },
            Prism => match i {
                0 => &[0, 1, 2],
                1 => &[0, 1, 3, 4],
                2 => &[0, 2, 3, 5],
                3 => &[1, 2, 4, 5],
                4 => &[3, 4, 5],
                _ => &[],
            },
            Pyramid => match i {
                0 => &[0, 1, 2, 3],
                1 => &[0, 1, 4],
                2 => &[0, 2, 4],
                3 => &[1, 3, 4],
                4 => &[2, 3, 4],
                _ => &[],
            },
            Hexahedron => match i {
                0 => &[0, 1, 2, 3],
                1 => &[0, 1, 4, 5],
                2 => &[0, 2, 4, 6],
                3 => &[1, 3, 5, 7],
                4 => &[2, 3, 6, 7],
                5 => &[4, 5, 6, 7],
                _ => &[],
            },
            Vertex | Iga2 => &[],
        }
    }

    /// Inverse of [`ElementType::subentity`]: recovers the local sub-entity
    /// index from the set of local vertex indices composing it.
    ///
    /// The lookups are closed-form fingerprints on the index sums; each
    /// valid subset maps to a unique small integer. `None` means the given
    /// indices do not form a sub-entity of this shape.
    pub fn subentity_index(self, indices: &[usize]) -> Option<usize> {
        use ElementType::*;
        let sum: usize = indices.iter().sum();
        match (self, indices.len()) {
            (Line, 1) => Some(indices[0]).filter(|&i| i < 2),
            (Triangle, 2) => 3usize.checked_sub(sum).filter(|&i| i < 3),
            (Quadrangle, 2) => Some(sum >> 1).filter(|&i| i < 4),
            (Tetrahedron, 3) => 6usize.checked_sub(sum).filter(|&i| i < 4),
            (Prism, 3) => Some(if sum == 3 { 0 } else { 4 }),
            (Prism, 4) => sum.checked_sub(6).map(|s| s >> 1).filter(|&i| i < 4),
            (Pyramid, 4) => Some(0),
            (Pyramid, 3) => sum
                .checked_sub(if sum >= 8 { 5 } else { 4 })
                .filter(|&i| i < 5),
            (Hexahedron, 4) => {
                const MAPPING: [Option<usize>; 9] = [
                    Some(0),
                    None,
                    Some(1),
                    Some(2),
                    None,
                    Some(3),
                    Some(4),
                    None,
                    Some(5),
                ];
                sum.checked_sub(6)
                    .map(|s| s >> 1)
                    .and_then(|i| MAPPING.get(i).copied().flatten())
            }
            _ => None,
        }
    }
}
