//! Pre-processing of unstructured finite-element meshes for parallel
//! solvers.
//!
//! The pipeline is strictly sequential: a reader populates the [`mesh`]
//! container once, [`topology`] derives the complete incidence lattice from
//! the cell-to-vertex lists, [`partition`] distributes cells and nodes over
//! ranks and materialises each rank's renumbered local mesh, and [`io`]
//! writes the per-rank artefacts for the solver to pick up. Everything
//! downstream of the reader treats the mesh as immutable and borrows views
//! from it.

/// This module defines the compressed-sparse-row container used for every
/// variable-width relation in the crate: element connectivity, incidence
/// tables, adjacency graphs and per-rank index sets.
pub mod csr;
/// This module defines the element taxonomy: per-shape vertex counts,
/// topological dimensions, sub-entity numbering and the fingerprint
/// encodings recovering a sub-entity's local index from its vertex set.
pub mod element;
/// This module defines the failure taxonomy shared by the whole crate.
pub mod error;
/// This module converts between the in-core CSR graphs and the graph type
/// consumed by the reordering machinery.
pub mod graph;
/// This module defines mesh reading and the partitioned-output writer.
pub mod io;
/// This module serves as the central container for the mesh: node
/// coordinates plus one connectivity list holding the elements of all
/// types back to back in canonical type order.
pub mod mesh;
/// This module distributes the mesh over solver ranks and builds the
/// per-rank local meshes, ghosts last.
pub mod partition;
/// This module implements bandwidth reduction of symmetric vertex graphs
/// (reverse Cuthill-McKee).
pub mod reorder;
/// This module builds the full `(dim0, dim1)` incidence lattice, the
/// vertex adjacency graph and the sub-entity orientation table.
pub mod topology;

pub mod prelude {
    pub use crate::csr::CsrList;
    pub use crate::element::ElementType;
    pub use crate::error::{Error, Result};
    pub use crate::io::{read, write};
    pub use crate::mesh::Mesh;
    pub use crate::partition::{LocalMesh, Partition, PartitionOptions};
    pub use crate::reorder::BandwidthReduction;
    pub use crate::topology::Topology;
}
