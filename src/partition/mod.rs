//! Distribution of the mesh over solver ranks.
//!
//! [`Partition::metis`] drives the dual-graph partitioning oracle and bins
//! its element and node assignments into per-rank index sets;
//! [`Partition::local_mesh_data`] then materialises the renumbered local
//! mesh of one rank at a time.

mod local;
mod oracle;

pub use local::LocalMesh;

use crate::csr::CsrList;
use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// Partitioning method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Multilevel k-way partitioning.
    KWay,
    /// Multilevel recursive bisectioning.
    RecursiveBisection,
}

/// Optimisation objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Edge-cut minimisation.
    EdgeCut,
    /// Total communication volume minimisation.
    CommunicationVolume,
}

/// Matching scheme used during coarsening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coarsening {
    /// Sorted heavy-edge matching.
    Shem,
    /// Random matching.
    Random,
}

/// Algorithm used for the initial partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPartitioning {
    /// Grow a part greedily around a seed.
    Grow,
    /// Random assignment followed by refinement.
    Random,
}

/// Parameter block handed to the partitioning oracle.
#[derive(Debug, Clone)]
pub struct PartitionOptions {
    pub method: Method,
    pub objective: Objective,
    pub coarsening: Coarsening,
    pub initial: InitialPartitioning,
    /// Number of common nodes two elements must share to be dual-adjacent.
    pub ncommon: usize,
    /// Number of refinement sweeps.
    pub niter: usize,
    /// Number of candidate cuts to compute.
    pub ncuts: usize,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            method: Method::KWay,
            objective: Objective::EdgeCut,
            coarsening: Coarsening::Shem,
            initial: InitialPartitioning::Grow,
            ncommon: 1,
            niter: 10,
            ncuts: 1,
        }
    }
}

/// Per-rank element and node ownership.
///
/// Group `r` of `element_attribution` lists the global prime-cell indices of
/// rank `r`; group `r` of `node_attribution` lists the globally unique
/// owned nodes of rank `r`. Groups are ascending, and each cell and node
/// appears in exactly one group.
#[derive(Debug, Clone)]
pub struct Partition {
    num_parts: usize,
    element_attribution: CsrList<usize>,
    node_attribution: CsrList<usize>,
}

impl Partition {
    /// Partitions the prime cells of `mesh` into `num_parts` ranks.
    ///
    /// With fewer than two parts everything is attributed to rank 0 without
    /// consulting the oracle.
    pub fn metis(mesh: &Mesh, num_parts: usize, options: &PartitionOptions) -> Result<Self> {
        if num_parts == 0 {
            return Err(Error::InvalidInput(
                "cannot partition into zero parts".into(),
            ));
        }
        let num_nodes = mesh.num_nodes();
        let prime_element_list = mesh.elements_of_dim(mesh.dim());
        let num_elements = prime_element_list.len();

        let (epart, npart) = if num_parts < 2 {
            (vec![0; num_elements], vec![0; num_nodes])
        } else {
            oracle::part_mesh_dual(&prime_element_list, num_nodes, num_parts, options)?
        };

        Ok(Self {
            num_parts,
            element_attribution: bin(&epart, num_parts),
            node_attribution: bin(&npart, num_parts),
        })
    }

    pub fn num_parts(&self) -> usize {
        self.num_parts
    }

    pub fn element_attribution(&self) -> &CsrList<usize> {
        &self.element_attribution
    }

    pub fn node_attribution(&self) -> &CsrList<usize> {
        &self.node_attribution
    }

    /// Element and owned-node index sets of one rank.
    pub fn part(&self, rank: usize) -> (&[usize], &[usize]) {
        (
            self.element_attribution.group(rank),
            self.node_attribution.group(rank),
        )
    }
}

/// Bins `assignment[i] = rank` into one ascending group per rank.
fn bin(assignment: &[usize], num_parts: usize) -> CsrList<usize> {
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); num_parts];
    for (index, &rank) in assignment.iter().enumerate() {
        debug_assert!(rank < num_parts);
        buckets[rank].push(index);
    }
    let mut result = CsrList::new();
    for bucket in &buckets {
        result.push_back(bucket);
    }
    result
}
