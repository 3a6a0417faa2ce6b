//! The dual-graph partitioning oracle.
//!
//! Given the prime-cell connectivity as a CSR list, the oracle assigns each
//! element and each node to a rank. Elements are dual-adjacent when they
//! share at least `ncommon` nodes. Parts are seeded by greedy graph
//! growing and polished by bounded boundary-refinement sweeps that reduce
//! the edge cut while keeping part sizes within a few percent of the
//! balance target. Nodes inherit the majority rank of their incident
//! elements, so every node lands on a rank that actually references it.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::csr::CsrList;
use crate::error::{Error, Result};

use super::{Method, PartitionOptions};

/// Rank assignment for elements and nodes.
///
/// Fails when the connectivity references nodes outside `0..num_nodes` or
/// when no balanced assignment can be produced.
pub fn part_mesh_dual(
    elements: &CsrList<usize>,
    num_nodes: usize,
    num_parts: usize,
    options: &PartitionOptions,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let num_elements = elements.len();
    if let Some(&max) = elements.data().iter().max()
        && max >= num_nodes
    {
        return Err(Error::OracleFailure(format!(
            "element references node {max} outside the {num_nodes}-node mesh"
        )));
    }
    if num_parts > num_elements.max(1) {
        return Err(Error::OracleFailure(format!(
            "cannot split {num_elements} elements into {num_parts} parts"
        )));
    }

    // Node-to-element incidence, padded to the full node range.
    let mut node_to_elements = elements.reverse();
    while node_to_elements.len() < num_nodes {
        node_to_elements.push_back(&[]);
    }

    let dual = DualGraph {
        elements,
        node_to_elements: &node_to_elements,
        ncommon: options.ncommon.max(1),
    };

    let target = num_elements.div_ceil(num_parts);
    let mut epart = grow_parts(&dual, num_elements, num_parts, target);
    if matches!(options.method, Method::KWay) {
        refine(&dual, &mut epart, num_parts, target, options.niter);
    }
    log::debug!("partitioned {num_elements} elements into {num_parts} parts (target {target})");

    // Nodes follow the most frequent rank among their incident elements;
    // nodes referenced by nothing fall back to rank 0.
    let mut npart = vec![0; num_nodes];
    let mut votes: FxHashMap<usize, usize> = FxHashMap::default();
    for (node, incident) in node_to_elements.iter().enumerate() {
        votes.clear();
        for &element in incident {
            *votes.entry(epart[element]).or_insert(0) += 1;
        }
        let mut best: Option<(usize, usize)> = None;
        for (&rank, &count) in &votes {
            let better = match best {
                None => true,
                Some((best_rank, best_count)) => {
                    count > best_count || (count == best_count && rank < best_rank)
                }
            };
            if better {
                best = Some((rank, count));
            }
        }
        if let Some((rank, _)) = best {
            npart[node] = rank;
        }
    }

    Ok((epart, npart))
}

struct DualGraph<'a> {
    elements: &'a CsrList<usize>,
    node_to_elements: &'a CsrList<usize>,
    ncommon: usize,
}

impl DualGraph<'_> {
    /// Elements sharing at least `ncommon` nodes with `element`, ascending.
    fn neighbours(&self, element: usize) -> Vec<usize> {
        let mut shared: FxHashMap<usize, usize> = FxHashMap::default();
        for &node in self.elements.group(element) {
            for &other in self.node_to_elements.group(node) {
                if other != element {
                    *shared.entry(other).or_insert(0) += 1;
                }
            }
        }
        let mut neighbours: Vec<usize> = shared
            .into_iter()
            .filter(|&(_, count)| count >= self.ncommon)
            .map(|(other, _)| other)
            .collect();
        neighbours.sort_unstable();
        neighbours
    }
}

/// Greedy graph growing: each rank floods outward from the lowest
/// unassigned seed until it holds its share of elements.
fn grow_parts(dual: &DualGraph, num_elements: usize, num_parts: usize, target: usize) -> Vec<usize> {
    const UNASSIGNED: usize = usize::MAX;
    let mut epart = vec![UNASSIGNED; num_elements];
    let mut next_seed = 0;
    for rank in 0..num_parts {
        let mut size = 0;
        let mut queue = VecDeque::new();
        while size < target {
            let element = match queue.pop_front() {
                Some(e) => e,
                None => {
                    while next_seed < num_elements && epart[next_seed] != UNASSIGNED {
                        next_seed += 1;
                    }
                    if next_seed == num_elements {
                        break;
                    }
                    next_seed
                }
            };
            if epart[element] != UNASSIGNED {
                continue;
            }
            epart[element] = rank;
            size += 1;
            for neighbour in dual.neighbours(element) {
                if epart[neighbour] == UNASSIGNED {
                    queue.push_back(neighbour);
                }
            }
        }
    }
    // The targets over-cover the element count, so only the trailing ranks
    // can come up short; anything the loop above left over joins the last
    // rank.
    for rank in &mut epart {
        if *rank == UNASSIGNED {
            *rank = num_parts - 1;
        }
    }
    epart
}

/// Boundary refinement: moves an element to the rank holding most of its
/// dual neighbours when that strictly reduces the cut and respects the
/// balance bounds.
fn refine(dual: &DualGraph, epart: &mut [usize], num_parts: usize, target: usize, niter: usize) {
    let max_size = target + (target * 3 / 100).max(1);
    let mut sizes = vec![0usize; num_parts];
    for &rank in epart.iter() {
        sizes[rank] += 1;
    }

    let mut votes: FxHashMap<usize, usize> = FxHashMap::default();
    for _ in 0..niter {
        let mut moves = 0;
        for element in 0..epart.len() {
            let current = epart[element];
            if sizes[current] <= 1 {
                continue;
            }
            votes.clear();
            for neighbour in dual.neighbours(element) {
                *votes.entry(epart[neighbour]).or_insert(0) += 1;
            }
            let here = votes.get(&current).copied().unwrap_or(0);
            let mut best = (current, here);
            for (&rank, &count) in &votes {
                if count > best.1 || (count == best.1 && rank < best.0) {
                    best = (rank, count);
                }
            }
            let (rank, count) = best;
            if rank != current && count > here && sizes[rank] < max_size {
                epart[element] = rank;
                sizes[current] -= 1;
                sizes[rank] += 1;
                moves += 1;
            }
        }
        if moves == 0 {
            break;
        }
    }
}
