//! Bandwidth reduction of symmetric vertex graphs.
//!
//! The implementation is the reverse Cuthill-McKee ordering: per connected
//! component, start from a pseudo-peripheral vertex, visit breadth-first
//! with neighbours taken in increasing degree, and reverse the complete
//! visit order at the end.

use std::collections::VecDeque;

use petgraph::Undirected;

use crate::csr::CsrList;
use crate::graph;

/// Bandwidth of a CSR graph: the largest index distance along an edge.
pub fn bandwidth(list: &CsrList<usize>) -> usize {
    list.iter()
        .enumerate()
        .flat_map(|(i, row)| row.iter().map(move |&j| i.abs_diff(j)))
        .max()
        .unwrap_or(0)
}

/// Checks that the listed vertices form one connected piece of the graph,
/// walking adjacency from the lowest one. An empty selection means the
/// whole graph.
pub fn compact(list: &CsrList<usize>, vertices: &[usize]) -> bool {
    let adjacency = graph::from_graph(&graph::to_graph::<Undirected>(list));
    let selected: Vec<usize> = if vertices.is_empty() {
        (0..adjacency.len()).collect()
    } else {
        let mut sorted = vertices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
    };
    let Some(&first) = selected.first() else {
        return true;
    };
    if selected[selected.len() - 1] >= adjacency.len() {
        return false;
    }

    let mut colored = vec![false; selected.len()];
    colored[0] = true;
    let mut queue = VecDeque::from([first]);
    while let Some(vertex) = queue.pop_front() {
        for &next in adjacency.group(vertex) {
            if let Ok(index) = selected.binary_search(&next)
                && !colored[index]
            {
                colored[index] = true;
                queue.push_back(next);
            }
        }
    }
    colored.into_iter().all(|c| c)
}

/// Reverse Cuthill-McKee reordering of an undirected graph.
pub struct BandwidthReduction<'a> {
    graph: &'a CsrList<usize>,
}

impl<'a> BandwidthReduction<'a> {
    pub fn new(graph: &'a CsrList<usize>) -> Self {
        Self { graph }
    }

    /// Computes the reordering: a permutation of `0..num_vertices` listing
    /// the vertices in reverse visit order.
    pub fn compute(&self) -> Vec<usize> {
        // Round-tripping through the external graph symmetrises and
        // deduplicates the neighbour lists.
        let adjacency = graph::from_graph(&graph::to_graph::<Undirected>(self.graph));
        let n = adjacency.len();
        let degrees: Vec<usize> = (0..n)
            .map(|v| adjacency.group(v).iter().filter(|&&u| u != v).count())
            .collect();

        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        for seed in 0..n {
            if visited[seed] {
                continue;
            }
            let start = pseudo_peripheral(&adjacency, &degrees, seed);
            visited[start] = true;
            let mut queue = VecDeque::from([start]);
            while let Some(vertex) = queue.pop_front() {
                order.push(vertex);
                let mut next: Vec<usize> = adjacency
                    .group(vertex)
                    .iter()
                    .copied()
                    .filter(|&u| u != vertex && !visited[u])
                    .collect();
                next.sort_unstable_by_key(|&u| (degrees[u], u));
                for u in next {
                    visited[u] = true;
                    queue.push_back(u);
                }
            }
        }
        order.reverse();
        order
    }
}

/// Breadth-first level structure rooted at `start`, restricted to the
/// component of `start`.
fn bfs_levels(adjacency: &CsrList<usize>, start: usize) -> Vec<Vec<usize>> {
    let mut visited = vec![false; adjacency.len()];
    visited[start] = true;
    let mut levels = vec![vec![start]];
    loop {
        let mut next = Vec::new();
        for &vertex in &levels[levels.len() - 1] {
            for &u in adjacency.group(vertex) {
                if !visited[u] {
                    visited[u] = true;
                    next.push(u);
                }
            }
        }
        if next.is_empty() {
            return levels;
        }
        levels.push(next);
    }
}

/// Walks towards a vertex of (nearly) maximal eccentricity: repeatedly jump
/// to the minimum-degree vertex of the deepest level until the level
/// structure stops growing.
fn pseudo_peripheral(adjacency: &CsrList<usize>, degrees: &[usize], seed: usize) -> usize {
    let mut levels = bfs_levels(adjacency, seed);
    loop {
        let last = &levels[levels.len() - 1];
        let mut candidate = last[0];
        for &v in &last[1..] {
            if (degrees[v], v) < (degrees[candidate], candidate) {
                candidate = v;
            }
        }
        let next_levels = bfs_levels(adjacency, candidate);
        if next_levels.len() > levels.len() {
            levels = next_levels;
        } else {
            return candidate;
        }
    }
}
