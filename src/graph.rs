//! Conversion between the in-core CSR graphs and `petgraph` graphs.
//!
//! The reordering machinery works on a [`petgraph::Graph`]; topology and
//! partitioning work on [`CsrList`]s whose group `i` lists the neighbours of
//! vertex `i`. The edge category travels in the `Ty` type parameter, so a
//! directed graph can only round-trip back to a directed CSR; there is no
//! way to express a directed/undirected bridge.

use petgraph::EdgeType;
use petgraph::graph::{Graph, NodeIndex};
use rustc_hash::FxHashSet;

use crate::csr::CsrList;

/// Number of vertices spanned by a CSR graph: its groups plus any larger
/// index mentioned in the data.
pub fn num_vertices(list: &CsrList<usize>) -> usize {
    let max_index = list.data().iter().max().map_or(0, |&m| m + 1);
    max_index.max(list.len())
}

/// Builds a `petgraph` graph from a CSR neighbour list. Parallel edges are
/// collapsed; for undirected graphs `(u, v)` and `(v, u)` count as the same
/// edge.
pub fn to_graph<Ty: EdgeType>(list: &CsrList<usize>) -> Graph<(), (), Ty> {
    let n = num_vertices(list);
    let mut graph = Graph::<(), (), Ty>::with_capacity(n, list.data().len());
    for _ in 0..n {
        graph.add_node(());
    }
    let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
    for (i, neighbours) in list.iter().enumerate() {
        for &j in neighbours {
            let key = if graph.is_directed() || i <= j {
                (i, j)
            } else {
                (j, i)
            };
            if seen.insert(key) {
                graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
            }
        }
    }
    graph
}

/// Builds the CSR neighbour list of a `petgraph` graph: one group per
/// vertex, sorted and deduplicated. For directed graphs the groups list
/// outgoing neighbours only.
pub fn from_graph<Ty: EdgeType>(graph: &Graph<(), (), Ty>) -> CsrList<usize> {
    let expected_bandwidth = 32;
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); graph.node_count()];
    for cache in &mut rows {
        cache.reserve(expected_bandwidth);
    }
    for v in graph.node_indices() {
        for u in graph.neighbors(v) {
            rows[v.index()].push(u.index());
        }
    }

    let mut result = CsrList::new();
    for cache in &mut rows {
        cache.sort_unstable();
        cache.dedup();
        result.push_back(cache);
    }
    result
}
