//! Removal of redundant direct dependencies.
//!
//! A direct edge `A -> C` is redundant when the graph already implies it
//! through a longer path such as `A -> B -> C`. Dropping such edges leaves the
//! reachability relation intact and removes visual noise from the rendered
//! architecture.
//!
//! # Cost
//!
//! The default [`ReductionPolicy::AllPaths`] visits every ordered pair of
//! nodes (quadratic) and, for each pair joined by a direct edge, enumerates
//! **every** simple path between them by exhaustive depth-first search. The
//! number of simple paths grows exponentially with graph density, so this
//! policy is worst-case exponential per pair.
//! Large or dense graphs should use [`ReductionPolicy::BoundedDepth`] or
//! [`ReductionPolicy::Reachability`] instead.

use super::{ArchitectureGraph, Edge};
use petgraph::algo::{all_simple_paths, has_path_connecting};
use petgraph::stable_graph::{EdgeReference, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How redundant direct edges are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ReductionPolicy {
    /// Enumerate all simple paths between the endpoints. Exact, worst-case exponential.
    #[default]
    AllPaths,
    /// Only consider alternative paths of at most `max_hops` edges.
    BoundedDepth {
        /// Longest alternative path (in edges) that makes a direct edge redundant.
        max_hops: usize,
    },
    /// Remove the direct edge when the target stays reachable without it.
    /// Linear per pair; gives the same answer as `AllPaths` on graphs without
    /// parallel edges.
    Reachability,
}

impl ArchitectureGraph {
    /// Remove every direct edge that duplicates a longer path.
    ///
    /// For each ordered pair `(A, B)` of distinct nodes joined by a direct
    /// edge, the edge is removed when more than one path leads from A to B
    /// under `policy`. Pairs are processed in node order against the graph as
    /// it stands, so an edge removed earlier no longer counts as a path.
    ///
    /// Returns the removed `(source, target)` id pairs.
    pub fn remove_redundant_edges(&mut self, policy: ReductionPolicy) -> Vec<(String, String)> {
        let nodes: Vec<NodeIndex> = self.inner().node_indices().collect();
        let mut removed = Vec::new();

        for &a in &nodes {
            for &b in &nodes {
                if a == b || self.inner().find_edge(a, b).is_none() {
                    continue;
                }

                if self.is_redundant(a, b, policy) {
                    let graph = self.inner();
                    let pair = (graph[a].id().to_string(), graph[b].id().to_string());
                    debug!(from = %pair.0, to = %pair.1, "Removing redundant dependency");
                    self.remove_edges_between(a, b);
                    removed.push(pair);
                }
            }
        }

        removed
    }

    fn is_redundant(&self, a: NodeIndex, b: NodeIndex, policy: ReductionPolicy) -> bool {
        let graph = self.inner();
        match policy {
            ReductionPolicy::AllPaths => {
                all_simple_paths::<Vec<NodeIndex>, _>(graph, a, b, 0, None).count() > 1
            }
            ReductionPolicy::BoundedDepth { max_hops } => {
                let max_intermediate = max_hops.saturating_sub(1);
                all_simple_paths::<Vec<NodeIndex>, _>(graph, a, b, 0, Some(max_intermediate))
                    .count()
                    > 1
            }
            ReductionPolicy::Reachability => {
                let without_direct = EdgeFiltered::from_fn(graph, |e: EdgeReference<'_, Edge>| {
                    !(e.source() == a && e.target() == b)
                });
                has_path_connecting(&without_direct, a, b, None)
            }
        }
    }
}
