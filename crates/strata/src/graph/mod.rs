//! The architecture dependency graph.
//!
//! [`ArchitectureGraph`] is a directed graph of named components built on
//! petgraph's `StableDiGraph`, so node indices survive edge removal during
//! transitive reduction.
//!
//! ## Edge Direction
//!
//! Edges point from **dependent to dependency**: `A -> B` means A depends on
//! B. Impact therefore travels *against* the edges: when B changes, every
//! node with a path into B is affected.
//!
//! ## Identity
//!
//! Node identifiers are unique case-insensitively. The graph keeps a
//! lowercase-keyed index next to the petgraph storage, and [`ArchitectureGraph::add_edge`]
//! refuses to insert a second edge for the same (source, target) pair.

mod reduction;
mod snapshot;
mod style;

pub use reduction::ReductionPolicy;
pub use snapshot::{EdgeSnapshot, GraphSnapshot, NodeSnapshot};
pub use style::{
    Color, EdgeRouting, EdgeStyle, LayerDirection, LayoutHints, NodeShape, NodeStyle,
    PackingMethod, ParseColorError,
};

use petgraph::Direction;
use petgraph::visit::IntoEdgeReferences;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

/// A component in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: String,
    label: String,
    /// Visual attributes set by the decorator.
    pub style: NodeStyle,
}

impl Node {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            style: NodeStyle::default(),
        }
    }

    /// Unique identifier (component or package name, possibly with a framework qualifier).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label. Equal to the id unless loaded otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A "depends on" relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edge {
    /// Visual attributes set by the decorator.
    pub style: EdgeStyle,
}

/// Directed dependency graph with case-insensitive node lookup.
#[derive(Debug, Clone)]
pub struct ArchitectureGraph {
    name: String,
    graph: StableDiGraph<Node, Edge>,
    index: HashMap<String, NodeIndex>,
    same_layer_groups: Vec<Vec<String>>,
    layout: LayoutHints,
}

fn key(id: &str) -> String {
    id.to_lowercase()
}

impl ArchitectureGraph {
    /// Create an empty graph. The name is usually the architecture name, which
    /// is also the id of the root node once the first project edge is added.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            same_layer_groups: Vec::new(),
            layout: LayoutHints::default(),
        }
    }

    /// Graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get or create the node with `id`.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        self.add_node_with_label(id, id)
    }

    /// Get or create the node with `id`. The label is only used on creation.
    pub fn add_node_with_label(&mut self, id: &str, label: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(&key(id)) {
            return idx;
        }
        let idx = self.graph.add_node(Node::new(id, label));
        self.index.insert(key(id), idx);
        idx
    }

    /// Add `from -> to`, creating missing nodes.
    ///
    /// Returns `false` without touching the graph if the edge already exists
    /// (compared case-insensitively).
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        self.insert_edge(from, to).is_some()
    }

    pub(crate) fn insert_edge(&mut self, from: &str, to: &str) -> Option<EdgeIndex> {
        let source = self.add_node(from);
        let target = self.add_node(to);
        if self.graph.find_edge(source, target).is_some() {
            return None;
        }
        Some(self.graph.add_edge(source, target, Edge::default()))
    }

    /// Whether `from -> to` exists.
    #[must_use]
    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(a), Some(b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Remove every `from -> to` edge. Returns how many were removed.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> usize {
        let (Some(a), Some(b)) = (self.index_of(from), self.index_of(to)) else {
            return 0;
        };
        self.remove_edges_between(a, b)
    }

    pub(crate) fn remove_edges_between(&mut self, a: NodeIndex, b: NodeIndex) -> usize {
        let mut removed = 0;
        while let Some(edge) = self.graph.find_edge(a, b) {
            self.graph.remove_edge(edge);
            removed += 1;
        }
        removed
    }

    /// Look a node up by id (case-insensitive).
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Mutable lookup by id (case-insensitive).
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index_of(id).map(|idx| &mut self.graph[idx])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// All edges as `(source, target, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, &Edge)> {
        self.graph.edge_references().map(|e| {
            (
                &self.graph[e.source()],
                &self.graph[e.target()],
                e.weight(),
            )
        })
    }

    /// Style of the `from -> to` edge, if present.
    #[must_use]
    pub fn edge_style(&self, from: &str, to: &str) -> Option<&EdgeStyle> {
        let (a, b) = (self.index_of(from)?, self.index_of(to)?);
        self.graph.find_edge(a, b).map(|e| &self.graph[e].style)
    }

    /// Edge set as `(source id, target id)` pairs, ordered for comparisons.
    #[must_use]
    pub fn edge_pairs(&self) -> BTreeSet<(String, String)> {
        self.edges()
            .map(|(s, t, _)| (s.id.clone(), t.id.clone()))
            .collect()
    }

    /// Node ids, ordered for comparisons.
    #[must_use]
    pub fn node_ids(&self) -> BTreeSet<String> {
        self.nodes().map(|n| n.id.clone()).collect()
    }

    /// Ids of the nodes that depend directly on `id`.
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.neighbor_ids(id, Direction::Incoming)
    }

    /// Ids of the nodes `id` depends on directly.
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.neighbor_ids(id, Direction::Outgoing)
    }

    fn neighbor_ids(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].id.as_str())
            .collect()
    }

    /// Groups of node ids a renderer should place on the same visual row.
    #[must_use]
    pub fn same_layer_groups(&self) -> &[Vec<String>] {
        &self.same_layer_groups
    }

    /// Register a same-row group. Empty groups are ignored.
    pub fn add_same_layer_group(&mut self, ids: Vec<String>) {
        if !ids.is_empty() {
            self.same_layer_groups.push(ids);
        }
    }

    /// Graph-level layout hints.
    #[must_use]
    pub fn layout(&self) -> &LayoutHints {
        &self.layout
    }

    /// Replace the layout hints.
    pub fn set_layout(&mut self, layout: LayoutHints) {
        self.layout = layout;
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(&key(id)).copied()
    }

    pub(crate) fn inner(&self) -> &StableDiGraph<Node, Edge> {
        &self.graph
    }

    pub(crate) fn inner_mut(&mut self) -> &mut StableDiGraph<Node, Edge> {
        &mut self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_edge_creates_nodes_once() {
        let mut graph = ArchitectureGraph::new("Product");

        assert!(graph.add_edge("Product", "App.Main"));
        assert!(graph.add_edge("App.Main", "Core.Util"));

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.name(), "Product");
    }

    #[test]
    fn duplicate_edges_are_rejected_case_insensitively() {
        let mut graph = ArchitectureGraph::new("g");

        assert!(graph.add_edge("App.Main", "Core.Util"));
        assert!(!graph.add_edge("app.main", "CORE.UTIL"));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node("core.util").unwrap().id(), "Core.Util");
    }

    #[test]
    fn opposite_direction_is_a_distinct_edge() {
        let mut graph = ArchitectureGraph::new("g");

        assert!(graph.add_edge("A", "B"));
        assert!(graph.add_edge("B", "A"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn neighbors_follow_edge_direction() {
        let mut graph = ArchitectureGraph::new("g");
        graph.add_edge("A", "C");
        graph.add_edge("B", "C");
        graph.add_edge("C", "D");

        let mut dependents = graph.dependents("c");
        dependents.sort_unstable();
        assert_eq!(dependents, vec!["A", "B"]);
        assert_eq!(graph.dependencies("C"), vec!["D"]);
        assert!(graph.dependents("missing").is_empty());
    }

    #[test]
    fn remove_edge_keeps_nodes() {
        let mut graph = ArchitectureGraph::new("g");
        graph.add_edge("A", "B");

        assert_eq!(graph.remove_edge("a", "b"), 1);
        assert_eq!(graph.remove_edge("a", "b"), 0);
        assert!(!graph.contains_edge("A", "B"));
        assert_eq!(graph.node_count(), 2);

        // Index stays valid after removal.
        assert!(graph.add_edge("A", "B"));
    }

    #[test]
    fn empty_groups_are_not_registered() {
        let mut graph = ArchitectureGraph::new("g");

        graph.add_same_layer_group(vec![]);
        graph.add_same_layer_group(vec!["A".to_string()]);

        assert_eq!(graph.same_layer_groups().len(), 1);
    }

    proptest! {
        #[test]
        fn edge_count_matches_distinct_lowercase_pairs(
            edges in proptest::collection::vec(("[a-dA-D]", "[a-dA-D]"), 0..40)
        ) {
            let mut graph = ArchitectureGraph::new("g");
            for (from, to) in &edges {
                graph.add_edge(from, to);
            }

            let distinct: BTreeSet<(String, String)> = edges
                .iter()
                .map(|(f, t)| (f.to_lowercase(), t.to_lowercase()))
                .collect();
            prop_assert_eq!(graph.edge_count(), distinct.len());
        }
    }
}
