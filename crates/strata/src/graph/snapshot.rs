//! Serializable form of an [`ArchitectureGraph`].
//!
//! The snapshot is what the graph cache writes to disk and what a renderer
//! consumes. It lists nodes and edges in insertion order together with their
//! style, the same-row groups, and the layout hints.

use super::{ArchitectureGraph, EdgeStyle, LayoutHints, NodeStyle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A node as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Visual attributes.
    #[serde(default)]
    pub style: NodeStyle,
}

/// An edge as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// Dependent node id.
    pub source: String,
    /// Dependency node id.
    pub target: String,
    /// Visual attributes.
    #[serde(default)]
    pub style: EdgeStyle,
}

/// Plain-data copy of a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Graph name.
    pub name: String,
    /// Nodes in insertion order.
    pub nodes: Vec<NodeSnapshot>,
    /// Edges in insertion order.
    pub edges: Vec<EdgeSnapshot>,
    /// Same-row groups.
    #[serde(default)]
    pub same_layer_groups: Vec<Vec<String>>,
    /// Layout hints.
    #[serde(default)]
    pub layout: LayoutHints,
}

impl ArchitectureGraph {
    /// Copy the graph into its serializable form.
    #[must_use]
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            name: self.name().to_string(),
            nodes: self
                .nodes()
                .map(|n| NodeSnapshot {
                    id: n.id().to_string(),
                    label: n.label().to_string(),
                    style: n.style.clone(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(s, t, e)| EdgeSnapshot {
                    source: s.id().to_string(),
                    target: t.id().to_string(),
                    style: e.style.clone(),
                })
                .collect(),
            same_layer_groups: self.same_layer_groups().to_vec(),
            layout: *self.layout(),
        }
    }

    /// Rebuild a graph from a snapshot.
    ///
    /// The graph invariants win over the snapshot: nodes that differ only by
    /// case collapse into the first one, and duplicate edges are dropped.
    /// Edges naming an unknown node create it.
    #[must_use]
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new(snapshot.name);

        for node in snapshot.nodes {
            let idx = graph.add_node_with_label(&node.id, &node.label);
            graph.inner_mut()[idx].style = node.style;
        }

        for edge in snapshot.edges {
            match graph.insert_edge(&edge.source, &edge.target) {
                Some(idx) => graph.inner_mut()[idx].style = edge.style,
                None => debug!(
                    from = %edge.source,
                    to = %edge.target,
                    "Dropping duplicate edge from snapshot"
                ),
            }
        }

        for group in snapshot.same_layer_groups {
            graph.add_same_layer_group(group);
        }
        graph.set_layout(snapshot.layout);
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Color, NodeShape};

    #[test]
    fn snapshot_preserves_structure_and_style() {
        let mut graph = ArchitectureGraph::new("Product");
        graph.add_edge("Product", "App.Main");
        graph.add_edge("App.Main", "Core.Util");
        let node = graph.node_mut("Core.Util").unwrap();
        node.style.border = Some(Color::RED);
        node.style.shape = NodeShape::Box;
        graph.add_same_layer_group(vec!["Core.Util".to_string()]);

        let restored = ArchitectureGraph::from_snapshot(graph.to_snapshot());

        assert_eq!(restored.to_snapshot(), graph.to_snapshot());
        assert_eq!(
            restored.node("core.util").unwrap().style.border,
            Some(Color::RED)
        );
    }

    #[test]
    fn duplicate_snapshot_edges_collapse() {
        let snapshot = GraphSnapshot {
            name: "g".to_string(),
            nodes: vec![],
            edges: vec![
                EdgeSnapshot {
                    source: "A".to_string(),
                    target: "B".to_string(),
                    style: EdgeStyle::default(),
                },
                EdgeSnapshot {
                    source: "a".to_string(),
                    target: "b".to_string(),
                    style: EdgeStyle::default(),
                },
            ],
            same_layer_groups: vec![],
            layout: LayoutHints::default(),
        };

        let graph = ArchitectureGraph::from_snapshot(snapshot);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn snapshot_json_omits_default_colors() {
        let mut graph = ArchitectureGraph::new("g");
        graph.add_edge("A", "B");

        let json = serde_json::to_string(&graph.to_snapshot()).unwrap();

        assert!(!json.contains("fill"));
        assert!(json.contains("\"source\":\"A\""));
    }
}
