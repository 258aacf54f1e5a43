//! Layer styling and impact propagation.
//!
//! [`ArchitectureDecorator`] takes a raw dependency graph and, in order:
//!
//! 1. optionally removes redundant direct edges (see [`ReductionPolicy`]);
//! 2. styles the nodes of every layer and groups them on one visual row;
//! 3. marks every impacted node and all of its transitive dependents;
//! 4. sets the graph-level layout hints.
//!
//! Marking walks incoming edges, i.e. from a dependency to the components
//! that depend on it, with a visited set so cyclic graphs terminate. The
//! graph root (named after the architecture) is a synthetic node, not a
//! component: edges into marked nodes are colored but the root itself is
//! never marked.
//!
//! [`ReductionPolicy`]: crate::graph::ReductionPolicy

mod selector;

pub use selector::{LayerSelector, ManifestTreeLayerSelector, PROJECT_EXTENSIONS, PrefixLayerSelector};

use crate::domain::{Architecture, ImpactAnalysisParameters};
use crate::graph::{
    ArchitectureGraph, Color, EdgeRouting, LayerDirection, LayoutHints, NodeShape, PackingMethod,
};
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Space between a layer node's label and its border.
pub const LAYER_LABEL_MARGIN: u32 = 5;

/// Layout hints applied to every decorated graph.
pub const DECORATED_LAYOUT: LayoutHints = LayoutHints {
    direction: LayerDirection::LeftToRight,
    node_separation: 30.0,
    cluster_margin: 50.0,
    routing: EdgeRouting::Splines,
    cone_angle: 5.0,
    packing: PackingMethod::Columns,
};

/// Annotates a graph for an architecture and returns the marked ids.
pub trait GraphDecorator: Send + Sync {
    /// Decorate `graph` in place.
    ///
    /// Returns every marked id (impacted nodes and their transitive
    /// dependents), deduplicated and sorted case-insensitively.
    fn decorate(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        graph: &mut ArchitectureGraph,
        impacted: &[String],
    ) -> Vec<String>;
}

/// The standard [`GraphDecorator`].
#[derive(Clone)]
pub struct ArchitectureDecorator {
    selector: Arc<dyn LayerSelector>,
}

impl ArchitectureDecorator {
    /// Decorator selecting layer nodes by prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::with_selector(Arc::new(PrefixLayerSelector))
    }

    /// Decorator selecting layer nodes with `selector`.
    #[must_use]
    pub fn with_selector(selector: Arc<dyn LayerSelector>) -> Self {
        Self { selector }
    }

    fn style_layers(&self, architecture: &Architecture, graph: &mut ArchitectureGraph) {
        for layer in &architecture.layers {
            let members = self.selector.select(layer, graph);
            debug!(layer = %layer.name, nodes = members.len(), "Styling layer");

            let colors = &layer.visual_attributes;
            for id in &members {
                if let Some(node) = graph.node_mut(id) {
                    node.style.fill = Some(colors.node_background);
                    node.style.border = Some(colors.node_border);
                    node.style.text = Some(colors.node_text);
                    node.style.shape = NodeShape::Box;
                    node.style.label_margin = LAYER_LABEL_MARGIN;
                }
            }
            graph.add_same_layer_group(members);
        }
    }
}

impl Default for ArchitectureDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArchitectureDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchitectureDecorator").finish_non_exhaustive()
    }
}

impl GraphDecorator for ArchitectureDecorator {
    fn decorate(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        graph: &mut ArchitectureGraph,
        impacted: &[String],
    ) -> Vec<String> {
        if parameters.remove_redundant_dependencies {
            let removed = graph.remove_redundant_edges(parameters.reduction_policy);
            info!(
                removed = removed.len(),
                policy = ?parameters.reduction_policy,
                "Removed redundant dependencies"
            );
        }

        self.style_layers(architecture, graph);

        let marked = match architecture.top_layer() {
            Some(top) => mark_impacted(
                graph,
                &architecture.name,
                impacted,
                top.visual_attributes.impacted_node_border,
                top.visual_attributes.impacted_edge,
            ),
            None => Vec::new(),
        };

        graph.set_layout(DECORATED_LAYOUT);
        info!(
            impacted = impacted.len(),
            marked = marked.len(),
            "Decorated architecture graph"
        );
        marked
    }
}

/// Mark every node whose id or label is in `impacted`, then all of their
/// dependents. Returns the marked ids, deduplicated and sorted
/// case-insensitively.
pub fn mark_impacted(
    graph: &mut ArchitectureGraph,
    root: &str,
    impacted: &[String],
    border: Color,
    edge_color: Color,
) -> Vec<String> {
    let wanted: HashSet<String> = impacted.iter().map(|id| id.to_lowercase()).collect();
    let seeds: Vec<NodeIndex> = graph
        .inner()
        .node_indices()
        .filter(|&idx| {
            let node = &graph.inner()[idx];
            wanted.contains(&node.id().to_lowercase()) || wanted.contains(&node.label().to_lowercase())
        })
        .collect();

    let inner = graph.inner_mut();
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut stack = seeds;
    let mut marked = Vec::new();

    while let Some(idx) = stack.pop() {
        if !visited.insert(idx) {
            continue;
        }

        if !inner[idx].id().eq_ignore_ascii_case(root) {
            inner[idx].style.border = Some(border);
            marked.push(inner[idx].id().to_string());
        }

        let incoming: Vec<_> = inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.source()))
            .collect();
        for (edge, source) in incoming {
            inner[edge].style.color = Some(edge_color);
            if !visited.contains(&source) {
                stack.push(source);
            }
        }
    }

    sort_unique_ci(marked)
}

/// Deduplicate case-insensitively (first spelling wins) and sort.
pub(crate) fn sort_unique_ci(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> = ids
        .into_iter()
        .filter(|id| seen.insert(id.to_lowercase()))
        .collect();
    unique.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchitectureLayer;
    use rstest::rstest;

    fn architecture() -> Architecture {
        let mut core = ArchitectureLayer::new("Core", "Core");
        core.visual_attributes.node_background = Color::rgb(0xAD, 0xD8, 0xE6);
        let mut app = ArchitectureLayer::new("App", "App");
        app.visual_attributes.impacted_node_border = Color::rgb(0xFF, 0xA5, 0x00);
        Architecture {
            name: "Product".to_string(),
            description: String::new(),
            layers: vec![core, app],
            analyzer: None,
        }
    }

    fn chain() -> ArchitectureGraph {
        let mut graph = ArchitectureGraph::new("Product");
        graph.add_edge("Product", "A");
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");
        graph
    }

    fn impacted(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn marking_reaches_every_ancestor() {
        let mut graph = chain();

        let marked = mark_impacted(&mut graph, "Product", &impacted(&["C"]), Color::RED, Color::RED);

        assert_eq!(marked, vec!["A", "B", "C"]);
        assert_eq!(graph.node("A").unwrap().style.border, Some(Color::RED));
        assert_eq!(graph.node("Product").unwrap().style.border, None);
        assert_eq!(
            graph.edge_style("Product", "A").unwrap().color,
            Some(Color::RED)
        );
    }

    #[test]
    fn nothing_impacted_marks_nothing() {
        let mut graph = chain();

        let marked = mark_impacted(&mut graph, "Product", &[], Color::RED, Color::RED);

        assert!(marked.is_empty());
        assert!(graph.edges().all(|(_, _, e)| e.style.color.is_none()));
    }

    #[test]
    fn marking_terminates_on_cycles() {
        let mut graph = ArchitectureGraph::new("g");
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");
        graph.add_edge("C", "A");
        graph.add_edge("X", "C");

        let marked = mark_impacted(&mut graph, "g", &impacted(&["b"]), Color::RED, Color::RED);

        assert_eq!(marked, vec!["A", "B", "C", "X"]);
    }

    #[test]
    fn impacted_ids_match_labels_case_insensitively() {
        let mut graph = ArchitectureGraph::new("g");
        graph.add_node_with_label("App.Main (net8.0)", "App.Main");
        graph.add_edge("App.Main (net8.0)", "Core");

        let marked = mark_impacted(&mut graph, "g", &impacted(&["app.main"]), Color::RED, Color::RED);

        assert_eq!(marked, vec!["App.Main (net8.0)"]);
    }

    #[test]
    fn decorate_styles_layers_and_uses_top_layer_colors() {
        let mut graph = ArchitectureGraph::new("Product");
        graph.add_edge("Product", "App.Main");
        graph.add_edge("App.Main", "Core.Util");

        let marked = ArchitectureDecorator::new().decorate(
            &architecture(),
            &ImpactAnalysisParameters::default(),
            &mut graph,
            &impacted(&["Core.Util"]),
        );

        assert_eq!(marked, vec!["App.Main", "Core.Util"]);

        let core = graph.node("Core.Util").unwrap();
        assert_eq!(core.style.fill, Some(Color::rgb(0xAD, 0xD8, 0xE6)));
        assert_eq!(core.style.shape, NodeShape::Box);
        assert_eq!(core.style.label_margin, LAYER_LABEL_MARGIN);
        // Top layer's impacted border wins over the node's own layer.
        assert_eq!(core.style.border, Some(Color::rgb(0xFF, 0xA5, 0x00)));

        assert_eq!(
            graph.same_layer_groups(),
            &[vec!["Core.Util".to_string()], vec!["App.Main".to_string()]]
        );
        assert_eq!(*graph.layout(), DECORATED_LAYOUT);
    }

    #[rstest]
    #[case::reduction_on(true, 2)]
    #[case::reduction_off(false, 3)]
    fn redundant_edges_follow_the_flag(#[case] remove: bool, #[case] edges: usize) {
        let mut graph = ArchitectureGraph::new("g");
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");
        graph.add_edge("A", "C");
        let parameters = ImpactAnalysisParameters {
            remove_redundant_dependencies: remove,
            ..ImpactAnalysisParameters::default()
        };

        ArchitectureDecorator::new().decorate(&architecture(), &parameters, &mut graph, &[]);

        assert_eq!(graph.edge_count(), edges);
        assert!(graph.contains_edge("A", "B"));
        assert!(graph.contains_edge("B", "C"));
    }

    #[test]
    fn sort_unique_is_case_insensitive() {
        let ids = impacted(&["beta", "Alpha", "BETA", "alpha2"]);

        assert_eq!(sort_unique_ci(ids), vec!["Alpha", "alpha2", "beta"]);
    }
}
