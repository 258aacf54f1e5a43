//! The result of an analysis run.

use crate::graph::ArchitectureGraph;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Final graph, impacted ids and marked ids of one run, plus a summary report.
///
/// The report is rendered on first read and cached. Replacing any part, or
/// borrowing the graph mutably, drops the cache so the next read reflects the
/// current state.
#[derive(Debug, Clone)]
pub struct ImpactAnalysisDescriptor {
    graph: ArchitectureGraph,
    impacted: Vec<String>,
    marked: Vec<String>,
    report: OnceLock<String>,
}

impl ImpactAnalysisDescriptor {
    /// Assemble a descriptor.
    #[must_use]
    pub fn new(graph: ArchitectureGraph, impacted: Vec<String>, marked: Vec<String>) -> Self {
        Self {
            graph,
            impacted,
            marked,
            report: OnceLock::new(),
        }
    }

    /// The decorated graph.
    #[must_use]
    pub fn graph(&self) -> &ArchitectureGraph {
        &self.graph
    }

    /// Mutable access to the graph. Invalidates the report.
    pub fn graph_mut(&mut self) -> &mut ArchitectureGraph {
        self.report = OnceLock::new();
        &mut self.graph
    }

    /// Replace the graph.
    pub fn set_graph(&mut self, graph: ArchitectureGraph) {
        self.graph = graph;
        self.report = OnceLock::new();
    }

    /// Directly impacted ids, in the order the tracker reported them.
    #[must_use]
    pub fn impacted(&self) -> &[String] {
        &self.impacted
    }

    /// Replace the impacted ids.
    pub fn set_impacted(&mut self, impacted: Vec<String>) {
        self.impacted = impacted;
        self.report = OnceLock::new();
    }

    /// Marked ids: impacted nodes and all their dependents, sorted.
    #[must_use]
    pub fn marked(&self) -> &[String] {
        &self.marked
    }

    /// Replace the marked ids.
    pub fn set_marked(&mut self, marked: Vec<String>) {
        self.marked = marked;
        self.report = OnceLock::new();
    }

    /// Human-readable summary.
    ///
    /// ```text
    /// - Total nodes: 3
    /// - Total edges: 2
    /// - Directly impacted components: 1
    ///   > Core.Util
    /// - Globally impacted components: 2
    ///   > App.Main
    ///   > Core.Util
    /// ```
    pub fn report(&self) -> &str {
        self.report.get_or_init(|| self.render_report())
    }

    /// Consume the descriptor.
    #[must_use]
    pub fn into_parts(self) -> (ArchitectureGraph, Vec<String>, Vec<String>) {
        (self.graph, self.impacted, self.marked)
    }

    fn render_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "- Total nodes: {}", self.graph.node_count());
        let _ = writeln!(report, "- Total edges: {}", self.graph.edge_count());
        write_section(&mut report, "Directly impacted components", &self.impacted);
        write_section(&mut report, "Globally impacted components", &self.marked);
        report
    }
}

fn write_section(report: &mut String, title: &str, ids: &[String]) {
    if ids.is_empty() {
        let _ = writeln!(report, "- {title}: NONE");
        return;
    }
    let _ = writeln!(report, "- {title}: {}", ids.len());
    for id in ids {
        let _ = writeln!(report, "  > {id}");
    }
}
