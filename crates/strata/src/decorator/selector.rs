//! Strategies that decide which graph nodes belong to a layer.

use crate::domain::ArchitectureLayer;
use crate::graph::ArchitectureGraph;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Selects the nodes of a layer.
pub trait LayerSelector: Send + Sync {
    /// Ids of the nodes in `graph` that belong to `layer`, in graph order.
    fn select(&self, layer: &ArchitectureLayer, graph: &ArchitectureGraph) -> Vec<String>;
}

/// Selects nodes whose id equals the layer prefix or starts with `prefix.`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixLayerSelector;

impl LayerSelector for PrefixLayerSelector {
    fn select(&self, layer: &ArchitectureLayer, graph: &ArchitectureGraph) -> Vec<String> {
        graph
            .nodes()
            .filter(|node| layer.matches_prefix(node.id()))
            .map(|node| node.id().to_string())
            .collect()
    }
}

/// Project file extensions recognised under a manifest's folder.
pub const PROJECT_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj"];

/// Selects nodes whose label matches a project file found under the layer's
/// manifest folder.
///
/// The folder is walked with `.gitignore` rules applied, skipping build
/// output (`bin`, `obj`). A layer without a manifest falls back to prefix
/// matching.
#[derive(Debug, Clone)]
pub struct ManifestTreeLayerSelector {
    extensions: Vec<String>,
}

impl ManifestTreeLayerSelector {
    /// Match the default project extensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: PROJECT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }

    /// Match files with these extensions instead.
    #[must_use]
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Lowercased stems of the project files under `root`.
    fn project_names(&self, root: &Path) -> HashSet<String> {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .filter_entry(|entry| {
                !matches!(
                    entry.file_name().to_str(),
                    Some("bin" | "obj" | ".git" | ".vs")
                )
            })
            .build();

        let mut names = HashSet::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            let matches_extension = path.extension().and_then(|e| e.to_str()).is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            });
            if let (true, Some(stem)) = (matches_extension, path.file_stem()) {
                names.insert(stem.to_string_lossy().to_lowercase());
            }
        }
        names
    }
}

impl Default for ManifestTreeLayerSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerSelector for ManifestTreeLayerSelector {
    fn select(&self, layer: &ArchitectureLayer, graph: &ArchitectureGraph) -> Vec<String> {
        let Some(root) = layer.manifest_location.as_deref().map(manifest_root) else {
            return PrefixLayerSelector.select(layer, graph);
        };

        let names = self.project_names(&root);
        debug!(
            layer = %layer.name,
            root = %root.display(),
            projects = names.len(),
            "Collected layer projects"
        );

        graph
            .nodes()
            .filter(|node| names.contains(&node.label().to_lowercase()))
            .map(|node| node.id().to_string())
            .collect()
    }
}

fn manifest_root(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn graph(ids: &[&str]) -> ArchitectureGraph {
        let mut graph = ArchitectureGraph::new("root");
        for id in ids {
            graph.add_node(id);
        }
        graph
    }

    #[test]
    fn prefix_selector_requires_dot_boundary() {
        let graph = graph(&["Data.A", "Data", "DataOther.B", "App"]);
        let layer = ArchitectureLayer::new("Data", "Data");

        assert_eq!(PrefixLayerSelector.select(&layer, &graph), vec!["Data.A", "Data"]);
    }

    #[test]
    fn manifest_tree_selector_matches_project_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src/Billing.Api")).unwrap();
        std::fs::create_dir_all(root.join("src/Billing.Api/obj/Stale")).unwrap();
        std::fs::write(root.join("Billing.sln"), "").unwrap();
        std::fs::write(root.join("src/Billing.Api/Billing.Api.csproj"), "").unwrap();
        std::fs::write(root.join("src/Billing.Api/obj/Stale/Stale.csproj"), "").unwrap();

        let mut layer = ArchitectureLayer::new("Billing", "Unrelated");
        layer.manifest_location = Some(root.join("Billing.sln"));
        let graph = graph(&["billing.api", "Stale", "Other"]);

        let selected = ManifestTreeLayerSelector::new().select(&layer, &graph);

        assert_eq!(selected, vec!["billing.api"]);
    }

    #[test]
    fn manifest_tree_selector_without_manifest_uses_prefix() {
        let layer = ArchitectureLayer::new("Core", "Core");
        let graph = graph(&["Core.Util", "App.Main"]);

        let selected = ManifestTreeLayerSelector::default().select(&layer, &graph);

        assert_eq!(selected, vec!["Core.Util"]);
    }

    #[test]
    fn custom_extensions_are_honoured() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Tool.proj"), "").unwrap();
        std::fs::write(temp.path().join("Lib.csproj"), "").unwrap();

        let names = ManifestTreeLayerSelector::with_extensions(["proj"]).project_names(temp.path());

        assert!(names.contains("tool"));
        assert!(!names.contains("lib"));
    }
}
