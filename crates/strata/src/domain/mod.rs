//! Domain types for impact analysis.
//!
//! An [`Architecture`] is an ordered stack of [`ArchitectureLayer`]s. Later
//! layers sit higher, closer to the application root; the last layer owns the
//! manifest that dependency resolution starts from. [`ImpactAnalysisParameters`]
//! carries everything a single analysis run needs besides the architecture.

use crate::error::{Error, Result};
use crate::graph::{Color, ReductionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A layered software architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    /// Architecture name; also the id of the graph root.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Layers from lowest to highest.
    pub layers: Vec<ArchitectureLayer>,

    /// Name of the analyzer to run, looked up in an
    /// [`AnalyzerRegistry`](crate::registry::AnalyzerRegistry).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

impl Architecture {
    /// Parse and validate an architecture from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the JSON is malformed or fails
    /// [`Architecture::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let architecture: Self = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Invalid architecture JSON: {e}")))?;
        architecture.validate()?;
        Ok(architecture)
    }

    /// Load and validate an architecture file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or `Error::Validation`
    /// as for [`Architecture::from_json_str`].
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&content)
    }

    /// Check the required-field invariants.
    ///
    /// The name must be non-blank and there must be at least one layer. Every
    /// layer needs a name, an identifier prefix and at least one repository
    /// location. The top layer must name the manifest dependency resolution
    /// starts from.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(
                "Architecture name cannot be empty".to_string(),
            ));
        }

        if self.layers.is_empty() {
            return Err(Error::Validation(format!(
                "Architecture '{}' needs at least one layer",
                self.name
            )));
        }

        for (position, layer) in self.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|reason| Error::Validation(format!("Layer #{position}: {reason}")))?;
        }

        if self.top_layer().and_then(|l| l.manifest_location.as_ref()).is_none() {
            return Err(Error::Validation(format!(
                "The top layer of '{}' must have a manifest location",
                self.name
            )));
        }

        Ok(())
    }

    /// The last (highest) layer.
    #[must_use]
    pub fn top_layer(&self) -> Option<&ArchitectureLayer> {
        self.layers.last()
    }

    /// Manifest of the top layer, if any.
    #[must_use]
    pub fn entry_manifest(&self) -> Option<&Path> {
        self.top_layer()?.manifest_location.as_deref()
    }
}

/// One layer of an [`Architecture`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureLayer {
    /// Layer name.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Components whose id equals this prefix or starts with `prefix.` belong
    /// to the layer.
    pub identifiers_prefix: String,

    /// Source repositories of the layer. Informational.
    #[serde(default, alias = "gitRepositoryLocations")]
    pub repository_locations: Vec<String>,

    /// Entry manifest (solution file). Required on the top layer only.
    #[serde(default, alias = "solutionFileLocation")]
    pub manifest_location: Option<PathBuf>,

    /// Colors for normal and impacted state.
    #[serde(default)]
    pub visual_attributes: VisualAttributes,
}

impl ArchitectureLayer {
    /// Create a layer with default colors and no repositories or manifest.
    pub fn new(name: impl Into<String>, identifiers_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            identifiers_prefix: identifiers_prefix.into(),
            repository_locations: Vec::new(),
            manifest_location: None,
            visual_attributes: VisualAttributes::default(),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        if self.identifiers_prefix.trim().is_empty() {
            return Err(format!("'{}' has no identifiers prefix", self.name));
        }
        if self.repository_locations.is_empty() {
            return Err(format!(
                "'{}' needs at least one repository location",
                self.name
            ));
        }
        Ok(())
    }

    /// Whether `id` belongs to this layer by prefix.
    ///
    /// `"Data"` matches `"Data"` and `"Data.Access"` but not `"DataOther.B"`.
    #[must_use]
    pub fn matches_prefix(&self, id: &str) -> bool {
        let prefix = self.identifiers_prefix.as_str();
        if id.eq_ignore_ascii_case(prefix) {
            return true;
        }
        id.len() > prefix.len()
            && id.is_char_boundary(prefix.len())
            && id[..prefix.len()].eq_ignore_ascii_case(prefix)
            && id[prefix.len()..].starts_with('.')
    }
}

/// Colors a layer uses for its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualAttributes {
    /// Fill of a node in normal state.
    pub node_background: Color,
    /// Border of a node in normal state.
    pub node_border: Color,
    /// Label of a node in normal state.
    pub node_text: Color,
    /// Fill of an impacted node.
    pub impacted_node_background: Color,
    /// Border of an impacted node.
    pub impacted_node_border: Color,
    /// Label of an impacted node.
    pub impacted_node_text: Color,
    /// Color of edges leading into an impacted node.
    #[serde(alias = "impactedEdgeColor")]
    pub impacted_edge: Color,
}

impl Default for VisualAttributes {
    fn default() -> Self {
        Self {
            node_background: Color::WHITE,
            node_border: Color::BLACK,
            node_text: Color::BLACK,
            impacted_node_background: Color::YELLOW,
            impacted_node_border: Color::RED,
            impacted_node_text: Color::RED,
            impacted_edge: Color::RED,
        }
    }
}

/// Settings for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImpactAnalysisParameters {
    /// Folder holding graph cache files and impacted-graph output.
    pub artifacts_dir: Option<PathBuf>,

    /// Base file name of the graph cache. Only its stem is used.
    pub graph_file_name: Option<String>,

    /// File the decorated graph is written to after a run.
    pub impacted_graph_file_name: Option<String>,

    /// Remove direct edges implied by longer paths before decorating.
    pub remove_redundant_dependencies: bool,

    /// How redundant edges are detected.
    pub reduction_policy: ReductionPolicy,

    /// Inputs for the impacted-components collaborator.
    pub filters: ImpactAnalysisFilters,
}

/// Free-text inputs that feed the impacted-identifier list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImpactAnalysisFilters {
    /// Commit hashes, separated by whitespace, commas or semicolons.
    #[serde(alias = "gitCommitHashes")]
    pub commit_hashes: String,
    /// Task ids, separated by whitespace, commas or semicolons.
    pub task_ids: String,
    /// Node ids to mark as impacted, one per line.
    pub forced_nodes: String,
}

impl ImpactAnalysisFilters {
    /// Parsed commit hashes.
    #[must_use]
    pub fn commit_hashes(&self) -> Vec<String> {
        split_unique(&self.commit_hashes, |c| {
            c.is_whitespace() || c == ',' || c == ';'
        })
    }

    /// Parsed task ids.
    #[must_use]
    pub fn task_ids(&self) -> Vec<String> {
        split_unique(&self.task_ids, |c| c.is_whitespace() || c == ',' || c == ';')
    }

    /// Parsed forced node ids.
    #[must_use]
    pub fn forced_nodes(&self) -> Vec<String> {
        split_unique(&self.forced_nodes, |c| c == '\r' || c == '\n')
    }
}

/// Split, trim, drop empties, and keep the first spelling of each
/// case-insensitive duplicate.
fn split_unique(text: &str, separator: impl Fn(char) -> bool) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(str::to_string)
        .collect()
}
