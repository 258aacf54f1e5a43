//! Named analyzer constructors.
//!
//! An architecture file may name the analyzer it wants. The registry maps
//! such names to constructors that assemble an [`ImpactAnalyzer`] from the
//! analysis settings.

use crate::config::AnalysisConfig;
use crate::decorator::{ArchitectureDecorator, ManifestTreeLayerSelector};
use crate::domain::Architecture;
use crate::error::{Error, Result};
use crate::pipeline::{ImpactAnalyzer, RestoreGraphProvider};
use crate::tracker::FiltersTracker;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Analyzer used when neither the architecture nor the settings name one.
pub const DEFAULT_ANALYZER: &str = "default";

/// Analyzer that selects layer nodes from the project files under each
/// layer's manifest folder.
pub const MANIFEST_TREE_ANALYZER: &str = "manifest-tree";

/// Builds an analyzer from settings.
pub type AnalyzerConstructor =
    Arc<dyn Fn(&AnalysisConfig) -> Result<ImpactAnalyzer> + Send + Sync>;

/// Maps analyzer names (case-insensitive) to constructors.
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    constructors: BTreeMap<String, AnalyzerConstructor>,
}

impl AnalyzerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in analyzers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_ANALYZER, |config| {
            Ok(standard_analyzer(config, ArchitectureDecorator::new()))
        });
        registry.register(MANIFEST_TREE_ANALYZER, |config| {
            let decorator =
                ArchitectureDecorator::with_selector(Arc::new(ManifestTreeLayerSelector::new()));
            Ok(standard_analyzer(config, decorator))
        });
        registry
    }

    /// Register `constructor` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: &str,
        constructor: impl Fn(&AnalysisConfig) -> Result<ImpactAnalyzer> + Send + Sync + 'static,
    ) {
        self.constructors
            .insert(name.to_lowercase(), Arc::new(constructor));
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_lowercase())
    }

    /// Construct the analyzer registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown name, or whatever the
    /// constructor returns.
    pub fn create(&self, name: &str, config: &AnalysisConfig) -> Result<ImpactAnalyzer> {
        let constructor = self.constructors.get(&name.to_lowercase()).ok_or_else(|| {
            Error::Config(format!(
                "Unknown analyzer '{name}'. Registered: {}",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        debug!(analyzer = name, "Creating analyzer");
        constructor(config)
    }

    /// Construct the analyzer for `architecture`: its own choice, else the
    /// settings' choice, else [`DEFAULT_ANALYZER`].
    ///
    /// # Errors
    ///
    /// As for [`AnalyzerRegistry::create`].
    pub fn for_architecture(
        &self,
        architecture: &Architecture,
        config: &AnalysisConfig,
    ) -> Result<ImpactAnalyzer> {
        let name = architecture
            .analyzer
            .as_deref()
            .or(config.analyzer.as_deref())
            .unwrap_or(DEFAULT_ANALYZER);
        self.create(name, config)
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn standard_analyzer(config: &AnalysisConfig, decorator: ArchitectureDecorator) -> ImpactAnalyzer {
    let provider = RestoreGraphProvider::new(Arc::new(config.restore_tool()))
        .with_options(config.builder_options());
    ImpactAnalyzer::new(Arc::new(provider), Arc::new(FiltersTracker), Arc::new(decorator))
}
