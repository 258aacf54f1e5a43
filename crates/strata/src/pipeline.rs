//! End-to-end impact analysis.
//!
//! [`ImpactAnalyzer::analyze`] moves linearly through
//!
//! ```text
//! Start -> AcquireGraph -> InferImpact -> Decorate -> Completed
//! ```
//!
//! and reports [`PipelineStage::Failed`] if any stage returns an error. Each
//! transition is logged and sent to the event sink as a message. Nothing is
//! retried; the error is handed back to the caller unchanged.
//!
//! # Graph cache
//!
//! When the parameters name an existing artifacts folder and a graph file
//! name, the newest cache file for that name is offered for reuse. The offer
//! is a yes/no question, so it only happens when an event sink is attached.
//! A "yes" loads the cached graph and skips the builder entirely. Otherwise a
//! fresh graph is built and, if it has nodes and edges, saved under a new
//! cache file name; the file that was offered is never overwritten.

use crate::builder::{BuildFilters, BuilderOptions, DependencyGraphBuilder};
use crate::cache;
use crate::decorator::{GraphDecorator, sort_unique_ci};
use crate::descriptor::ImpactAnalysisDescriptor;
use crate::domain::{Architecture, ImpactAnalysisParameters};
use crate::error::{Error, Result};
use crate::events::{EventSink, MessageLevel};
use crate::graph::ArchitectureGraph;
use crate::restore::RestoreTool;
use crate::tracker::ImpactedComponentsProvider;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Produces a fresh dependency graph for an architecture.
#[async_trait]
pub trait GraphProvider: Send + Sync {
    /// Build the graph.
    ///
    /// # Errors
    ///
    /// Any builder error: validation, resolution, cancellation.
    async fn build_graph(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph>;
}

/// [`GraphProvider`] that runs a [`DependencyGraphBuilder`] per call.
#[derive(Clone)]
pub struct RestoreGraphProvider {
    tool: Arc<dyn RestoreTool>,
    filters: BuildFilters,
    options: BuilderOptions,
}

impl RestoreGraphProvider {
    /// Build through `tool` without filters.
    #[must_use]
    pub fn new(tool: Arc<dyn RestoreTool>) -> Self {
        Self {
            tool,
            filters: BuildFilters::default(),
            options: BuilderOptions::default(),
        }
    }

    /// Apply `filters` to every build.
    #[must_use]
    pub fn with_filters(mut self, filters: BuildFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Use `options` for every build.
    #[must_use]
    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for RestoreGraphProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreGraphProvider")
            .field("filters", &self.filters)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GraphProvider for RestoreGraphProvider {
    async fn build_graph(
        &self,
        architecture: &Architecture,
        _parameters: &ImpactAnalysisParameters,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph> {
        let builder = DependencyGraphBuilder::new(
            architecture.clone(),
            Arc::clone(&self.tool),
            self.filters.clone(),
            self.options,
        )?;
        let graph = builder.build(events, cancel).await;
        builder.dispose();
        graph
    }
}

/// Where an analysis run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Inputs are being validated.
    Start,
    /// The graph is being loaded from cache or built.
    AcquireGraph,
    /// Impacted components are being collected.
    InferImpact,
    /// The graph is being decorated.
    Decorate,
    /// The run finished.
    Completed,
    /// The run failed.
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Start => "Starting impact analysis",
            Self::AcquireGraph => "Creating architecture graph",
            Self::InferImpact => "Inferring impacted components",
            Self::Decorate => "Decorating architecture graph",
            Self::Completed => "Analysis completed",
            Self::Failed => "Analysis failed",
        };
        f.write_str(text)
    }
}

/// Runs the acquire, infer and decorate stages with pluggable collaborators.
#[derive(Clone)]
pub struct ImpactAnalyzer {
    provider: Arc<dyn GraphProvider>,
    tracker: Arc<dyn ImpactedComponentsProvider>,
    decorator: Arc<dyn GraphDecorator>,
}

impl ImpactAnalyzer {
    /// Assemble an analyzer.
    #[must_use]
    pub fn new(
        provider: Arc<dyn GraphProvider>,
        tracker: Arc<dyn ImpactedComponentsProvider>,
        decorator: Arc<dyn GraphDecorator>,
    ) -> Self {
        Self {
            provider,
            tracker,
            decorator,
        }
    }

    /// Run a full analysis.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the architecture is invalid
    /// - `Error::Cancelled` if `cancel` fires
    /// - any error of the graph provider, tracker, or cache
    pub async fn analyze(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ImpactAnalysisDescriptor> {
        let start = Instant::now();
        let mut stage = PipelineStage::Start;

        match self
            .run(architecture, parameters, events, cancel, &mut stage)
            .await
        {
            Ok(descriptor) => {
                enter(&mut stage, PipelineStage::Completed, events);
                info!(elapsed = ?start.elapsed(), "Impact analysis finished");
                Ok(descriptor)
            }
            Err(e) => {
                error!(stage = ?stage, error = %e, elapsed = ?start.elapsed(), "Impact analysis failed");
                if let Some(events) = events {
                    events.message(
                        MessageLevel::Error,
                        &format!("{} while {}: {e}", PipelineStage::Failed, stage_verb(stage)),
                    );
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
        stage: &mut PipelineStage,
    ) -> Result<ImpactAnalysisDescriptor> {
        enter(stage, PipelineStage::Start, events);
        architecture.validate()?;

        enter(stage, PipelineStage::AcquireGraph, events);
        let mut graph = self
            .acquire_graph(architecture, parameters, events, cancel)
            .await?;

        enter(stage, PipelineStage::InferImpact, events);
        checkpoint(cancel)?;
        let impacted = self
            .tracker
            .impacted_components(architecture, parameters, events, cancel)
            .await?;
        info!(count = impacted.len(), "Found impacted components");

        enter(stage, PipelineStage::Decorate, events);
        checkpoint(cancel)?;
        let marked = sort_unique_ci(self.decorator.decorate(
            architecture,
            parameters,
            &mut graph,
            &impacted,
        ));

        if let Some(path) = impacted_graph_path(parameters).await {
            cache::write_graph(&path, &graph).await?;
            info!(path = %path.display(), "Wrote impacted architecture graph");
        }

        Ok(ImpactAnalysisDescriptor::new(graph, impacted, marked))
    }

    async fn acquire_graph(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph> {
        let cache_location = cache_location(parameters).await;

        if let (Some((dir, name)), Some(sink)) = (cache_location, events)
            && let Some(candidate) = cache::find_newest(dir, name).await?
        {
            let file_name = candidate
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let question = format!(
                "The file '{file_name}' was found. Do you want to reuse it instead of \
                 regenerating the architecture graph from scratch?"
            );
            if sink.ask(&question).await {
                info!(path = %candidate.display(), "Reusing cached architecture graph");
                return cache::read_graph(&candidate).await;
            }
        }

        checkpoint(cancel)?;
        let graph = self
            .provider
            .build_graph(architecture, parameters, events, cancel)
            .await?;

        if let Some((dir, name)) = cache_location
            && graph.node_count() > 0
            && graph.edge_count() > 0
        {
            let path = cache::write_new(dir, name, &graph).await?;
            info!(path = %path.display(), "Saved architecture graph for reuse");
            if let Some(sink) = events {
                sink.message(
                    MessageLevel::Info,
                    &format!("Architecture graph saved to '{}'", path.display()),
                );
            }
        }

        Ok(graph)
    }
}

impl fmt::Debug for ImpactAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpactAnalyzer").finish_non_exhaustive()
    }
}

fn enter(stage: &mut PipelineStage, next: PipelineStage, events: Option<&dyn EventSink>) {
    *stage = next;
    info!(stage = ?next, "{next}");
    if let Some(events) = events {
        events.message(MessageLevel::Info, &next.to_string());
    }
}

fn stage_verb(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Start => "validating inputs",
        PipelineStage::AcquireGraph => "acquiring the architecture graph",
        PipelineStage::InferImpact => "inferring impacted components",
        PipelineStage::Decorate => "decorating the architecture graph",
        PipelineStage::Completed | PipelineStage::Failed => "finishing",
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

async fn existing_dir(parameters: &ImpactAnalysisParameters) -> Option<&Path> {
    let dir = parameters.artifacts_dir.as_deref()?;
    tokio::fs::metadata(dir)
        .await
        .ok()
        .filter(std::fs::Metadata::is_dir)
        .map(|_| dir)
}

/// Artifacts folder and graph file name, when both are usable.
async fn cache_location(parameters: &ImpactAnalysisParameters) -> Option<(&Path, &str)> {
    let name = parameters
        .graph_file_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())?;
    Some((existing_dir(parameters).await?, name))
}

async fn impacted_graph_path(parameters: &ImpactAnalysisParameters) -> Option<std::path::PathBuf> {
    let name = parameters
        .impacted_graph_file_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())?;
    Some(existing_dir(parameters).await?.join(name))
}
