//! Concurrent construction of the dependency graph.
//!
//! [`DependencyGraphBuilder`] resolves the top layer's manifest through a
//! [`RestoreTool`], then walks
//!
//! ```text
//! root -> project [(framework)] -> direct dependency -> transitive dependency -> ...
//! ```
//!
//! fanning out concurrently at every level. The graph root is named after the
//! architecture.
//!
//! # Deduplication
//!
//! Edges are deduplicated case-insensitively on (source, target) under one
//! mutex. Recursion continues only through an edge the current worker
//! inserted, which is what bounds the walk when many projects share
//! transitive dependencies: a diamond's shared sub-tree is expanded once.
//!
//! # Job semantics
//!
//! A builder runs one build at a time. [`DependencyGraphBuilder::build`] waits
//! for a running build to finish; [`DependencyGraphBuilder::try_build`] fails
//! with `Error::State` instead. After [`DependencyGraphBuilder::dispose`] every
//! call fails with `Error::State`, and a build in progress stops at its next
//! checkpoint. The first failure anywhere aborts the whole build and no
//! partial graph is returned.
//!
//! # Cancellation
//!
//! The token is checked before each tool call and each recursion level. A
//! tool call already running is allowed to finish.

mod filters;
mod walk;

pub use filters::{
    BuildFilters, DependencyFilter, FrameworkFilter, PackageDependencyFilter, ProjectPredicate,
};

use crate::domain::Architecture;
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::graph::ArchitectureGraph;
use crate::restore::RestoreTool;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use walk::GraphWalk;

/// Tuning knobs for [`DependencyGraphBuilder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BuilderOptions {
    /// Upper bound on concurrent project restores. `None` leaves scheduling
    /// to the runtime.
    pub max_parallel_restores: Option<usize>,
}

/// Builds an [`ArchitectureGraph`] from restore output.
pub struct DependencyGraphBuilder {
    architecture: Architecture,
    tool: Arc<dyn RestoreTool>,
    filters: BuildFilters,
    restore_permits: Option<Semaphore>,
    job: Mutex<()>,
    disposed: AtomicBool,
}

impl DependencyGraphBuilder {
    /// Create a builder for `architecture`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the architecture is invalid or
    /// `max_parallel_restores` is zero.
    pub fn new(
        architecture: Architecture,
        tool: Arc<dyn RestoreTool>,
        filters: BuildFilters,
        options: BuilderOptions,
    ) -> Result<Self> {
        info!(architecture = %architecture.name, "Validating architecture");
        architecture.validate()?;

        let restore_permits = match options.max_parallel_restores {
            Some(0) => {
                return Err(Error::Validation(
                    "max-parallel-restores must be at least 1".to_string(),
                ));
            }
            Some(n) => Some(Semaphore::new(n)),
            None => None,
        };

        Ok(Self {
            architecture,
            tool,
            filters,
            restore_permits,
            job: Mutex::new(()),
            disposed: AtomicBool::new(false),
        })
    }

    /// The architecture this builder walks.
    #[must_use]
    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Build a fresh graph, waiting for any build already in progress.
    ///
    /// # Errors
    ///
    /// - `Error::State` if the builder was disposed
    /// - `Error::Cancelled` if `cancel` fires first
    /// - `Error::Resolution` if the tool fails for the manifest or any project
    pub async fn build(
        &self,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph> {
        self.ensure_alive()?;
        let guard = tokio::select! {
            guard = self.job.lock() => guard,
            () = cancel.cancelled() => return Err(Error::Cancelled),
        };
        self.run(guard, events, cancel).await
    }

    /// Build a fresh graph unless a build is already running.
    ///
    /// # Errors
    ///
    /// Returns `Error::State` if another build holds the job, otherwise as
    /// for [`DependencyGraphBuilder::build`].
    pub async fn try_build(
        &self,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph> {
        self.ensure_alive()?;
        let guard = self
            .job
            .try_lock()
            .map_err(|_| Error::State("A build is already running".to_string()))?;
        self.run(guard, events, cancel).await
    }

    /// Retire the builder. Later calls fail and a running build stops at its
    /// next checkpoint.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        if let Some(permits) = &self.restore_permits {
            permits.close();
        }
    }

    /// Whether [`DependencyGraphBuilder::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::State("The build job has been disposed".to_string()));
        }
        Ok(())
    }

    async fn run(
        &self,
        _job: MutexGuard<'_, ()>,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph> {
        let start = Instant::now();
        info!(architecture = %self.architecture.name, "Starting architecture graph build");

        let result = self.walk(events, cancel).await;
        match &result {
            Ok(graph) => info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                elapsed = ?start.elapsed(),
                "Architecture graph build completed"
            ),
            Err(e) if e.is_cancelled() => {
                info!(elapsed = ?start.elapsed(), "Architecture graph build cancelled");
            }
            Err(e) => error!(
                error = %e,
                elapsed = ?start.elapsed(),
                "Architecture graph build failed"
            ),
        }
        result
    }

    async fn walk(
        &self,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<ArchitectureGraph> {
        let walk = GraphWalk {
            root: &self.architecture.name,
            tool: self.tool.as_ref(),
            filters: &self.filters,
            restore_permits: self.restore_permits.as_ref(),
            disposed: &self.disposed,
            cancel,
            graph: Mutex::new(ArchitectureGraph::new(&self.architecture.name)),
        };

        let manifest = self.architecture.entry_manifest().ok_or_else(|| {
            Error::Validation("The top layer has no manifest location".to_string())
        })?;

        walk.checkpoint()?;
        let restore_graph = self.tool.restore_graph(manifest).await.inspect_err(|e| {
            error!(manifest = %manifest.display(), error = %e, "Unable to resolve manifest");
        })?;

        let projects: Vec<_> = restore_graph
            .projects
            .iter()
            .filter(|p| p.is_package_reference() && self.filters.accepts_project(p))
            .collect();
        let total = projects.len();
        info!(projects = total, "Selected projects to analyze");

        let completed = AtomicUsize::new(0);
        try_join_all(projects.iter().map(|project| {
            let walk = &walk;
            let completed = &completed;
            async move {
                walk.project(project).await?;
                let done = completed.fetch_add(1, Ordering::AcqRel) + 1;
                if let Some(events) = events {
                    events.progress(percent(done, total));
                }
                Ok::<_, Error>(())
            }
        }))
        .await?;

        Ok(walk.into_graph())
    }
}

impl std::fmt::Debug for DependencyGraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraphBuilder")
            .field("architecture", &self.architecture.name)
            .field("filters", &self.filters)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(done * 100 / total).unwrap_or(100)
}
