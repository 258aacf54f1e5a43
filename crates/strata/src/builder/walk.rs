//! Recursive, concurrent walk of one build.
//!
//! A [`GraphWalk`] lives for exactly one build. It owns the graph under
//! construction behind a single mutex; every edge insertion both checks and
//! records the (source, target) pair under that lock, so no two workers can
//! create the same edge and a sub-tree whose entry edge already exists is
//! never walked twice.

use super::filters::BuildFilters;
use crate::error::{Error, Result};
use crate::graph::ArchitectureGraph;
use crate::restore::RestoreTool;
use futures::future::{BoxFuture, FutureExt, try_join_all};
use std::sync::atomic::{AtomicBool, Ordering};
use strata_restore::{LibraryDependency, LockFile, LockFileTarget, RestoreProject, TargetFramework};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub(super) struct GraphWalk<'a> {
    pub(super) root: &'a str,
    pub(super) tool: &'a dyn RestoreTool,
    pub(super) filters: &'a BuildFilters,
    pub(super) restore_permits: Option<&'a Semaphore>,
    pub(super) disposed: &'a AtomicBool,
    pub(super) cancel: &'a CancellationToken,
    pub(super) graph: Mutex<ArchitectureGraph>,
}

impl GraphWalk<'_> {
    /// Stop if the job was disposed or the build cancelled.
    pub(super) fn checkpoint(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::State("The build job has been disposed".to_string()));
        }
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub(super) fn into_graph(self) -> ArchitectureGraph {
        self.graph.into_inner()
    }

    /// Insert `from -> to`. `false` means the edge existed and its sub-tree
    /// has been (or is being) walked by someone else.
    async fn add_edge(&self, from: &str, to: &str) -> Result<bool> {
        self.checkpoint()?;
        Ok(self.graph.lock().await.add_edge(from, to))
    }

    /// Restore `project` and walk every (filtered) target framework.
    pub(super) async fn project(&self, project: &RestoreProject) -> Result<()> {
        debug!(project = %project.name, "Started analyzing project");
        let lock_file = self.restore(project).await?;

        let frameworks = self.filters.frameworks(&project.frameworks);
        let qualify = frameworks.len() > 1;
        try_join_all(
            frameworks
                .iter()
                .map(|framework| self.framework(project, framework, qualify, &lock_file)),
        )
        .await?;

        debug!(project = %project.name, "Completed analyzing project");
        Ok(())
    }

    async fn restore(&self, project: &RestoreProject) -> Result<LockFile> {
        let _permit = match self.restore_permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| Error::State("Restore limiter closed".to_string()))?,
            ),
            None => None,
        };
        self.checkpoint()?;

        self.tool.restore_project(project).await.inspect_err(|e| {
            error!(project = %project.name, error = %e, "Unable to restore project");
        })
    }

    async fn framework(
        &self,
        project: &RestoreProject,
        framework: &TargetFramework,
        qualify: bool,
        lock_file: &LockFile,
    ) -> Result<()> {
        let node = if qualify {
            format!("{} ({})", project.name, framework.name)
        } else {
            project.name.clone()
        };
        debug!(node = %node, "Processing");

        if !self.add_edge(self.root, &node).await? {
            return Ok(());
        }

        let Some(target) = lock_file.target_for(&framework.name) else {
            warn!(
                project = %project.name,
                framework = %framework.name,
                "Lock file has no target for framework"
            );
            return Ok(());
        };

        let dependencies = self.filters.dependencies(&framework.dependencies);
        try_join_all(
            dependencies
                .iter()
                .map(|dependency| self.direct_dependency(&node, dependency, target)),
        )
        .await?;
        Ok(())
    }

    async fn direct_dependency(
        &self,
        node: &str,
        dependency: &LibraryDependency,
        target: &LockFileTarget,
    ) -> Result<()> {
        if !self.add_edge(node, &dependency.name).await? {
            return Ok(());
        }
        self.expand(&dependency.name, target).await
    }

    /// Walk the recorded dependencies of library `name`, recursing only
    /// through edges this call inserted.
    fn expand<'s>(&'s self, name: &'s str, target: &'s LockFileTarget) -> BoxFuture<'s, Result<()>> {
        async move {
            self.checkpoint()?;

            let Some(library) = target.library(name) else {
                warn!(dependency = %name, framework = %target.framework, "Dependency cannot be resolved");
                return Ok(());
            };

            let children = self.filters.package_dependencies(&library.dependencies);
            try_join_all(children.iter().map(|child| async move {
                if self.add_edge(name, &child.id).await? {
                    self.expand(&child.id, target).await
                } else {
                    Ok(())
                }
            }))
            .await?;
            Ok(())
        }
        .boxed()
    }
}
