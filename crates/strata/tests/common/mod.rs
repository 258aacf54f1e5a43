//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strata::domain::{Architecture, ArchitectureLayer};
use strata::error::{Error, Result};
use strata::restore::RestoreTool;
use strata_restore::{
    LibraryDependency, LockFile, LockFileLibrary, LockFileTarget, PackageDependency, ProjectStyle,
    RestoreGraph, RestoreProject, TargetFramework,
};
use tokio::sync::{Notify, Semaphore};

pub const MANIFEST: &str = "/repo/App/App.sln";

/// Two layers, `Core` below `App`, resolved from [`MANIFEST`].
pub fn architecture() -> Architecture {
    let mut core = ArchitectureLayer::new("Core", "Core");
    core.repository_locations = vec!["https://git.example.com/core".to_string()];
    let mut app = ArchitectureLayer::new("App", "App");
    app.repository_locations = vec!["https://git.example.com/app".to_string()];
    app.manifest_location = Some(PathBuf::from(MANIFEST));

    Architecture {
        name: "Product".to_string(),
        description: "Test product".to_string(),
        layers: vec![core, app],
        analyzer: None,
    }
}

/// A package-reference project with the given frameworks and direct package dependencies.
pub fn project(name: &str, frameworks: &[(&str, &[&str])]) -> RestoreProject {
    RestoreProject {
        name: name.to_string(),
        path: PathBuf::from(format!("/repo/{name}/{name}.csproj")),
        output_path: Some(PathBuf::from(format!("/repo/{name}/obj"))),
        style: ProjectStyle::PackageReference,
        frameworks: frameworks
            .iter()
            .map(|(tfm, deps)| {
                TargetFramework::new(
                    *tfm,
                    deps.iter().map(|d| LibraryDependency::package(*d)).collect(),
                )
            })
            .collect(),
    }
}

/// A lock file with one target per framework, each holding `libraries`
/// as `(name, [dependency ids])`.
pub fn lock_file(frameworks: &[&str], libraries: &[(&str, &[&str])]) -> LockFile {
    let libraries: Vec<LockFileLibrary> = libraries
        .iter()
        .map(|(name, deps)| {
            LockFileLibrary::package(
                *name,
                "1.0.0",
                deps.iter()
                    .map(|d| PackageDependency::new(*d, "[1.0.0, )"))
                    .collect(),
            )
        })
        .collect();

    LockFile {
        version: Some(3),
        targets: frameworks
            .iter()
            .map(|tfm| LockFileTarget::new(*tfm, libraries.clone()))
            .collect(),
    }
}

/// In-memory [`RestoreTool`] that counts calls.
#[derive(Default)]
pub struct MockRestoreTool {
    graph: RestoreGraph,
    lock_files: HashMap<String, LockFile>,
    fail_graph: bool,
    fail_project: Option<String>,
    delay: Option<Duration>,
    gate: Option<(Arc<Semaphore>, Arc<Notify>)>,
    graph_calls: AtomicUsize,
    project_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRestoreTool {
    pub fn new(projects: Vec<RestoreProject>) -> Self {
        Self {
            graph: RestoreGraph { projects },
            ..Self::default()
        }
    }

    pub fn with_lock_file(mut self, project: &str, lock_file: LockFile) -> Self {
        self.lock_files.insert(project.to_lowercase(), lock_file);
        self
    }

    /// Make `restore_graph` fail as a non-zero tool exit would.
    pub fn failing_graph(mut self) -> Self {
        self.fail_graph = true;
        self
    }

    /// Make `restore_project` fail for `project`.
    pub fn failing_project(mut self, project: &str) -> Self {
        self.fail_project = Some(project.to_string());
        self
    }

    /// Sleep this long inside every project restore.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block `restore_graph` on `gate` after signalling `started`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>, started: Arc<Notify>) -> Self {
        self.gate = Some((gate, started));
        self
    }

    pub fn graph_calls(&self) -> usize {
        self.graph_calls.load(Ordering::SeqCst)
    }

    pub fn project_calls(&self) -> usize {
        self.project_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_restores(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RestoreTool for MockRestoreTool {
    async fn restore_graph(&self, manifest: &Path) -> Result<RestoreGraph> {
        self.graph_calls.fetch_add(1, Ordering::SeqCst);

        if let Some((gate, started)) = &self.gate {
            started.notify_one();
            let _permit = gate.acquire().await;
        }

        if self.fail_graph {
            return Err(Error::resolution(manifest, "tool exited with exit status: 1"));
        }
        Ok(self.graph.clone())
    }

    async fn restore_project(&self, project: &RestoreProject) -> Result<LockFile> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self
            .fail_project
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(&project.name))
        {
            return Err(Error::resolution(&project.path, "tool exited with exit status: 1"));
        }

        self.lock_files
            .get(&project.name.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::resolution(&project.path, "lock file not found"))
    }
}
