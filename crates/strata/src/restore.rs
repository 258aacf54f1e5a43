//! The seam to the external package-resolution tool.
//!
//! The builder never spawns processes itself. It asks a [`RestoreTool`] for
//! the restore graph of the entry manifest and for the lock file of each
//! project. [`DotnetCli`] is the production implementation; tests supply
//! in-memory tools.

use crate::cache::unique_token;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use strata_restore::{LockFile, RestoreGraph, RestoreProject};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Resolves manifests and projects into restore output.
///
/// Implementations must be `Send + Sync`: the builder restores many projects
/// concurrently through one shared tool.
#[async_trait]
pub trait RestoreTool: Send + Sync {
    /// Produce the restore graph for an entry manifest.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` if the tool fails or its output cannot be parsed.
    async fn restore_graph(&self, manifest: &Path) -> Result<RestoreGraph>;

    /// Restore one project and load its lock file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` if the restore fails, or the lock file is
    /// missing or unreadable.
    async fn restore_project(&self, project: &RestoreProject) -> Result<LockFile>;
}

/// Default executable name.
pub const DEFAULT_DOTNET: &str = "dotnet";

/// [`RestoreTool`] backed by the `dotnet` command line.
#[derive(Debug, Clone)]
pub struct DotnetCli {
    program: PathBuf,
    scratch_dir: PathBuf,
}

impl DotnetCli {
    /// Use `dotnet` from `PATH` and the system temp folder for intermediate files.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_DOTNET),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Use a specific executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Write restore-graph files into `dir` instead of the temp folder.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Run the tool in the manifest's folder. Output is discarded; only the
    /// exit status matters.
    async fn run(&self, target: &Path, args: &[String]) -> Result<()> {
        let working_dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        debug!(
            program = %self.program.display(),
            args = ?args,
            cwd = %working_dir.display(),
            "Running resolution tool"
        );

        let start = Instant::now();
        let status = Command::new(&self.program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                Error::resolution(
                    target,
                    format!("cannot start '{}': {e}", self.program.display()),
                )
            })?;

        if status.success() {
            debug!(elapsed = ?start.elapsed(), "Resolution tool finished");
            Ok(())
        } else {
            error!(path = %target.display(), %status, "Resolution tool failed");
            Err(Error::resolution(target, format!("tool exited with {status}")))
        }
    }
}

impl Default for DotnetCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestoreTool for DotnetCli {
    async fn restore_graph(&self, manifest: &Path) -> Result<RestoreGraph> {
        if !tokio::fs::try_exists(manifest).await.unwrap_or(false) {
            return Err(Error::resolution(manifest, "manifest does not exist"));
        }

        let output = self
            .scratch_dir
            .join(format!("strata-dg-{}.json", unique_token()));
        info!(manifest = %manifest.display(), "Analyzing restore graph");

        self.run(
            manifest,
            &[
                "msbuild".to_string(),
                manifest.display().to_string(),
                "/t:GenerateRestoreGraphFile".to_string(),
                format!("/p:RestoreGraphOutputPath={}", output.display()),
            ],
        )
        .await?;

        let graph = RestoreGraph::load(&output)
            .await
            .map_err(|e| Error::resolution(manifest, e.to_string()));
        let _ = tokio::fs::remove_file(&output).await;
        let graph = graph?;

        info!(projects = graph.projects.len(), "Restore graph resolved");
        Ok(graph)
    }

    async fn restore_project(&self, project: &RestoreProject) -> Result<LockFile> {
        self.run(
            &project.path,
            &["restore".to_string(), project.path.display().to_string()],
        )
        .await?;

        let lock_path = project.lock_file_path().ok_or_else(|| {
            Error::resolution(&project.path, "project has no restore output folder")
        })?;

        match LockFile::load(&lock_path).await {
            Ok(Some(lock_file)) => Ok(lock_file),
            Ok(None) => Err(Error::resolution(
                &project.path,
                format!("lock file '{}' not found", lock_path.display()),
            )),
            Err(e) => Err(Error::resolution(&project.path, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_restore::ProjectStyle;
    use tempfile::TempDir;

    fn project(dir: &Path) -> RestoreProject {
        RestoreProject {
            name: "App.Main".to_string(),
            path: dir.join("App.Main.csproj"),
            output_path: Some(dir.join("obj")),
            style: ProjectStyle::PackageReference,
            frameworks: vec![],
        }
    }

    #[tokio::test]
    async fn missing_manifest_is_a_resolution_error() {
        let temp = TempDir::new().unwrap();
        let tool = DotnetCli::new();

        let err = tool
            .restore_graph(&temp.path().join("missing.sln"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_resolution_error() {
        let temp = TempDir::new().unwrap();
        let tool = DotnetCli::new().with_program(temp.path().join("no-such-dotnet"));

        let err = tool.restore_project(&project(temp.path())).await.unwrap_err();

        match err {
            Error::Resolution { manifest, reason } => {
                assert!(manifest.ends_with("App.Main.csproj"));
                assert!(reason.contains("cannot start"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
