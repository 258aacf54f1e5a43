//! Analysis settings file.
//!
//! Settings live in a YAML file with kebab-case keys:
//!
//! ```yaml
//! analyzer: default
//! artifacts-dir: ./artifacts
//! graph-file-name: architecture.json
//! impacted-graph-file-name: impacted.json
//! remove-redundant-dependencies: true
//! reduction-policy:
//!   mode: bounded-depth
//!   max_hops: 4
//! question-timeout-secs: 60
//! restore:
//!   dotnet: dotnet
//!   max-parallel-restores: 8
//! ```
//!
//! Every key is optional.

use crate::builder::BuilderOptions;
use crate::domain::{ImpactAnalysisFilters, ImpactAnalysisParameters};
use crate::error::{Error, Result};
use crate::events::{AnalysisContext, DEFAULT_QUESTION_TIMEOUT};
use crate::graph::ReductionPolicy;
use crate::restore::{DEFAULT_DOTNET, DotnetCli};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Conventional name of the settings file.
pub const CONFIG_FILE_NAME: &str = "strata.yaml";

/// Settings for running analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnalysisConfig {
    /// Registered analyzer to use when the architecture names none.
    pub analyzer: Option<String>,

    /// Folder for graph cache files and impacted-graph output.
    pub artifacts_dir: Option<PathBuf>,

    /// Base name of graph cache files.
    pub graph_file_name: Option<String>,

    /// File the decorated graph is written to.
    pub impacted_graph_file_name: Option<String>,

    /// Remove direct edges implied by longer paths.
    pub remove_redundant_dependencies: bool,

    /// How redundant edges are detected.
    pub reduction_policy: ReductionPolicy,

    /// How long a yes/no question waits before defaulting to "no".
    pub question_timeout_secs: u64,

    /// Resolution tool settings.
    pub restore: RestoreConfig,
}

/// Resolution tool section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RestoreConfig {
    /// Executable of the resolution tool.
    pub dotnet: PathBuf,

    /// Upper bound on concurrent project restores.
    pub max_parallel_restores: Option<usize>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            dotnet: PathBuf::from(DEFAULT_DOTNET),
            max_parallel_restores: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analyzer: None,
            artifacts_dir: None,
            graph_file_name: None,
            impacted_graph_file_name: None,
            remove_redundant_dependencies: false,
            reduction_policy: ReductionPolicy::default(),
            question_timeout_secs: DEFAULT_QUESTION_TIMEOUT.as_secs(),
            restore: RestoreConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load settings from a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it is not valid YAML for these settings.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save settings to a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails and `Error::Io` if the
    /// file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Reject settings that cannot work.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero restore bound or a zero-hop
    /// bounded-depth policy.
    pub fn validate(&self) -> Result<()> {
        if self.restore.max_parallel_restores == Some(0) {
            return Err(Error::Config(
                "restore.max-parallel-restores must be at least 1".to_string(),
            ));
        }
        if let ReductionPolicy::BoundedDepth { max_hops } = self.reduction_policy
            && max_hops < 2
        {
            return Err(Error::Config(
                "reduction-policy.max_hops must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Analysis parameters for these settings and `filters`.
    #[must_use]
    pub fn to_parameters(&self, filters: ImpactAnalysisFilters) -> ImpactAnalysisParameters {
        ImpactAnalysisParameters {
            artifacts_dir: self.artifacts_dir.clone(),
            graph_file_name: self.graph_file_name.clone(),
            impacted_graph_file_name: self.impacted_graph_file_name.clone(),
            remove_redundant_dependencies: self.remove_redundant_dependencies,
            reduction_policy: self.reduction_policy,
            filters,
        }
    }

    /// Builder options for these settings.
    #[must_use]
    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            max_parallel_restores: self.restore.max_parallel_restores,
        }
    }

    /// The resolution tool these settings describe.
    #[must_use]
    pub fn restore_tool(&self) -> DotnetCli {
        DotnetCli::new().with_program(&self.restore.dotnet)
    }

    /// Question timeout.
    #[must_use]
    pub fn question_timeout(&self) -> Duration {
        Duration::from_secs(self.question_timeout_secs)
    }

    /// An event context using the configured question timeout.
    #[must_use]
    pub fn context(&self) -> AnalysisContext {
        AnalysisContext::new().with_question_timeout(self.question_timeout())
    }
}
