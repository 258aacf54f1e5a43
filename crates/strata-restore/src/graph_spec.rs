//! Restore dependency-graph descriptions.
//!
//! The restore tool writes one description per entry manifest. The on-disk
//! layout is keyed by project path:
//!
//! ```json
//! {
//!   "format": 1,
//!   "projects": {
//!     "/src/App/App.csproj": {
//!       "restore": {
//!         "projectName": "App",
//!         "projectPath": "/src/App/App.csproj",
//!         "outputPath": "/src/App/obj/",
//!         "projectStyle": "PackageReference",
//!         "frameworks": {
//!           "net8.0": { "projectReferences": { "/src/Core/Core.csproj": {} } }
//!         }
//!       },
//!       "frameworks": {
//!         "net8.0": {
//!           "dependencies": { "Serilog": { "target": "Package", "version": "[3.1.1, )" } }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Project references live under `restore.frameworks`, package references under
//! the top-level `frameworks`. [`RestoreGraph`] merges both into a single list
//! of direct dependencies per framework.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the lock description a restore writes into a project's output folder.
pub const LOCK_FILE_NAME: &str = "project.assets.json";

/// How a project declares its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectStyle {
    /// `<PackageReference>` items in the project file. The only style the
    /// graph builder walks.
    PackageReference,
    /// Legacy `packages.config`.
    PackagesConfig,
    /// Legacy `project.json`.
    ProjectJson,
    /// A `DotnetCliToolReference` restore.
    DotnetCliTool,
    /// A standalone restore entry.
    Standalone,
    /// A dotnet tool reference.
    DotnetToolReference,
    /// Anything the reader does not recognize.
    Unknown,
}

impl ProjectStyle {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("PackageReference") => Self::PackageReference,
            Some(s) if s.eq_ignore_ascii_case("PackagesConfig") => Self::PackagesConfig,
            Some(s) if s.eq_ignore_ascii_case("ProjectJson") => Self::ProjectJson,
            Some(s) if s.eq_ignore_ascii_case("DotnetCliTool") => Self::DotnetCliTool,
            Some(s) if s.eq_ignore_ascii_case("Standalone") => Self::Standalone,
            Some(s) if s.eq_ignore_ascii_case("DotnetToolReference") => Self::DotnetToolReference,
            _ => Self::Unknown,
        }
    }
}

/// Whether a direct dependency points at a package or at another project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// A package resolved from a feed.
    Package,
    /// Another project in the same restore graph.
    Project,
}

/// A direct dependency declared by a project for one target framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDependency {
    /// Package id or referenced project name.
    pub name: String,
    /// Declared version range, when the description carries one.
    pub version_range: Option<String>,
    /// Package or project reference.
    pub kind: DependencyKind,
}

impl LibraryDependency {
    /// Create a package dependency without a version range.
    pub fn package(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_range: None,
            kind: DependencyKind::Package,
        }
    }

    /// Create a project reference.
    pub fn project(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_range: None,
            kind: DependencyKind::Project,
        }
    }
}

/// One target framework of a project with its direct dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFramework {
    /// Framework moniker or alias, e.g. `net8.0`.
    pub name: String,
    /// Direct dependencies, project references first.
    pub dependencies: Vec<LibraryDependency>,
}

impl TargetFramework {
    /// Create a framework entry.
    pub fn new(name: impl Into<String>, dependencies: Vec<LibraryDependency>) -> Self {
        Self {
            name: name.into(),
            dependencies,
        }
    }
}

/// A project listed in a restore graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreProject {
    /// Project name (file stem of the project file unless the description says otherwise).
    pub name: String,
    /// Path of the project file.
    pub path: PathBuf,
    /// Folder the restore writes the lock description into.
    pub output_path: Option<PathBuf>,
    /// Dependency declaration style.
    pub style: ProjectStyle,
    /// Target frameworks in declaration order.
    pub frameworks: Vec<TargetFramework>,
}

impl RestoreProject {
    /// Location of this project's lock description, if the output folder is known.
    #[must_use]
    pub fn lock_file_path(&self) -> Option<PathBuf> {
        self.output_path.as_ref().map(|dir| dir.join(LOCK_FILE_NAME))
    }

    /// Whether the project uses `PackageReference` style restores.
    #[must_use]
    pub fn is_package_reference(&self) -> bool {
        self.style == ProjectStyle::PackageReference
    }
}

/// The restore dependency-graph description of an entry manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreGraph {
    /// All projects reachable from the entry manifest.
    pub projects: Vec<RestoreProject>,
}

impl RestoreGraph {
    /// Parse a description from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` for malformed JSON and `Error::InvalidFormat` when
    /// a project entry lacks a usable name.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawGraphSpec = serde_json::from_str(json)?;
        if let Some(format) = raw.format {
            debug!(format, projects = raw.projects.len(), "Parsing restore graph");
        }

        let names: BTreeMap<String, String> = raw
            .projects
            .iter()
            .map(|(key, project)| (normalize_key(key), project_name(key, project)))
            .collect();

        let mut projects = Vec::with_capacity(raw.projects.len());
        for (key, project) in &raw.projects {
            let name = project_name(key, project);
            if name.is_empty() {
                return Err(Error::InvalidFormat(format!(
                    "project '{key}' has no name"
                )));
            }

            let frameworks = project
                .frameworks
                .iter()
                .map(|(tfm, framework)| {
                    let mut dependencies: Vec<LibraryDependency> = project
                        .restore
                        .frameworks
                        .get(tfm)
                        .map(|restore_fw| {
                            restore_fw
                                .project_references
                                .iter()
                                .map(|(ref_key, reference)| {
                                    let ref_path =
                                        reference.project_path.as_deref().unwrap_or(ref_key);
                                    let ref_name = names
                                        .get(&normalize_key(ref_path))
                                        .cloned()
                                        .unwrap_or_else(|| file_stem(ref_path).to_string());
                                    LibraryDependency::project(ref_name)
                                })
                                .collect()
                        })
                        .unwrap_or_default();

                    dependencies.extend(framework.dependencies.iter().map(|(id, dep)| {
                        LibraryDependency {
                            name: id.clone(),
                            version_range: dep.version().map(str::to_string),
                            kind: if dep.is_project() {
                                DependencyKind::Project
                            } else {
                                DependencyKind::Package
                            },
                        }
                    }));

                    TargetFramework {
                        name: framework.target_alias.clone().unwrap_or_else(|| tfm.clone()),
                        dependencies,
                    }
                })
                .collect();

            projects.push(RestoreProject {
                name,
                path: PathBuf::from(project.restore.project_path.as_deref().unwrap_or(key)),
                output_path: project.restore.output_path.as_deref().map(PathBuf::from),
                style: ProjectStyle::parse(project.restore.project_style.as_deref()),
                frameworks,
            });
        }

        Ok(Self { projects })
    }

    /// Load a description from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, otherwise see
    /// [`RestoreGraph::from_json_str`].
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&content)
    }

    /// Find a project by name (case-insensitive).
    #[must_use]
    pub fn project(&self, name: &str) -> Option<&RestoreProject> {
        self.projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

fn project_name(key: &str, project: &RawProject) -> String {
    project
        .restore
        .project_name
        .clone()
        .unwrap_or_else(|| file_stem(key).to_string())
}

/// Project keys may use either separator depending on the host that wrote them.
fn normalize_key(key: &str) -> String {
    key.replace('\\', "/").to_ascii_lowercase()
}

fn file_stem(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

#[derive(Deserialize)]
struct RawGraphSpec {
    #[serde(default)]
    format: Option<u32>,
    #[serde(default)]
    projects: BTreeMap<String, RawProject>,
}

#[derive(Deserialize)]
struct RawProject {
    #[serde(default)]
    restore: RawRestoreMetadata,
    #[serde(default)]
    frameworks: BTreeMap<String, RawFramework>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawRestoreMetadata {
    project_name: Option<String>,
    project_path: Option<String>,
    output_path: Option<String>,
    project_style: Option<String>,
    #[serde(default)]
    frameworks: BTreeMap<String, RawRestoreFramework>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawRestoreFramework {
    #[serde(default)]
    project_references: BTreeMap<String, RawProjectReference>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawProjectReference {
    project_path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFramework {
    target_alias: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, RawDependency>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Version(String),
    Detailed {
        target: Option<String>,
        version: Option<String>,
    },
}

impl RawDependency {
    fn version(&self) -> Option<&str> {
        match self {
            Self::Version(v) => Some(v),
            Self::Detailed { version, .. } => version.as_deref(),
        }
    }

    fn is_project(&self) -> bool {
        matches!(self, Self::Detailed { target: Some(t), .. } if t.eq_ignore_ascii_case("Project"))
    }
}
