//! Optional hooks that narrow what the builder walks.

use std::fmt;
use std::sync::Arc;
use strata_restore::{LibraryDependency, PackageDependency, RestoreProject, TargetFramework};

/// Decides whether a project is walked at all.
pub type ProjectPredicate = Arc<dyn Fn(&RestoreProject) -> bool + Send + Sync>;

/// Selects the target frameworks walked for a project.
pub type FrameworkFilter = Arc<dyn Fn(&[TargetFramework]) -> Vec<TargetFramework> + Send + Sync>;

/// Selects the direct dependencies walked for a framework.
pub type DependencyFilter =
    Arc<dyn Fn(&[LibraryDependency]) -> Vec<LibraryDependency> + Send + Sync>;

/// Selects the transitive dependencies walked for a resolved library.
pub type PackageDependencyFilter =
    Arc<dyn Fn(&[PackageDependency]) -> Vec<PackageDependency> + Send + Sync>;

/// Filters applied while building a graph. Every hook is optional; an unset
/// hook lets everything through.
#[derive(Clone, Default)]
pub struct BuildFilters {
    project: Option<ProjectPredicate>,
    framework: Option<FrameworkFilter>,
    dependency: Option<DependencyFilter>,
    package_dependency: Option<PackageDependencyFilter>,
}

impl BuildFilters {
    /// No filtering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only walk projects for which `predicate` returns `true`.
    #[must_use]
    pub fn with_project_predicate(
        mut self,
        predicate: impl Fn(&RestoreProject) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.project = Some(Arc::new(predicate));
        self
    }

    /// Replace each project's framework list with `filter`'s output.
    #[must_use]
    pub fn with_framework_filter(
        mut self,
        filter: impl Fn(&[TargetFramework]) -> Vec<TargetFramework> + Send + Sync + 'static,
    ) -> Self {
        self.framework = Some(Arc::new(filter));
        self
    }

    /// Replace each framework's direct dependencies with `filter`'s output.
    #[must_use]
    pub fn with_dependency_filter(
        mut self,
        filter: impl Fn(&[LibraryDependency]) -> Vec<LibraryDependency> + Send + Sync + 'static,
    ) -> Self {
        self.dependency = Some(Arc::new(filter));
        self
    }

    /// Replace each library's transitive dependencies with `filter`'s output.
    #[must_use]
    pub fn with_package_dependency_filter(
        mut self,
        filter: impl Fn(&[PackageDependency]) -> Vec<PackageDependency> + Send + Sync + 'static,
    ) -> Self {
        self.package_dependency = Some(Arc::new(filter));
        self
    }

    pub(super) fn accepts_project(&self, project: &RestoreProject) -> bool {
        self.project.as_ref().is_none_or(|p| p(project))
    }

    pub(super) fn frameworks(&self, frameworks: &[TargetFramework]) -> Vec<TargetFramework> {
        match &self.framework {
            Some(filter) => filter(frameworks),
            None => frameworks.to_vec(),
        }
    }

    pub(super) fn dependencies(&self, dependencies: &[LibraryDependency]) -> Vec<LibraryDependency> {
        match &self.dependency {
            Some(filter) => filter(dependencies),
            None => dependencies.to_vec(),
        }
    }

    pub(super) fn package_dependencies(
        &self,
        dependencies: &[PackageDependency],
    ) -> Vec<PackageDependency> {
        match &self.package_dependency {
            Some(filter) => filter(dependencies),
            None => dependencies.to_vec(),
        }
    }
}

impl fmt::Debug for BuildFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildFilters")
            .field("project", &self.project.is_some())
            .field("framework", &self.framework.is_some())
            .field("dependency", &self.dependency.is_some())
            .field("package_dependency", &self.package_dependency.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use strata_restore::ProjectStyle;

    fn project(name: &str) -> RestoreProject {
        RestoreProject {
            name: name.to_string(),
            path: PathBuf::from(format!("/src/{name}.csproj")),
            output_path: None,
            style: ProjectStyle::PackageReference,
            frameworks: vec![
                TargetFramework::new("net8.0", vec![LibraryDependency::package("Core.Util")]),
                TargetFramework::new("net48", vec![]),
            ],
        }
    }

    #[test]
    fn unset_filters_pass_everything() {
        let filters = BuildFilters::new();
        let project = project("App.Main");

        assert!(filters.accepts_project(&project));
        assert_eq!(filters.frameworks(&project.frameworks).len(), 2);
        assert_eq!(
            filters.dependencies(&project.frameworks[0].dependencies).len(),
            1
        );
        assert!(filters.package_dependencies(&[]).is_empty());
    }

    #[test]
    fn hooks_are_applied() {
        let filters = BuildFilters::new()
            .with_project_predicate(|p| !p.name.ends_with(".Tests"))
            .with_framework_filter(|fws| {
                fws.iter().filter(|f| f.name.starts_with("net8")).cloned().collect()
            })
            .with_package_dependency_filter(|deps| {
                deps.iter().filter(|d| !d.id.starts_with("System.")).cloned().collect()
            });

        assert!(filters.accepts_project(&project("App.Main")));
        assert!(!filters.accepts_project(&project("App.Main.Tests")));
        assert_eq!(
            filters.frameworks(&project("App.Main").frameworks)[0].name,
            "net8.0"
        );
        let kept = filters.package_dependencies(&[
            PackageDependency::new("System.Memory", "4.5.5"),
            PackageDependency::new("Core.Util", "1.0.0"),
        ]);
        assert_eq!(kept.len(), 1);
        assert!(format!("{filters:?}").contains("project: true"));
    }
}
