//! Resolved lock descriptions (`project.assets.json`).
//!
//! Only the `targets` section is read. Each target maps `"<name>/<version>"`
//! keys to the resolved library and its own dependencies:
//!
//! ```json
//! {
//!   "version": 3,
//!   "targets": {
//!     "net8.0": {
//!       "Serilog/3.1.1": { "type": "package", "dependencies": { "System.Memory": "4.5.5" } },
//!       "Core.Util/1.0.0": { "type": "project", "framework": "net8.0" }
//!     },
//!     "net8.0/linux-x64": { }
//!   }
//! }
//! ```
//!
//! Runtime-specific targets (`<tfm>/<rid>`) are kept but never returned by
//! [`LockFile::target_for`], which only answers runtime-agnostic lookups.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A dependency of a resolved library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    /// Package id.
    pub id: String,
    /// Version range as written by the restore.
    pub version_range: String,
}

impl PackageDependency {
    /// Create a dependency entry.
    pub fn new(id: impl Into<String>, version_range: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version_range: version_range.into(),
        }
    }
}

/// A library resolved for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFileLibrary {
    /// Library name.
    pub name: String,
    /// Resolved version.
    pub version: String,
    /// `package` or `project`.
    pub kind: String,
    /// The library's own dependencies.
    pub dependencies: Vec<PackageDependency>,
}

impl LockFileLibrary {
    /// Create a package library.
    pub fn package(
        name: impl Into<String>,
        version: impl Into<String>,
        dependencies: Vec<PackageDependency>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind: "package".to_string(),
            dependencies,
        }
    }
}

/// All libraries resolved for one framework (and optionally one runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFileTarget {
    /// Framework part of the target key.
    pub framework: String,
    /// Runtime identifier for runtime-specific targets.
    pub runtime: Option<String>,
    /// Resolved libraries.
    pub libraries: Vec<LockFileLibrary>,
}

impl LockFileTarget {
    /// Create a runtime-agnostic target.
    pub fn new(framework: impl Into<String>, libraries: Vec<LockFileLibrary>) -> Self {
        Self {
            framework: framework.into(),
            runtime: None,
            libraries,
        }
    }

    /// Find a library by name (case-insensitive).
    #[must_use]
    pub fn library(&self, name: &str) -> Option<&LockFileLibrary> {
        self.libraries
            .iter()
            .find(|lib| lib.name.eq_ignore_ascii_case(name))
    }
}

/// A parsed lock description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
    /// Format version, when present.
    pub version: Option<u32>,
    /// Targets in key order.
    pub targets: Vec<LockFileTarget>,
}

impl LockFile {
    /// Parse a lock description from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` for malformed JSON and `Error::InvalidFormat` for
    /// library keys that are not `<name>/<version>`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawLockFile = serde_json::from_str(json)?;

        let mut targets = Vec::with_capacity(raw.targets.len());
        for (key, libraries) in raw.targets {
            let (framework, runtime) = match key.split_once('/') {
                Some((fw, rid)) => (fw.to_string(), Some(rid.to_string())),
                None => (key.clone(), None),
            };

            let mut resolved = Vec::with_capacity(libraries.len());
            for (lib_key, lib) in libraries {
                let Some((name, version)) = lib_key.split_once('/') else {
                    return Err(Error::InvalidFormat(format!(
                        "library key '{lib_key}' in target '{key}' is not <name>/<version>"
                    )));
                };
                resolved.push(LockFileLibrary {
                    name: name.to_string(),
                    version: version.to_string(),
                    kind: lib.kind.unwrap_or_else(|| "package".to_string()),
                    dependencies: lib
                        .dependencies
                        .into_iter()
                        .map(|(id, range)| PackageDependency {
                            id,
                            version_range: range,
                        })
                        .collect(),
                });
            }

            targets.push(LockFileTarget {
                framework,
                runtime,
                libraries: resolved,
            });
        }

        Ok(Self {
            version: raw.version,
            targets,
        })
    }

    /// Load a lock description from disk.
    ///
    /// A missing file is not an error: the restore simply did not produce one,
    /// and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than "not found", otherwise
    /// see [`LockFile::from_json_str`].
    pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Lock file not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json_str(&content).map(Some)
    }

    /// Find the runtime-agnostic target for a framework.
    ///
    /// Framework names are compared case-insensitively. When no key matches
    /// and the file holds exactly one runtime-agnostic target, that target is
    /// returned: older restores key targets by the long framework name
    /// (`.NETCoreApp,Version=v8.0`) rather than the short alias.
    #[must_use]
    pub fn target_for(&self, framework: &str) -> Option<&LockFileTarget> {
        let mut agnostic = self.targets.iter().filter(|t| t.runtime.is_none());
        if let Some(exact) = agnostic
            .clone()
            .find(|t| t.framework.eq_ignore_ascii_case(framework))
        {
            return Some(exact);
        }

        match (agnostic.next(), agnostic.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawLockFile {
    version: Option<u32>,
    #[serde(default)]
    targets: BTreeMap<String, BTreeMap<String, RawTargetLibrary>>,
}

#[derive(Deserialize)]
struct RawTargetLibrary {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 3,
        "targets": {
            "net8.0": {
                "Serilog/3.1.1": {
                    "type": "package",
                    "dependencies": { "System.Memory": "4.5.5" }
                },
                "System.Memory/4.5.5": { "type": "package" },
                "Core.Util/1.0.0": { "type": "project", "framework": "net8.0" }
            },
            "net8.0/linux-x64": {
                "Serilog/3.1.1": { "type": "package" }
            }
        },
        "libraries": {}
    }"#;

    #[test]
    fn parses_targets_and_runtimes() {
        let lock = LockFile::from_json_str(SAMPLE).unwrap();

        assert_eq!(lock.version, Some(3));
        assert_eq!(lock.targets.len(), 2);
        let rid = lock
            .targets
            .iter()
            .find(|t| t.runtime.is_some())
            .unwrap();
        assert_eq!(rid.framework, "net8.0");
        assert_eq!(rid.runtime.as_deref(), Some("linux-x64"));
    }

    #[test]
    fn library_lookup_is_case_insensitive() {
        let lock = LockFile::from_json_str(SAMPLE).unwrap();
        let target = lock.target_for("NET8.0").unwrap();

        let serilog = target.library("serilog").unwrap();
        assert_eq!(serilog.version, "3.1.1");
        assert_eq!(
            serilog.dependencies,
            vec![PackageDependency::new("System.Memory", "4.5.5")]
        );
        assert_eq!(target.library("core.util").unwrap().kind, "project");
    }

    #[test]
    fn single_agnostic_target_answers_any_framework() {
        let lock = LockFile::from_json_str(SAMPLE).unwrap();

        let target = lock.target_for(".NETCoreApp,Version=v8.0").unwrap();
        assert!(target.runtime.is_none());
    }

    #[test]
    fn ambiguous_fallback_returns_none() {
        let lock = LockFile {
            version: None,
            targets: vec![
                LockFileTarget::new("net6.0", vec![]),
                LockFileTarget::new("net8.0", vec![]),
            ],
        };

        assert!(lock.target_for("net7.0").is_none());
        assert!(lock.target_for("net6.0").is_some());
    }

    #[test]
    fn bad_library_key_is_invalid_format() {
        let json = r#"{ "targets": { "net8.0": { "NoVersion": {} } } }"#;

        assert!(matches!(
            LockFile::from_json_str(json),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();

        let loaded = LockFile::load(dir.path().join("project.assets.json"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
