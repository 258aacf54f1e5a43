//! Integration tests for loading restore descriptions from disk.

use rstest::rstest;
use strata_restore::{DependencyKind, Error, LockFile, ProjectStyle, RestoreGraph};
use tempfile::tempdir;

const GRAPH: &str = r#"{
    "format": 1,
    "projects": {
        "C:\\repo\\App\\App.Main.csproj": {
            "restore": {
                "projectPath": "C:\\repo\\App\\App.Main.csproj",
                "outputPath": "C:\\repo\\App\\obj\\",
                "projectStyle": "PackageReference",
                "frameworks": {
                    "net6.0": {
                        "projectReferences": { "C:\\repo\\Core\\Core.Util.csproj": {} }
                    },
                    "net8.0": {}
                }
            },
            "frameworks": {
                "net6.0": { "dependencies": { "Polly": "[8.0.0, )" } },
                "net8.0": { "dependencies": { "Polly": "[8.0.0, )" } }
            }
        },
        "C:\\repo\\Core\\Core.Util.csproj": {
            "restore": { "projectName": "Core.Util", "projectStyle": "PackageReference" },
            "frameworks": { "net6.0": {} }
        }
    }
}"#;

#[tokio::test]
async fn test_load_restore_graph_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dg.json");
    tokio::fs::write(&path, GRAPH).await.unwrap();

    let graph = RestoreGraph::load(&path).await.unwrap();

    let app = graph.project("App.Main").unwrap();
    assert_eq!(app.style, ProjectStyle::PackageReference);
    assert_eq!(app.frameworks.len(), 2);

    let net6 = app.frameworks.iter().find(|f| f.name == "net6.0").unwrap();
    let names: Vec<_> = net6.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Core.Util", "Polly"]);
    assert_eq!(net6.dependencies[0].kind, DependencyKind::Project);

    let net8 = app.frameworks.iter().find(|f| f.name == "net8.0").unwrap();
    assert_eq!(net8.dependencies.len(), 1);
}

#[tokio::test]
async fn test_load_missing_restore_graph_is_io_error() {
    let dir = tempdir().unwrap();

    let result = RestoreGraph::load(dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_load_lock_file_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("project.assets.json");
    tokio::fs::write(
        &path,
        r#"{ "version": 3, "targets": { "net6.0": { "Polly/8.0.0": { "type": "package", "dependencies": { "Polly.Core": "8.0.0" } }, "Polly.Core/8.0.0": { "type": "package" } } } }"#,
    )
    .await
    .unwrap();

    let lock = LockFile::load(&path).await.unwrap().unwrap();

    let target = lock.target_for("net6.0").unwrap();
    assert_eq!(target.libraries.len(), 2);
    assert_eq!(target.library("POLLY").unwrap().dependencies[0].id, "Polly.Core");
}

#[rstest]
#[case::truncated(r#"{ "targets": { "#)]
#[case::wrong_shape(r#"{ "targets": [] }"#)]
#[tokio::test]
async fn test_corrupt_lock_file_is_an_error(#[case] content: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("project.assets.json");
    tokio::fs::write(&path, content).await.unwrap();

    assert!(LockFile::load(&path).await.is_err());
}
