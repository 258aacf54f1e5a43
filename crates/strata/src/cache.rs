//! Graph cache files.
//!
//! A freshly built graph is written to the artifacts folder as
//! `<stem>_ArchitectureOnly_<token>.json`, where `<stem>` is the configured
//! graph file name without extension and `<token>` is a zero-padded UTC
//! nanosecond timestamp followed by a short hash. Tokens sort by time, so the
//! newest cache file is simply the greatest name. The hash keeps two runs that
//! share a folder from colliding on the same timestamp.
//!
//! Files are written to a `.tmp` sibling and renamed into place, so a reader
//! never sees a half-written cache.

use crate::error::{Error, Result};
use crate::graph::{ArchitectureGraph, GraphSnapshot};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Separates the stem from the token in cache file names.
pub const CACHE_MARKER: &str = "_ArchitectureOnly_";

/// Extension of cache files.
pub const CACHE_EXTENSION: &str = "json";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A time-ordered, collision-resistant token.
///
/// Twenty digits of nanoseconds since the epoch, an underscore, and eight hex
/// digits hashed from the timestamp, the process id and a per-process counter.
#[must_use]
pub fn unique_token() -> String {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(sequence.to_le_bytes());
    let digest = hasher.finalize();

    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("{nanos:020}_{suffix}")
}

/// Stem shared by every cache file of `graph_file_name`.
#[must_use]
pub fn cache_stem(graph_file_name: &str) -> String {
    Path::new(graph_file_name)
        .file_stem()
        .map_or_else(
            || graph_file_name.to_string(),
            |s| s.to_string_lossy().into_owned(),
        )
}

/// A new, unused cache file name for `graph_file_name`.
#[must_use]
pub fn new_cache_file_name(graph_file_name: &str) -> String {
    format!(
        "{}{CACHE_MARKER}{}.{CACHE_EXTENSION}",
        cache_stem(graph_file_name),
        unique_token()
    )
}

/// Find the newest cache file for `graph_file_name` in `dir`.
///
/// Returns `None` when the folder holds no matching file.
///
/// # Errors
///
/// Returns `Error::Io` if the folder cannot be listed.
pub async fn find_newest(dir: &Path, graph_file_name: &str) -> Result<Option<PathBuf>> {
    let prefix = format!("{}{CACHE_MARKER}", cache_stem(graph_file_name));
    let suffix = format!(".{CACHE_EXTENSION}");

    let mut newest: Option<String> = None;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with(&prefix) || !name.ends_with(&suffix) {
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if newest.as_ref().is_none_or(|current| name > *current) {
            newest = Some(name);
        }
    }

    Ok(newest.map(|name| dir.join(name)))
}

/// Read a cached graph.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read and `Error::Cache` if it is
/// not a graph snapshot.
pub async fn read_graph(path: &Path) -> Result<ArchitectureGraph> {
    let content = tokio::fs::read_to_string(path).await?;
    let snapshot: GraphSnapshot = serde_json::from_str(&content)
        .map_err(|e| Error::Cache(format!("'{}' is not a graph snapshot: {e}", path.display())))?;
    debug!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "Loaded cached graph"
    );
    Ok(ArchitectureGraph::from_snapshot(snapshot))
}

/// Write `graph` to `path` atomically.
///
/// # Errors
///
/// Returns `Error::Cache` if serialization fails and `Error::Io` if the file
/// cannot be written or renamed.
pub async fn write_graph(path: &Path, graph: &ArchitectureGraph) -> Result<()> {
    let json = serde_json::to_string_pretty(&graph.to_snapshot())
        .map_err(|e| Error::Cache(format!("cannot serialize graph: {e}")))?;

    let temp_path = make_temp_path(path);
    if let Err(e) = tokio::fs::write(&temp_path, json).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), "Wrote graph snapshot");
    Ok(())
}

/// Write `graph` to a new cache file in `dir` and return its path.
///
/// # Errors
///
/// As for [`write_graph`].
pub async fn write_new(dir: &Path, graph_file_name: &str, graph: &ArchitectureGraph) -> Result<PathBuf> {
    let path = dir.join(new_cache_file_name(graph_file_name));
    write_graph(&path, graph).await?;
    Ok(path)
}

fn make_temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
