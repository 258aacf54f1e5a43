//! Collaborators that decide which components changed.
//!
//! Inspecting version-control history is outside this crate. The pipeline
//! only needs an ordered list of impacted identifiers, which it gets from an
//! [`ImpactedComponentsProvider`].

use crate::domain::{Architecture, ImpactAnalysisParameters};
use crate::error::{Error, Result};
use crate::events::EventSink;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Source of directly impacted component ids.
#[async_trait]
pub trait ImpactedComponentsProvider: Send + Sync {
    /// Impacted ids in the provider's order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if `cancel` fires, or any provider-specific error.
    async fn impacted_components(
        &self,
        architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>>;
}

/// Reads the forced-node list from the analysis filters.
///
/// Commit hashes and task ids are accepted but not resolved to components.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiltersTracker;

#[async_trait]
impl ImpactedComponentsProvider for FiltersTracker {
    async fn impacted_components(
        &self,
        _architecture: &Architecture,
        parameters: &ImpactAnalysisParameters,
        _events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let filters = &parameters.filters;
        let forced = filters.forced_nodes();
        debug!(
            forced = forced.len(),
            commits = filters.commit_hashes().len(),
            tasks = filters.task_ids().len(),
            "Collected impacted components from filters"
        );
        Ok(forced)
    }
}

/// Always reports the same ids.
#[derive(Debug, Clone, Default)]
pub struct StaticTracker {
    components: Vec<String>,
}

impl StaticTracker {
    /// Report `components` on every run.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ImpactedComponentsProvider for StaticTracker {
    async fn impacted_components(
        &self,
        _architecture: &Architecture,
        _parameters: &ImpactAnalysisParameters,
        _events: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(self.components.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArchitectureLayer, ImpactAnalysisFilters};

    fn architecture() -> Architecture {
        Architecture {
            name: "Product".to_string(),
            description: String::new(),
            layers: vec![ArchitectureLayer::new("App", "App")],
            analyzer: None,
        }
    }

    #[tokio::test]
    async fn filters_tracker_returns_forced_nodes_in_order() {
        let parameters = ImpactAnalysisParameters {
            filters: ImpactAnalysisFilters {
                forced_nodes: "Core.Util\nApp.Main\ncore.util".to_string(),
                ..ImpactAnalysisFilters::default()
            },
            ..ImpactAnalysisParameters::default()
        };

        let impacted = FiltersTracker
            .impacted_components(&architecture(), &parameters, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(impacted, vec!["Core.Util", "App.Main"]);
    }

    #[tokio::test]
    async fn static_tracker_keeps_order_and_duplicates() {
        let tracker = StaticTracker::new(["B", "A", "B"]);

        let impacted = tracker
            .impacted_components(
                &architecture(),
                &ImpactAnalysisParameters::default(),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(impacted, vec!["B", "A", "B"]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_tracker() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = FiltersTracker
            .impacted_components(
                &architecture(),
                &ImpactAnalysisParameters::default(),
                None,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }
}
