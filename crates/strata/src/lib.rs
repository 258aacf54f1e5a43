//! Strata - layered dependency graphs and change impact analysis.
//!
//! Strata builds the dependency graph of a multi-layer software architecture
//! from package-restore output, styles it by architectural layer, and marks
//! every component transitively affected by a set of changed components.
//!
//! # Overview
//!
//! - [`builder`]: concurrent, deduplicated graph construction
//! - [`decorator`]: redundant-edge removal, layer styling, impact marking
//! - [`pipeline`]: acquire or reuse a graph, infer impact, decorate
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata::config::AnalysisConfig;
//! use strata::domain::{Architecture, ImpactAnalysisFilters};
//! use strata::events::AutoResponder;
//! use strata::registry::AnalyzerRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> strata::Result<()> {
//! let architecture = Architecture::load("architecture.json").await?;
//! let config = AnalysisConfig::default();
//! let analyzer = AnalyzerRegistry::with_defaults().for_architecture(&architecture, &config)?;
//!
//! let parameters = config.to_parameters(ImpactAnalysisFilters {
//!     forced_nodes: "Core.Util".to_string(),
//!     ..ImpactAnalysisFilters::default()
//! });
//! let context = config.context().with_responder(Arc::new(AutoResponder(true)));
//!
//! let result = analyzer
//!     .analyze(&architecture, &parameters, Some(&context), &CancellationToken::new())
//!     .await?;
//! println!("{}", result.report());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod cache;
pub mod config;
pub mod decorator;
pub mod descriptor;
pub mod domain;
pub mod error;
pub mod events;
pub mod graph;
pub mod pipeline;
pub mod registry;
pub mod restore;
pub mod tracker;

pub use error::{Error, Result};
