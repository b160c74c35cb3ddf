//! # Arbitrage Module
//!
//! This module contains the market graph, the exact rate arithmetic and
//! the bounded cycle search that finds the most profitable conversion
//! cycle through a home currency.

/// Background analysis loop and result delivery
pub mod analyzer;
/// Edge keys, quotes and trade legs
pub mod edge;
/// Shared market graph
pub mod graph;
/// Exact fractions
pub mod rational;
/// Bounded maximum-ratio cycle search
pub mod search;
/// Test helpers and utilities
#[cfg(test)]
mod test_helpers;
/// Common type definitions
pub mod types;

pub use analyzer::{AnalysisCadence, AnalysisHandler, ArbitrageSearch, ChannelHandler};
pub use edge::{DirectedEdge, Edge, EdgeKey, EdgeValue};
pub use graph::{EdgeMap, GraphSnapshot, MarketGraph};
pub use rational::Rational;
pub use search::{AnalysisResult, CycleSearch};
pub use types::Currency;
