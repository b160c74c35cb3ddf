/*!
 * # Cyclearb - Multi-hop Currency Arbitrage Detection
 *
 * Cyclearb models every known tradable pair across one or more venues as a
 * weighted directed graph and repeatedly searches it for the most profitable
 * conversion cycle through a home currency.
 *
 * ## Core Features
 *
 * - **Exact Arithmetic**: All rates are arbitrary-precision fractions, so long
 *   multiplicative chains never drift
 * - **Shared Market Graph**: Concurrent ingestion writes while the analyzer reads
 *   consistent snapshots
 * - **Bounded Cycle Search**: Bellman-Ford style relaxation in ratio space with a
 *   caller-supplied hop bound and full path reconstruction
 * - **Background Analysis**: A start/stop loop that delivers each result to a handler
 *
 * ## Module Structure
 *
 * - `arb`: Graph, arithmetic, search and analyzer
 * - `bootstrap`: Loading a graph from an edge file
 * - `config`: Configuration management for the system
 * - `error`: Error taxonomy
 * - `utils`: Utility functions and helpers
 */

/// Arbitrage detection core
pub mod arb;
/// Graph loading for the command line
pub mod bootstrap;
/// Configuration management for the system
pub mod config;
/// Error types
pub mod error;
/// Utility functions and helpers
pub mod utils;

pub use error::ArbError;
