/// Edge file records
pub mod types;

use std::path::Path;

use eyre::{Result, WrapErr};
use log::{debug, info};

use crate::arb::MarketGraph;
use crate::bootstrap::types::EdgeRecord;

/// Parses a JSON array of edge records.
///
/// # Errors
/// * If the input is not a JSON array of well-formed records
pub fn parse_edges(json: &str) -> Result<Vec<EdgeRecord>> {
    serde_json::from_str(json).wrap_err("malformed edge file")
}

/// Inserts every record into `graph`, replacing quotes that share a key.
///
/// Returns the number of records that overwrote an existing edge.
///
/// # Errors
/// * If a record is a self-loop or carries an invalid quote; records
///   before it stay applied
pub fn populate(graph: &MarketGraph, records: Vec<EdgeRecord>) -> Result<usize> {
    let mut replaced = 0;
    for (index, record) in records.into_iter().enumerate() {
        let (source, edge) = record.into_parts();
        debug!("Loading {source} -> {}", edge.key.destination);
        let updated = graph
            .add_or_update_edge(
                source,
                edge.key.destination,
                &edge.key.venue,
                edge.key.is_buy,
                edge.value.available_volume,
                edge.value.price,
                edge.value.fee,
            )
            .wrap_err_with(|| format!("edge record #{index} rejected"))?;
        if updated {
            replaced += 1;
        }
    }
    Ok(replaced)
}

/// Reads an edge file and builds a fresh graph from it.
///
/// # Errors
/// * If the file cannot be read
/// * If it is malformed or contains an invalid edge
pub async fn load_graph(path: impl AsRef<Path>) -> Result<MarketGraph> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    let records = parse_edges(&json)?;
    let total = records.len();

    let graph = MarketGraph::new();
    let replaced = populate(&graph, records)?;
    info!(
        "Loaded {} edges over {} currencies from {} ({replaced} duplicates of {total} records)",
        graph.edge_count(),
        graph.currencies().len(),
        path.display()
    );
    Ok(graph)
}
