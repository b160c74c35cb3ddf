//! # Market graph
//!
//! Directed multigraph of every known conversion: source currency -> {edge key -> quote}.
//! The graph is shared between feed ingestion (writers) and the analyzer (reader).
//!
//! Each source's edge map sits behind an `Arc` and is copied on write, so a
//! [`GraphSnapshot`] costs one clone of the outer map under a short read lock and
//! stays consistent while writers keep going. Writers hold the write lock only for
//! the single edge operation, so a reader sees either the old quote or the new one,
//! never a mix.
//!
//! A currency without outgoing edges is absent from the graph; it is never stored
//! with an empty edge map.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use tokio::sync::watch;

use super::edge::{Edge, EdgeKey, EdgeValue};
use super::rational::Rational;
use super::types::Currency;
use crate::error::ArbError;

/// Outgoing edges of one source currency.
pub type EdgeMap = HashMap<EdgeKey, EdgeValue>;

/// Shared, interior-synchronized market graph.
#[derive(Debug)]
pub struct MarketGraph {
    adjacency: RwLock<HashMap<Currency, Arc<EdgeMap>>>,
    /// Bumped after every successful mutation
    version: watch::Sender<u64>,
}

impl Default for MarketGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            adjacency: RwLock::new(HashMap::new()),
            version,
        }
    }

    /// Unconditionally inserts an edge, overwriting any edge with the same key.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::InvalidEdge` if the quote is unusable or the edge is a self-loop.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge(
        &self,
        source: Currency,
        destination: Currency,
        venue: &str,
        is_buy: bool,
        volume: Rational,
        price: Rational,
        fee: Rational,
    ) -> Result<(), ArbError> {
        self.insert_edge(source, Edge::new(venue, destination, is_buy, volume, price, fee))
    }

    /// Inserts an already assembled edge under `source`, overwriting any edge with the same key.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::InvalidEdge` if the quote is unusable or the edge is a self-loop.
    pub fn insert_edge(&self, source: Currency, edge: Edge) -> Result<(), ArbError> {
        Self::check(&source, &edge)?;
        debug!("add edge {source} -> {:?} = {:?}", edge.key, edge.value);
        {
            let mut adjacency = self.adjacency.write();
            let edges = Arc::make_mut(adjacency.entry(source).or_default());
            edges.insert(edge.key, edge.value);
        }
        self.bump();
        Ok(())
    }

    /// Replaces volume, price and fee of an existing edge, or inserts it when absent.
    ///
    /// Returns `true` if an existing edge was updated.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::InvalidEdge` if the quote is unusable or the edge is a self-loop.
    #[allow(clippy::too_many_arguments)]
    pub fn add_or_update_edge(
        &self,
        source: Currency,
        destination: Currency,
        venue: &str,
        is_buy: bool,
        volume: Rational,
        price: Rational,
        fee: Rational,
    ) -> Result<bool, ArbError> {
        let edge = Edge::new(venue, destination, is_buy, volume, price, fee);
        Self::check(&source, &edge)?;
        let updated = {
            let mut adjacency = self.adjacency.write();
            let edges = Arc::make_mut(adjacency.entry(source.clone()).or_default());
            if let Some(existing) = edges.get_mut(&edge.key) {
                *existing = edge.value;
                true
            } else {
                edges.insert(edge.key, edge.value);
                false
            }
        };
        debug!(
            "{} edge {source} -> {venue}",
            if updated { "update" } else { "add" }
        );
        self.bump();
        Ok(updated)
    }

    /// Outgoing edges of `currency`, or `None` if it has none.
    ///
    /// The returned map is a snapshot; later mutations do not show up in it.
    #[must_use]
    pub fn get_edges(&self, currency: &Currency) -> Option<Arc<EdgeMap>> {
        self.adjacency.read().get(currency).cloned()
    }

    /// Removes one edge. Returns whether anything was removed.
    ///
    /// If this was the source's last edge the source disappears from the graph.
    pub fn remove_edge(
        &self,
        source: &Currency,
        destination: &Currency,
        venue: &str,
        is_buy: bool,
    ) -> bool {
        let key = EdgeKey::new(venue, destination.clone(), is_buy);
        let removed = {
            let mut adjacency = self.adjacency.write();
            let Some(edges) = adjacency.get_mut(source) else {
                return false;
            };
            if !edges.contains_key(&key) {
                return false;
            }
            let edges = Arc::make_mut(edges);
            edges.remove(&key);
            if edges.is_empty() {
                adjacency.remove(source);
            }
            true
        };
        debug!("remove edge {source} -> {destination} on {venue}");
        self.bump();
        removed
    }

    /// Removes every edge quoted by `venue`. Returns how many edges were removed.
    pub fn remove_venue(&self, venue: &str) -> usize {
        let mut removed = 0;
        {
            let mut adjacency = self.adjacency.write();
            adjacency.retain(|_, edges| {
                let count = edges.keys().filter(|key| key.venue == venue).count();
                if count > 0 {
                    Arc::make_mut(edges).retain(|key, _| key.venue != venue);
                    removed += count;
                }
                !edges.is_empty()
            });
        }
        if removed > 0 {
            debug!("removed {removed} edges of venue {venue}");
            self.bump();
        }
        removed
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.read().values().map(|edges| edges.len()).sum()
    }

    /// Currencies that have at least one outgoing edge.
    #[must_use]
    pub fn currencies(&self) -> Vec<Currency> {
        self.adjacency.read().keys().cloned().collect()
    }

    /// Consistent view of the whole graph as of now.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            adjacency: self.adjacency.read().clone(),
        }
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Receiver that observes every version bump.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn check(source: &Currency, edge: &Edge) -> Result<(), ArbError> {
        if *source == edge.key.destination {
            return Err(ArbError::invalid_edge(format!(
                "source and destination are both {source}"
            )));
        }
        edge.value.validate()
    }

    fn bump(&self) {
        self.version.send_modify(|version| *version += 1);
    }
}

/// Immutable copy of the graph taken once per search.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    adjacency: HashMap<Currency, Arc<EdgeMap>>,
}

impl GraphSnapshot {
    /// Outgoing edges of `currency`, or `None` if it has none.
    #[must_use]
    pub fn edges(&self, currency: &Currency) -> Option<&EdgeMap> {
        self.adjacency.get(currency).map(AsRef::as_ref)
    }

    /// Iterates over every source currency and its edges.
    pub fn iter(&self) -> impl Iterator<Item = (&Currency, &EdgeMap)> {
        self.adjacency
            .iter()
            .map(|(currency, edges)| (currency, edges.as_ref()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use super::*;
    use crate::arb::test_helpers::{cur, frac};

    fn quote(volume: i64, price: i64) -> EdgeValue {
        EdgeValue::new(Rational::from(volume), Rational::from(price), Rational::zero())
    }

    fn upsert(graph: &MarketGraph, source: &str, dest: &str, venue: &str, buy: bool, v: i64, p: i64) -> bool {
        graph
            .add_or_update_edge(
                cur(source),
                cur(dest),
                venue,
                buy,
                Rational::from(v),
                Rational::from(p),
                Rational::zero(),
            )
            .unwrap()
    }

    #[test]
    fn test_add_or_update_and_remove_edge() {
        let graph = MarketGraph::new();
        assert!(!upsert(&graph, "USD", "BTC", "poloniex", true, 2, 1500));
        assert!(!upsert(&graph, "USD", "LTC", "bitmex", true, 4, 750));
        assert!(!upsert(&graph, "DGC", "USD", "bitmex", false, 4, 750));

        assert!(graph.get_edges(&cur("BTC")).is_none());
        assert!(graph.get_edges(&cur("LTC")).is_none());

        let edges = graph.get_edges(&cur("USD")).unwrap();
        assert_eq!(edges.len(), 2);
        let k1 = EdgeKey::new("poloniex", cur("BTC"), true);
        let k2 = EdgeKey::new("bitmex", cur("LTC"), true);
        assert_eq!(edges.get(&k1), Some(&quote(2, 1500)));
        assert_eq!(edges.get(&k2), Some(&quote(4, 750)));

        let k3 = EdgeKey::new("bitmex", cur("USD"), false);
        let edges = graph.get_edges(&cur("DGC")).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges.get(&k3), Some(&quote(4, 750)));

        // Same key, new quote: exactly one edge with the latest value
        assert!(upsert(&graph, "DGC", "USD", "bitmex", false, 24, 850));
        let edges = graph.get_edges(&cur("DGC")).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges.get(&k3), Some(&quote(24, 850)));

        assert!(graph.remove_edge(&cur("DGC"), &cur("USD"), "bitmex", false));
        assert!(graph.get_edges(&cur("DGC")).is_none());
        assert!(!graph.remove_edge(&cur("DGC"), &cur("USD"), "bitmex", false));

        assert!(graph.remove_edge(&cur("USD"), &cur("LTC"), "bitmex", true));
        let edges = graph.get_edges(&cur("USD")).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges.get(&k1), Some(&quote(2, 1500)));
    }

    #[test]
    fn test_add_edge_overwrites() {
        let graph = MarketGraph::new();
        for price in [10, 11] {
            graph
                .add_edge(
                    cur("USD"),
                    cur("DGC"),
                    "poloniex",
                    true,
                    Rational::one(),
                    Rational::from(price),
                    Rational::zero(),
                )
                .unwrap();
        }
        let edges = graph.get_edges(&cur("USD")).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            edges.values().next().unwrap().price,
            Rational::from(11)
        );
    }

    #[test]
    fn test_remove_missing_edge() {
        let graph = MarketGraph::new();
        assert!(!graph.remove_edge(&cur("USD"), &cur("BTC"), "gdax", true));
        upsert(&graph, "USD", "BTC", "gdax", true, 1, 1000);
        assert!(!graph.remove_edge(&cur("USD"), &cur("BTC"), "gdax", false));
        assert!(!graph.remove_edge(&cur("USD"), &cur("ETH"), "gdax", true));
        assert!(!graph.remove_edge(&cur("USD"), &cur("BTC"), "kraken", true));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_rejects_invalid_edges() {
        let graph = MarketGraph::new();
        let zero_price = graph.add_edge(
            cur("USD"),
            cur("BTC"),
            "gdax",
            true,
            Rational::one(),
            Rational::zero(),
            Rational::zero(),
        );
        assert!(matches!(zero_price, Err(ArbError::InvalidEdge { .. })));

        let self_loop = graph.add_or_update_edge(
            cur("USD"),
            cur("USD"),
            "gdax",
            true,
            Rational::one(),
            Rational::one(),
            Rational::zero(),
        );
        assert!(matches!(self_loop, Err(ArbError::InvalidEdge { .. })));

        let full_fee = graph.add_edge(
            cur("USD"),
            cur("BTC"),
            "gdax",
            true,
            Rational::one(),
            Rational::one(),
            Rational::one(),
        );
        assert!(matches!(full_fee, Err(ArbError::InvalidEdge { .. })));

        assert!(graph.get_edges(&cur("USD")).is_none());
        assert_eq!(graph.version(), 0);
    }

    #[test]
    fn test_remove_venue() {
        let graph = MarketGraph::new();
        upsert(&graph, "USD", "BTC", "gdax", true, 1, 1000);
        upsert(&graph, "USD", "BTC", "kraken", true, 1, 1001);
        upsert(&graph, "BTC", "USD", "gdax", false, 1, 1);
        upsert(&graph, "ETH", "BTC", "gdax", true, 1, 20);

        assert_eq!(graph.remove_venue("gdax"), 3);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.get_edges(&cur("BTC")).is_none());
        assert!(graph.get_edges(&cur("ETH")).is_none());
        assert_eq!(graph.currencies(), vec![cur("USD")]);
        assert_eq!(graph.remove_venue("gdax"), 0);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let graph = MarketGraph::new();
        upsert(&graph, "USD", "BTC", "gdax", true, 1, 1000);
        let snapshot = graph.snapshot();
        let before = graph.get_edges(&cur("USD")).unwrap();

        upsert(&graph, "USD", "BTC", "gdax", true, 5, 999);
        upsert(&graph, "USD", "ETH", "gdax", true, 1, 20);
        graph.remove_edge(&cur("USD"), &cur("BTC"), "gdax", true);

        let edges = snapshot.edges(&cur("USD")).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(
            edges.get(&EdgeKey::new("gdax", cur("BTC"), true)),
            Some(&quote(1, 1000))
        );
        assert_eq!(before.len(), 1);
        assert!(snapshot.edges(&cur("ETH")).is_none());

        assert_eq!(graph.remove_venue("gdax"), 1);
        assert!(graph.snapshot().is_empty());
        assert!(!snapshot.is_empty());
        assert!(MarketGraph::new().snapshot().is_empty());
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let graph = MarketGraph::new();
        let mut receiver = graph.subscribe();
        assert_eq!(graph.version(), 0);

        upsert(&graph, "USD", "BTC", "gdax", true, 1, 1000);
        upsert(&graph, "USD", "BTC", "gdax", true, 2, 1000);
        assert_eq!(graph.version(), 2);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), 2);

        // No-op removal does not bump
        graph.remove_edge(&cur("USD"), &cur("ETH"), "gdax", true);
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn test_concurrent_updates_are_atomic() {
        let graph = Arc::new(MarketGraph::new());
        let key = EdgeKey::new("gdax", cur("BTC"), true);

        // Volume always equals price, so a torn read would show a mismatch.
        let writer = {
            let graph = Arc::clone(&graph);
            thread::spawn(move || {
                for i in 1..=2_000 {
                    graph
                        .add_or_update_edge(
                            cur("USD"),
                            cur("BTC"),
                            "gdax",
                            true,
                            Rational::from(i),
                            Rational::from(i),
                            frac(1, 1000),
                        )
                        .unwrap();
                }
            })
        };

        for _ in 0..2_000 {
            let snapshot = graph.snapshot();
            if let Some(value) = snapshot.edges(&cur("USD")).and_then(|edges| edges.get(&key)) {
                assert_eq!(value.available_volume, value.price);
            }
        }
        writer.join().unwrap();
        assert_eq!(graph.version(), 2_000);
    }
}
