//! Exact bounded cycle search over a market graph snapshot.
//!
//! `best[k][c]` is the largest product of conversion factors over walks of exactly `k`
//! edges from the home currency to `c`. All factors are strictly positive, so for any
//! continuation a larger product at `(k, c)` dominates a smaller one and only the
//! maximal walk per cell is kept. Each cell carries a persistent back-pointer trail for
//! path reconstruction. A cycle may touch the home currency only at its two endpoints,
//! so the relaxation never leaves home after the first hop.
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};
use std::rc::Rc;
use std::sync::Arc;

use itertools::Itertools;
use log::debug;

use super::edge::{DirectedEdge, Edge};
use super::graph::{GraphSnapshot, MarketGraph};
use super::rational::Rational;
use super::types::Currency;
use crate::error::ArbError;

/// Outcome of one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Compounded ratio of the best cycle, or zero when nothing is profitable
    pub max_ratio: Rational,
    /// Distinct trades composing the best cycle, `None` when nothing is profitable
    pub trades_to_execute: Option<HashSet<DirectedEdge>>,
    /// The best cycle in execution order, home -> ... -> home. Empty when nothing is profitable.
    pub cycle: Vec<DirectedEdge>,
}

impl AnalysisResult {
    /// The "no opportunity" sentinel: ratio zero, no trades.
    #[must_use]
    pub fn no_opportunity() -> Self {
        Self {
            max_ratio: Rational::zero(),
            trades_to_execute: None,
            cycle: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.trades_to_execute.is_some()
    }

    fn from_cycle(max_ratio: Rational, cycle: Vec<DirectedEdge>) -> Self {
        Self {
            max_ratio,
            trades_to_execute: Some(cycle.iter().cloned().collect()),
            cycle,
        }
    }
}

impl Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_profitable() {
            return write!(f, "no opportunity");
        }
        write!(
            f,
            "ratio {} ({:.6}) via [{}]",
            self.max_ratio,
            self.max_ratio.to_f64_lossy(),
            self.cycle.iter().join(", ")
        )
    }
}

/// Bounded search for the maximum-ratio cycle through a home currency.
#[derive(Clone, Debug)]
pub struct CycleSearch {
    graph: Arc<MarketGraph>,
    home: Currency,
    max_path_length: usize,
}

impl CycleSearch {
    /// Creates a search over a shared graph.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::InvalidPathLength` if `max_path_length` is zero.
    pub fn new(
        graph: Arc<MarketGraph>,
        home: Currency,
        max_path_length: usize,
    ) -> Result<Self, ArbError> {
        if max_path_length == 0 {
            return Err(ArbError::InvalidPathLength);
        }
        Ok(Self {
            graph,
            home,
            max_path_length,
        })
    }

    #[must_use]
    pub const fn home(&self) -> &Currency {
        &self.home
    }

    #[must_use]
    pub const fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    #[must_use]
    pub const fn graph(&self) -> &Arc<MarketGraph> {
        &self.graph
    }

    /// Searches a fresh snapshot of the graph.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DivisionByZero` if an edge with a zero price bypassed validation.
    pub fn search_for_arbitrage(&self) -> Result<AnalysisResult, ArbError> {
        let snapshot = self.graph.snapshot();
        search_snapshot(&snapshot, &self.home, self.max_path_length)
    }
}

/// One relaxable edge with its precomputed conversion factor.
struct Leg {
    trade: DirectedEdge,
    factor: Rational,
}

/// Back-pointer chain shared between cells of consecutive hops.
struct Trail<'a> {
    leg: &'a Leg,
    previous: Option<Rc<Trail<'a>>>,
}

/// Best walk found for one (hop, currency) cell.
struct Cell<'a> {
    ratio: Rational,
    trail: Option<Rc<Trail<'a>>>,
}

/// Runs the search on an existing snapshot.
///
/// # Errors
///
/// Returns `ArbError::DivisionByZero` if an edge with a zero price bypassed validation.
pub fn search_snapshot(
    snapshot: &GraphSnapshot,
    home: &Currency,
    max_path_length: usize,
) -> Result<AnalysisResult, ArbError> {
    if snapshot.edges(home).is_none() {
        debug!("home currency {home} has no outgoing edges");
        return Ok(AnalysisResult::no_opportunity());
    }
    let adjacency = sorted_legs(snapshot)?;

    let mut previous: HashMap<&Currency, Cell> = HashMap::new();
    previous.insert(
        home,
        Cell {
            ratio: Rational::one(),
            trail: None,
        },
    );
    let mut best: Option<(usize, Cell)> = None;

    for hop in 1..=max_path_length {
        let mut next: HashMap<&Currency, Cell> = HashMap::new();
        for (source, legs) in &adjacency {
            if hop > 1 && *source == home {
                continue;
            }
            let Some(from) = previous.get(source) else {
                continue;
            };
            for leg in legs {
                let ratio = &from.ratio * &leg.factor;
                let candidate = || Cell {
                    ratio: ratio.clone(),
                    trail: Some(Rc::new(Trail {
                        leg,
                        previous: from.trail.clone(),
                    })),
                };
                match next.entry(leg.trade.destination()) {
                    Entry::Occupied(mut cell) => {
                        if ratio > cell.get().ratio {
                            cell.insert(candidate());
                        }
                    }
                    Entry::Vacant(cell) => {
                        cell.insert(candidate());
                    }
                }
            }
        }

        if let Some(closed) = next.remove(home) {
            if best.as_ref().map_or(true, |(_, cell)| closed.ratio > cell.ratio) {
                best = Some((hop, closed));
            }
        }
        if next.is_empty() {
            break;
        }
        previous = next;
    }

    let Some((hops, cell)) = best.filter(|(_, cell)| cell.ratio > Rational::one()) else {
        debug!("no profitable cycle through {home} within {max_path_length} hops");
        return Ok(AnalysisResult::no_opportunity());
    };

    let cycle = reconstruct(cell.trail.as_ref());
    debug!("best cycle through {home}: {hops} hops, ratio {}", cell.ratio);
    Ok(AnalysisResult::from_cycle(cell.ratio, cycle))
}

/// Flattens the snapshot into a deterministic order so ties resolve the same way every time.
fn sorted_legs(snapshot: &GraphSnapshot) -> Result<Vec<(&Currency, Vec<Leg>)>, ArbError> {
    snapshot
        .iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(source, edges)| {
            let legs = edges
                .iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(key, value)| {
                    Ok(Leg {
                        factor: value.conversion_factor()?,
                        trade: DirectedEdge::new(
                            source.clone(),
                            Edge {
                                key: key.clone(),
                                value: value.clone(),
                            },
                        ),
                    })
                })
                .collect::<Result<Vec<_>, ArbError>>()?;
            Ok((source, legs))
        })
        .collect()
}

fn reconstruct(mut trail: Option<&Rc<Trail<'_>>>) -> Vec<DirectedEdge> {
    let mut cycle = Vec::new();
    while let Some(step) = trail {
        cycle.push(step.leg.trade.clone());
        trail = step.previous.as_ref();
    }
    cycle.reverse();
    cycle
}
