use std::collections::HashSet;

use super::edge::{DirectedEdge, Edge};
use super::graph::MarketGraph;
use super::rational::Rational;
use super::types::Currency;

/// (source, destination, venue, price); buy side, volume 1, no fee
pub type EdgeArgs<'a> = (&'a str, &'a str, &'a str, Rational);

#[allow(clippy::unwrap_used)]
pub fn frac(numerator: i64, denominator: i64) -> Rational {
    Rational::new(numerator, denominator).unwrap()
}

pub fn cur(code: &str) -> Currency {
    Currency::from(code)
}

#[allow(clippy::unwrap_used)]
pub fn graph(edges: &[EdgeArgs]) -> MarketGraph {
    let graph = MarketGraph::new();
    for (source, destination, venue, price) in edges {
        graph
            .add_edge(
                cur(source),
                cur(destination),
                venue,
                true,
                Rational::one(),
                price.clone(),
                Rational::zero(),
            )
            .unwrap();
    }
    graph
}

pub fn leg(source: &str, destination: &str, venue: &str, price: Rational) -> DirectedEdge {
    DirectedEdge::new(
        cur(source),
        Edge::new(
            venue,
            cur(destination),
            true,
            Rational::one(),
            price,
            Rational::zero(),
        ),
    )
}

pub fn trades(edges: &[EdgeArgs]) -> HashSet<DirectedEdge> {
    edges
        .iter()
        .map(|(source, destination, venue, price)| leg(source, destination, venue, price.clone()))
        .collect()
}
