use serde::{Deserialize, Serialize};

use crate::arb::{Currency, Edge, Rational};

/// One quote as it appears in an edge file.
///
/// Rationals are strings, either `"n/d"` or a decimal such as `"0.001"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Currency given up
    pub source: Currency,
    /// Currency received
    pub destination: Currency,
    /// Venue the quote comes from
    pub venue: String,
    /// Side of the book
    #[serde(default = "default_is_buy")]
    pub is_buy: bool,
    /// Quantity that can be traded at `price`
    pub volume: Rational,
    /// Units of source per unit of destination
    pub price: Rational,
    /// Proportional fee in `[0, 1)`
    #[serde(default = "Rational::zero")]
    pub fee: Rational,
}

const fn default_is_buy() -> bool {
    true
}

impl EdgeRecord {
    /// Splits the record into its source and the edge leaving it.
    #[must_use]
    pub fn into_parts(self) -> (Currency, Edge) {
        let edge = Edge::new(
            self.venue,
            self.destination,
            self.is_buy,
            self.volume,
            self.price,
            self.fee,
        );
        (self.source, edge)
    }
}
