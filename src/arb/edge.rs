//! Value types stored in the market graph and returned by the cycle search.
//! Every equality here is value equality: independently built edges with the same
//! venue, currencies, side and exact rationals compare equal and hash the same.
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use super::rational::Rational;
use super::types::{Currency, VenueName};
use crate::error::ArbError;

/// Identifies one market side under an implicit source currency.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Venue the market trades on
    pub venue: VenueName,
    /// Currency received when the edge is traversed
    pub destination: Currency,
    /// Whether this is the buy side of the venue's book
    pub is_buy: bool,
}

impl EdgeKey {
    /// Creates a key.
    pub fn new(venue: impl Into<VenueName>, destination: Currency, is_buy: bool) -> Self {
        Self {
            venue: venue.into(),
            destination,
            is_buy,
        }
    }
}

/// Best known quote for a market side.
///
/// `price` is in source units per destination unit. `available_volume` is carried
/// for trade sizing and never enters the ratio computation. `fee` is the
/// proportional haircut on the amount received; it lives next to price and volume
/// so one update replaces all three at once.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeValue {
    /// Volume available at `price`
    pub available_volume: Rational,
    /// Source-currency units per destination-currency unit
    pub price: Rational,
    /// Fraction of the received amount lost to fees, in `[0, 1)`
    pub fee: Rational,
}

impl EdgeValue {
    /// Creates a quote without validating it.
    #[must_use]
    pub const fn new(available_volume: Rational, price: Rational, fee: Rational) -> Self {
        Self {
            available_volume,
            price,
            fee,
        }
    }

    /// Checks the quote can take part in a cycle computation.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::InvalidEdge` for a non-positive price, a negative volume,
    /// or a fee outside `[0, 1)`.
    pub fn validate(&self) -> Result<(), ArbError> {
        if !self.price.is_positive() {
            return Err(ArbError::invalid_edge(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        if self.available_volume.is_negative() {
            return Err(ArbError::invalid_edge(format!(
                "volume must not be negative, got {}",
                self.available_volume
            )));
        }
        if self.fee.is_negative() || self.fee >= Rational::one() {
            return Err(ArbError::invalid_edge(format!(
                "fee must be in [0, 1), got {}",
                self.fee
            )));
        }
        Ok(())
    }

    /// Destination units obtained per source unit: `(1 - fee) / price`.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DivisionByZero` if the price is zero.
    pub fn conversion_factor(&self) -> Result<Rational, ArbError> {
        (Rational::one() - &self.fee).checked_div(&self.price)
    }
}

/// A key together with its quote.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Edge {
    /// Market side
    pub key: EdgeKey,
    /// Quote on that side
    pub value: EdgeValue,
}

impl Edge {
    /// Creates an edge from its parts.
    pub fn new(
        venue: impl Into<VenueName>,
        destination: Currency,
        is_buy: bool,
        available_volume: Rational,
        price: Rational,
        fee: Rational,
    ) -> Self {
        Self {
            key: EdgeKey::new(venue, destination, is_buy),
            value: EdgeValue::new(available_volume, price, fee),
        }
    }

    /// See [`EdgeValue::conversion_factor`].
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DivisionByZero` if the price is zero.
    pub fn conversion_factor(&self) -> Result<Rational, ArbError> {
        self.value.conversion_factor()
    }
}

/// One executable trade leg: an edge plus the currency it departs from.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DirectedEdge {
    /// Currency spent on this leg
    pub source: Currency,
    /// Market side traded and its quote
    pub edge: Edge,
}

impl DirectedEdge {
    /// Pairs an edge with its source currency.
    #[must_use]
    pub const fn new(source: Currency, edge: Edge) -> Self {
        Self { source, edge }
    }

    /// Currency received on this leg.
    #[must_use]
    pub const fn destination(&self) -> &Currency {
        &self.edge.key.destination
    }
}

impl Display for DirectedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} on {} ({} @ {}, fee {})",
            self.source,
            self.edge.key.destination,
            self.edge.key.venue,
            if self.edge.key.is_buy { "buy" } else { "sell" },
            self.edge.value.price,
            self.edge.value.fee
        )
    }
}
