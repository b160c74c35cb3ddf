use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Type alias for a venue name, compared by content.
pub type VenueName = String;

/// An opaque currency code such as `BTC` or `USD`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency from its code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self(code)
    }
}
