//! Environment configuration.
//!
//! Values are read from the process environment after loading an optional
//! `.env` file:
//! - `ARB_HOME_CURRENCY` - currency every cycle starts and ends at (default `BTC`)
//! - `ARB_MAX_PATH_LENGTH` - hop bound, must be positive (default `4`)
//! - `ARB_SEARCH_INTERVAL_MS` - timer period for `interval` mode (default `1000`)
//! - `ARB_TRIGGER` - `interval` or `on-change` (default `on-change`)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use eyre::{bail, eyre, Result};

use crate::arb::{AnalysisCadence, Currency};

const DEFAULT_HOME_CURRENCY: &str = "BTC";
const DEFAULT_MAX_PATH_LENGTH: usize = 4;
const DEFAULT_SEARCH_INTERVAL_MS: u64 = 1000;

/// How the analysis loop is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerMode {
    /// Fixed timer
    Interval,
    /// Every graph change
    OnChange,
}

impl FromStr for TriggerMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interval" => Ok(Self::Interval),
            "on-change" | "onchange" => Ok(Self::OnChange),
            other => bail!("unknown trigger mode {other:?}, expected interval or on-change"),
        }
    }
}

/// Analyzer configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Currency every cycle starts and ends at
    pub home_currency: Currency,
    /// Maximum number of hops per cycle
    pub max_path_length: usize,
    /// Timer period when `trigger` is `Interval`
    pub search_interval: Duration,
    /// Trigger mode for the analysis loop
    pub trigger: TriggerMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_currency: Currency::from(DEFAULT_HOME_CURRENCY),
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            search_interval: Duration::from_millis(DEFAULT_SEARCH_INTERVAL_MS),
            trigger: TriggerMode::OnChange,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the `ARB_*` variables.
    ///
    /// # Errors
    /// * If a variable is set to a malformed value
    /// * If `ARB_MAX_PATH_LENGTH` is zero
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    ///
    /// # Errors
    /// * If a variable is set to a malformed value
    /// * If the max path length is zero
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let home_currency = lookup("ARB_HOME_CURRENCY")
            .map(|code| Currency::new(code.trim()))
            .unwrap_or(defaults.home_currency);

        let max_path_length = parse_var(&lookup, "ARB_MAX_PATH_LENGTH")?
            .unwrap_or(defaults.max_path_length);
        if max_path_length == 0 {
            bail!("ARB_MAX_PATH_LENGTH must be positive");
        }

        let search_interval = parse_var::<u64>(&lookup, "ARB_SEARCH_INTERVAL_MS")?
            .map_or(defaults.search_interval, Duration::from_millis);

        let trigger = match lookup("ARB_TRIGGER") {
            Some(raw) => raw.parse().map_err(|e| eyre!("ARB_TRIGGER: {e}"))?,
            None => defaults.trigger,
        };

        Ok(Self {
            home_currency,
            max_path_length,
            search_interval,
            trigger,
        })
    }

    /// Cadence for the analysis loop.
    #[must_use]
    pub const fn cadence(&self) -> AnalysisCadence {
        match self.trigger {
            TriggerMode::Interval => AnalysisCadence::Interval(self.search_interval),
            TriggerMode::OnChange => AnalysisCadence::OnGraphChange,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| eyre!("{name} has invalid value {raw:?}: {e}"))
        })
        .transpose()
}
