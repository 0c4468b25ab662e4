pub mod router_config;

pub use router_config::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

pub const LSA_REFRESH_TIME_MIN: u64 = 240;
pub const LSA_REFRESH_TIME_MAX: u64 = 7200;
pub const LSA_REFRESH_TIME_DEFAULT: u64 = 1800;
pub const LSA_INTEREST_LIFETIME_MIN: u64 = 1;
pub const LSA_INTEREST_LIFETIME_MAX: u64 = 60;
pub const LSA_INTEREST_LIFETIME_DEFAULT: u64 = 4;
pub const ADJ_LSA_BUILD_INTERVAL_MAX: u64 = 5;
pub const ROUTING_CALC_INTERVAL_MAX: u64 = 15;
pub const SYNC_FETCH_DELAY_DEFAULT_MS: u64 = 5000;
pub const INTEREST_RETRY_NUMBER_DEFAULT: u32 = 3;

/// Which routing calculation drives the installed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HyperbolicState {
    /// Link-state routing only; coordinate LSAs are not synchronized.
    #[default]
    Off,
    /// Hyperbolic routing only; adjacency LSAs are not synchronized.
    On,
    /// Link-state routing installed, hyperbolic routing computed into the dry table.
    DryRun,
}

impl HyperbolicState {
    /// Coordinate LSAs are synchronized in `On` and `DryRun`.
    pub fn syncs_coordinates(self) -> bool {
        self != HyperbolicState::Off
    }

    /// Adjacency LSAs are synchronized in `Off` and `DryRun`.
    pub fn syncs_adjacencies(self) -> bool {
        self != HyperbolicState::On
    }
}

impl fmt::Display for HyperbolicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HyperbolicState::Off => "off",
            HyperbolicState::On => "on",
            HyperbolicState::DryRun => "dry-run",
        };
        f.write_str(s)
    }
}

/// How divergent costs advertised for the two directions of a link are reconciled
/// before running Dijkstra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LinkCostPolicy {
    /// Each direction keeps the cost its origin advertised.
    #[default]
    AsGiven,
    /// Both directions take the higher of the two advertised costs.
    Max,
    /// Both directions take the lower of the two advertised costs.
    Min,
}

/// Setters shared by the configuration loader and any runtime tuning policy.
///
/// Every setter range-checks its value and leaves the field unchanged on error.
pub trait ConfigMutator {
    fn lsa_interest_lifetime(&self) -> Duration;
    fn set_lsa_interest_lifetime(&mut self, seconds: u64) -> Result<()>;
    fn set_routing_calc_interval(&mut self, seconds: u64) -> Result<()>;
    fn set_adj_lsa_build_interval(&mut self, seconds: u64) -> Result<()>;
    fn set_sync_fetch_delay(&mut self, delay: Duration) -> Result<()>;
}

pub(crate) fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::Config(format!(
            "{} must be within {}-{}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}
