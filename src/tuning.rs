//! Runtime interval tuning.
//!
//! A [`TuningPolicy`] is stepped periodically with what the router observed
//! since it started and may adjust intervals, but only through
//! [`ConfigMutator`].

use log::{debug, info};
use serde::Serialize;
use std::time::Duration;

use crate::config::{ConfigMutator, LSA_INTEREST_LIFETIME_MAX, LSA_INTEREST_LIFETIME_MIN};
use crate::error::Result;

/// Cumulative counters handed to a tuning policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Observation {
    pub elapsed: Duration,
    pub interests: u64,
    pub data: u64,
    pub timeouts: u64,
    pub lsdb_size: usize,
    pub routing_table_size: usize,
}

pub trait TuningPolicy: Send {
    fn step(&mut self, observation: &Observation, config: &mut dyn ConfigMutator) -> Result<()>;
}

/// Lengthens the LSA interest lifetime while the share of timed-out interests
/// since the last step is above `target`, and shortens it when the share is
/// below half of it.
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    target: f64,
    step_secs: u64,
    last: Option<Observation>,
}

impl ThresholdPolicy {
    pub fn new(target: f64, step_secs: u64) -> Self {
        Self {
            target,
            step_secs: step_secs.max(1),
            last: None,
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(0.2, 1)
    }
}

impl TuningPolicy for ThresholdPolicy {
    fn step(&mut self, observation: &Observation, config: &mut dyn ConfigMutator) -> Result<()> {
        let previous = self.last.replace(*observation).unwrap_or_default();
        let interests = observation.interests.saturating_sub(previous.interests);
        if interests == 0 {
            return Ok(());
        }
        let timeouts = observation.timeouts.saturating_sub(previous.timeouts);
        let ratio = timeouts as f64 / interests as f64;
        let current = config.lsa_interest_lifetime().as_secs();

        let proposed = if ratio > self.target {
            (current + self.step_secs).min(LSA_INTEREST_LIFETIME_MAX)
        } else if ratio < self.target / 2.0 {
            current.saturating_sub(self.step_secs).max(LSA_INTEREST_LIFETIME_MIN)
        } else {
            current
        };
        debug!(
            "Tuning: {} timeouts / {} interests, lifetime {}s -> {}s",
            timeouts, interests, current, proposed
        );
        if proposed != current {
            info!("Changing LSA interest lifetime from {}s to {}s", current, proposed);
            config.set_lsa_interest_lifetime(proposed)?;
        }
        Ok(())
    }
}
