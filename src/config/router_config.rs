use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::*;
use crate::name::Name;

/// Complete configuration of one router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub network: Name,
    pub site: Name,
    pub router: Name,
    pub lsa_refresh_time: u64,
    pub router_dead_interval: u64,
    pub lsa_interest_lifetime: u64,
    pub adj_lsa_build_interval: u64,
    pub routing_calc_interval: u64,
    pub sync_fetch_delay_ms: u64,
    pub interest_retry_number: u32,
    pub hyperbolic: HyperbolicConfig,
    pub link_cost_policy: LinkCostPolicy,
    pub seq_dir: PathBuf,
    pub advertised_names: Vec<Name>,
    pub neighbors: Vec<NeighborConfig>,
    pub listen_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HyperbolicConfig {
    pub state: HyperbolicState,
    pub radius: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborConfig {
    pub name: Name,
    pub face_uri: String,
    pub link_cost: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            network: Name::new().append("ndn"),
            site: Name::new().append("site"),
            router: Name::new().append("router"),
            lsa_refresh_time: LSA_REFRESH_TIME_DEFAULT,
            router_dead_interval: 2 * LSA_REFRESH_TIME_DEFAULT,
            lsa_interest_lifetime: LSA_INTEREST_LIFETIME_DEFAULT,
            adj_lsa_build_interval: ADJ_LSA_BUILD_INTERVAL_MAX,
            routing_calc_interval: ROUTING_CALC_INTERVAL_MAX,
            sync_fetch_delay_ms: SYNC_FETCH_DELAY_DEFAULT_MS,
            interest_retry_number: INTEREST_RETRY_NUMBER_DEFAULT,
            hyperbolic: HyperbolicConfig::default(),
            link_cost_policy: LinkCostPolicy::AsGiven,
            seq_dir: PathBuf::from("."),
            advertised_names: vec![],
            neighbors: vec![],
            listen_addr: None,
        }
    }
}

impl RouterConfig {
    pub fn new(network: Name, site: Name, router: Name) -> Self {
        Self {
            network,
            site,
            router,
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: RouterConfig = serde_json::from_str(&content)?;
        config.apply_tunables()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks the fields that are fixed for the router's lifetime.
    pub fn validate(&self) -> Result<()> {
        if self.network.is_empty() || self.site.is_empty() || self.router.is_empty() {
            return Err(Error::Config(
                "network, site and router names must not be empty".to_string(),
            ));
        }
        check_range(
            "lsa_refresh_time",
            self.lsa_refresh_time,
            LSA_REFRESH_TIME_MIN,
            LSA_REFRESH_TIME_MAX,
        )?;
        if self.router_dead_interval <= self.lsa_refresh_time {
            return Err(Error::Config(
                "router_dead_interval must be larger than lsa_refresh_time".to_string(),
            ));
        }
        if self.hyperbolic.radius < 0.0 {
            return Err(Error::Config("hyperbolic radius must not be negative".to_string()));
        }
        Ok(())
    }

    /// Passes the runtime-adjustable intervals through [`ConfigMutator`], so a
    /// loaded file is held to the same ranges as a tuning step.
    fn apply_tunables(&mut self) -> Result<()> {
        self.set_lsa_interest_lifetime(self.lsa_interest_lifetime)?;
        self.set_routing_calc_interval(self.routing_calc_interval)?;
        self.set_adj_lsa_build_interval(self.adj_lsa_build_interval)?;
        self.set_sync_fetch_delay(self.sync_fetch_delay())?;
        Ok(())
    }

    /// `/network/site/router`, the identity this router advertises under.
    pub fn router_prefix(&self) -> Name {
        self.network.clone().append_name(&self.site).append_name(&self.router)
    }

    /// `/network/NLSR/LSA`
    pub fn lsa_prefix(&self) -> Name {
        self.network.clone().append("NLSR").append("LSA")
    }

    /// `/network/NLSR/LSA/site/router`, the name published on the sync channel.
    pub fn update_prefix(&self) -> Name {
        self.lsa_prefix().append_name(&self.site).append_name(&self.router)
    }

    pub fn lsa_refresh(&self) -> Duration {
        Duration::from_secs(self.lsa_refresh_time)
    }

    pub fn router_dead(&self) -> Duration {
        Duration::from_secs(self.router_dead_interval)
    }

    pub fn interest_lifetime(&self) -> Duration {
        Duration::from_secs(self.lsa_interest_lifetime)
    }

    pub fn adj_lsa_build(&self) -> Duration {
        Duration::from_secs(self.adj_lsa_build_interval)
    }

    pub fn routing_calc(&self) -> Duration {
        Duration::from_secs(self.routing_calc_interval)
    }

    pub fn sync_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.sync_fetch_delay_ms)
    }

    /// Overall deadline for retrieving one LSA.
    pub fn lsa_retrieval_deadline(&self) -> Duration {
        Duration::from_secs(LSA_REFRESH_TIME_MAX)
    }

    pub fn seq_file(&self) -> PathBuf {
        self.seq_dir.join("nlsrSeqNo.txt")
    }

    pub fn hyperbolic_state(&self) -> HyperbolicState {
        self.hyperbolic.state
    }
}

impl ConfigMutator for RouterConfig {
    fn lsa_interest_lifetime(&self) -> Duration {
        self.interest_lifetime()
    }

    fn set_lsa_interest_lifetime(&mut self, seconds: u64) -> Result<()> {
        check_range(
            "lsa_interest_lifetime",
            seconds,
            LSA_INTEREST_LIFETIME_MIN,
            LSA_INTEREST_LIFETIME_MAX,
        )?;
        self.lsa_interest_lifetime = seconds;
        Ok(())
    }

    fn set_routing_calc_interval(&mut self, seconds: u64) -> Result<()> {
        check_range("routing_calc_interval", seconds, 0, ROUTING_CALC_INTERVAL_MAX)?;
        self.routing_calc_interval = seconds;
        Ok(())
    }

    fn set_adj_lsa_build_interval(&mut self, seconds: u64) -> Result<()> {
        check_range("adj_lsa_build_interval", seconds, 0, ADJ_LSA_BUILD_INTERVAL_MAX)?;
        self.adj_lsa_build_interval = seconds;
        Ok(())
    }

    fn set_sync_fetch_delay(&mut self, delay: Duration) -> Result<()> {
        self.sync_fetch_delay_ms = u64::try_from(delay.as_millis()).map_err(|_| {
            Error::Config(format!("sync_fetch_delay of {:?} is too large", delay))
        })?;
        Ok(())
    }
}
