//! One routing instance: owns every table and drives them from the event
//! scheduler.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::adjacency::{AdjacencyList, AdjacencyStatus};
use crate::algorithms::{Coordinate, RouterMap, calculate_hyperbolic_routes, calculate_link_state_routes};
use crate::config::{HyperbolicState, RouterConfig};
use crate::error::Result;
use crate::fetch::{FetchResponse, LsaFetcher, LsaValidator};
use crate::name::Name;
use crate::name_prefix_table::NamePrefixTable;
use crate::protocol::lsdb::{Lsdb, LsdbContext};
use crate::protocol::routing_table::RoutingTable;
use crate::protocol::sequencing::SequencingManager;
use crate::protocol::sync::{SyncChannel, SyncLogicHandler, SyncUpdate};
use crate::scheduler::{Event, EventScheduler};
use crate::tuning::{Observation, TuningPolicy};

/// Identifies one router instance in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Router {
    instance: InstanceId,
    conf: RouterConfig,
    scheduler: EventScheduler,
    lsdb: Lsdb,
    sync: SyncLogicHandler,
    routing_table: RoutingTable,
    npt: NamePrefixTable,
    adjacencies: AdjacencyList,
    fetcher: Box<dyn LsaFetcher>,
    validator: Box<dyn LsaValidator>,
    tuning: Option<(Box<dyn TuningPolicy>, Duration)>,
}

impl Router {
    /// A router whose scheduler clock reads `epoch` at elapsed zero. Sequence
    /// numbers are persisted under `conf.seq_dir`.
    pub fn new(
        conf: RouterConfig,
        instance: InstanceId,
        epoch: DateTime<Utc>,
        fetcher: Box<dyn LsaFetcher>,
        validator: Box<dyn LsaValidator>,
    ) -> Self {
        let sync = SyncLogicHandler::new(&conf, SequencingManager::new(conf.seq_file()));
        Self {
            instance,
            scheduler: EventScheduler::new(epoch),
            lsdb: Lsdb::new(conf.router_prefix()),
            sync,
            routing_table: RoutingTable::new(),
            npt: NamePrefixTable::new(),
            adjacencies: AdjacencyList::from_config(&conf.neighbors),
            fetcher,
            validator,
            tuning: None,
            conf,
        }
    }

    pub fn set_sync_channel(&mut self, channel: Box<dyn SyncChannel>) {
        self.sync.set_channel(channel);
    }

    /// Installs a policy stepped every `interval` once the router is initialized.
    pub fn set_tuning_policy(&mut self, policy: Box<dyn TuningPolicy>, interval: Duration) {
        self.tuning = Some((policy, interval));
    }

    /// Restores sequence numbers and originates this router's own LSAs.
    pub fn initialize(&mut self) -> Result<()> {
        let state = self.conf.hyperbolic_state();
        info!(
            "[{}] Starting router {} (hyperbolic routing {})",
            self.instance,
            self.conf.router_prefix(),
            state
        );
        self.sync.sequencing_mut().init_from_storage(state)?;
        self.sync.sequencing().write_log();

        let (lsdb, mut ctx) = self.parts();
        lsdb.build_and_install_own_name_lsa(&mut ctx)?;
        if state.syncs_coordinates() {
            lsdb.build_and_install_own_coordinate_lsa(&mut ctx)?;
        }
        lsdb.schedule_adj_lsa_build(&mut ctx);

        if let Some((_, interval)) = &self.tuning {
            self.scheduler.schedule(*interval, Event::TuningStep);
        }
        Ok(())
    }

    fn parts(&mut self) -> (&mut Lsdb, LsdbContext<'_>) {
        (
            &mut self.lsdb,
            LsdbContext {
                conf: &self.conf,
                scheduler: &mut self.scheduler,
                npt: &mut self.npt,
                sync: &mut self.sync,
                routing_table: &mut self.routing_table,
                adjacencies: &self.adjacencies,
                fetcher: self.fetcher.as_mut(),
                validator: self.validator.as_ref(),
            },
        )
    }

    // ---- time ----

    /// Runs every event due by `elapsed`, then moves the clock there.
    pub fn advance_to(&mut self, elapsed: Duration) {
        while let Some(event) = self.scheduler.pop_due(elapsed) {
            self.dispatch(event);
        }
        self.scheduler.advance_clock(elapsed);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        self.advance_to(self.scheduler.elapsed() + delta);
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    pub fn elapsed(&self) -> Duration {
        self.scheduler.elapsed()
    }

    fn dispatch(&mut self, event: Event) {
        debug!("[{}] Event {:?}", self.instance, event);
        let instance = self.instance;
        match event {
            Event::ExpireOrRefresh { key, seq_no } => {
                let (lsdb, mut ctx) = self.parts();
                if let Err(e) = lsdb.expire_or_refresh(&key, seq_no, &mut ctx) {
                    error!("[{}] Refreshing {} failed: {}", instance, key, e);
                }
            }
            Event::ExpressInterest {
                interest,
                retry,
                deadline,
            } => {
                let (lsdb, mut ctx) = self.parts();
                lsdb.express_interest(&interest, retry, deadline, &mut ctx);
            }
            Event::BuildAdjLsa => {
                let (lsdb, mut ctx) = self.parts();
                if let Err(e) = lsdb.build_adj_lsa(&mut ctx) {
                    error!("[{}] Building adjacency LSA failed: {}", instance, e);
                }
            }
            Event::CalculateRoutingTable => self.calculate_routing_table(),
            Event::TuningStep => self.tuning_step(),
        }
    }

    // ---- inputs ----

    /// Sequence vectors received from the sync channel.
    pub fn on_sync_updates(&mut self, updates: &[SyncUpdate]) {
        self.sync
            .on_update(updates, &self.conf, &self.lsdb, &mut self.scheduler);
    }

    /// Completion of a fetch issued through the [`LsaFetcher`].
    pub fn on_fetch_response(&mut self, response: FetchResponse) {
        let (lsdb, mut ctx) = self.parts();
        match response.result {
            Ok(content) => lsdb.after_fetch_lsa(&response.request.interest, &content, &mut ctx),
            Err(e) => lsdb.on_fetch_error(&response.request, &e, &mut ctx),
        }
    }

    /// Content answering an LSA interest from another router.
    pub fn process_interest(&self, interest: &Name) -> Option<Vec<u8>> {
        self.lsdb
            .process_interest(interest, self.conf.hyperbolic_state())
    }

    /// Liveness change of a neighbor reported by the hello protocol.
    pub fn set_adjacency_status(&mut self, neighbor: &Name, status: AdjacencyStatus) {
        if !self.adjacencies.set_status(neighbor, status) {
            return;
        }
        info!("[{}] Neighbor {} is now {:?}", self.instance, neighbor, status);
        let (lsdb, mut ctx) = self.parts();
        lsdb.schedule_adj_lsa_build(&mut ctx);
    }

    /// A hello to `neighbor` went unanswered. Once the retry limit is reached
    /// the neighbor is declared inactive.
    pub fn on_hello_timeout(&mut self, neighbor: &Name) {
        let limit = self.conf.interest_retry_number;
        let Some(adjacent) = self.adjacencies.find_mut(neighbor) else {
            warn!("[{}] Hello timeout for unknown neighbor {}", self.instance, neighbor);
            return;
        };
        adjacent.interest_timed_out += 1;
        if adjacent.interest_timed_out >= limit {
            self.set_adjacency_status(neighbor, AdjacencyStatus::Inactive);
        }
    }

    /// Starts advertising `name` from this router.
    pub fn advertise_name(&mut self, name: Name) -> Result<()> {
        if self.conf.advertised_names.contains(&name) {
            return Ok(());
        }
        info!("[{}] Advertising {}", self.instance, name);
        self.conf.advertised_names.push(name);
        let (lsdb, mut ctx) = self.parts();
        lsdb.build_and_install_own_name_lsa(&mut ctx)
    }

    pub fn withdraw_name(&mut self, name: &Name) -> Result<()> {
        let before = self.conf.advertised_names.len();
        self.conf.advertised_names.retain(|n| n != name);
        if self.conf.advertised_names.len() == before {
            return Ok(());
        }
        info!("[{}] Withdrawing {}", self.instance, name);
        let (lsdb, mut ctx) = self.parts();
        lsdb.build_and_install_own_name_lsa(&mut ctx)
    }

    // ---- routing ----

    pub fn schedule_routing_table_calculation(&mut self) {
        self.routing_table
            .schedule_calculation(&mut self.scheduler, self.conf.routing_calc());
    }

    /// Recomputes the routing table from the LSDB and pushes the result to the
    /// name prefix table. Without this router's own LSA both tables are
    /// cleared.
    pub fn calculate_routing_table(&mut self) {
        if !self.routing_table.begin_calculation() {
            debug!("[{}] Calculation in progress, rescheduling", self.instance);
            self.scheduler
                .schedule(self.conf.routing_calc(), Event::CalculateRoutingTable);
            return;
        }
        let state = self.conf.hyperbolic_state();
        let me = self.conf.router_prefix();
        let has_own_lsa = match state {
            HyperbolicState::On => self.lsdb.find_coordinate_lsa(&me).is_some(),
            HyperbolicState::Off | HyperbolicState::DryRun => self.lsdb.find_adj_lsa(&me).is_some(),
        };

        if !has_own_lsa {
            debug!("[{}] No own LSA, clearing routing table", self.instance);
            self.routing_table.clear();
            self.routing_table.clear_dry();
            self.npt.update_with_new_route(&self.routing_table);
        } else if self.lsdb.is_build_adj_lsa_scheduled() {
            debug!(
                "[{}] Adjacency LSA build is scheduled, deferring routing table calculation",
                self.instance
            );
            self.routing_table.defer_calculation();
        } else {
            info!("[{}] Calculating routing table", self.instance);
            self.routing_table.clear();
            self.routing_table.clear_dry();
            let coordinates = |name: &Name| {
                self.lsdb
                    .find_coordinate_lsa(name)
                    .map(|lsa| Coordinate::new(lsa.radius, lsa.angle))
            };
            match state {
                HyperbolicState::Off | HyperbolicState::DryRun => {
                    let map = RouterMap::from_adj_lsas(self.lsdb.adj_lsdb());
                    calculate_link_state_routes(
                        &map,
                        self.lsdb.adj_lsdb(),
                        &me,
                        &self.adjacencies,
                        self.conf.link_cost_policy,
                        &mut self.routing_table,
                    );
                    if state == HyperbolicState::DryRun {
                        calculate_hyperbolic_routes(
                            &map,
                            coordinates,
                            &me,
                            &self.adjacencies,
                            true,
                            &mut self.routing_table,
                        );
                    }
                }
                HyperbolicState::On => {
                    let map = RouterMap::from_coordinate_lsas(self.lsdb.coordinate_lsdb());
                    calculate_hyperbolic_routes(
                        &map,
                        coordinates,
                        &me,
                        &self.adjacencies,
                        false,
                        &mut self.routing_table,
                    );
                }
            }
            self.npt.update_with_new_route(&self.routing_table);
            self.lsdb.write_log();
            self.routing_table.write_log(state);
            self.npt.write_log();
        }
        self.routing_table.finish_calculation();
    }

    fn tuning_step(&mut self) {
        let totals = self.lsdb.fetch_stats().total();
        let observation = Observation {
            elapsed: self.scheduler.elapsed(),
            interests: totals.interests,
            data: totals.data,
            timeouts: totals.timeouts,
            lsdb_size: self.lsdb.len(),
            routing_table_size: self.routing_table.len(),
        };
        if let Some((policy, interval)) = &mut self.tuning {
            if let Err(e) = policy.step(&observation, &mut self.conf) {
                warn!("[{}] Tuning step rejected: {}", self.instance, e);
            }
            self.scheduler.schedule(*interval, Event::TuningStep);
        }
    }

    // ---- accessors ----

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn conf(&self) -> &RouterConfig {
        &self.conf
    }

    pub fn lsdb(&self) -> &Lsdb {
        &self.lsdb
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn name_prefix_table(&self) -> &NamePrefixTable {
        &self.npt
    }

    pub fn adjacencies(&self) -> &AdjacencyList {
        &self.adjacencies
    }

    pub fn sync(&self) -> &SyncLogicHandler {
        &self.sync
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::Adjacent;
    use crate::config::NeighborConfig;
    use crate::fetch::{AcceptAllValidator, QueueFetcher};
    use crate::lsa::{AdjLsa, CoordinateLsa, Lsa};
    use crate::protocol::sync::MemorySyncChannel;
    use crate::test_support::name;
    use crate::tuning::ThresholdPolicy;
    use tempfile::TempDir;

    struct Harness {
        router: Router,
        channel: MemorySyncChannel,
        fetcher: QueueFetcher,
        _dir: TempDir,
    }

    fn harness(state: HyperbolicState, neighbors: &[(&str, f64)]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut conf = RouterConfig::new(name("/ndn"), name("/site"), name("/a"));
        conf.seq_dir = dir.path().to_path_buf();
        conf.hyperbolic.state = state;
        conf.hyperbolic.radius = 1.0;
        conf.neighbors = neighbors
            .iter()
            .map(|(n, cost)| NeighborConfig {
                name: name(n),
                face_uri: format!("udp:/{}", n),
                link_cost: *cost,
            })
            .collect();
        let fetcher = QueueFetcher::new();
        let channel = MemorySyncChannel::new();
        let mut router = Router::new(
            conf,
            InstanceId::random(),
            Utc::now(),
            Box::new(fetcher.clone()),
            Box::new(AcceptAllValidator),
        );
        router.set_sync_channel(Box::new(channel.clone()));
        Harness {
            router,
            channel,
            fetcher,
            _dir: dir,
        }
    }

    fn install_foreign_adj(router: &mut Router, origin: &str, seq_no: u64, links: &[(&str, f64)]) {
        let adjacents: Vec<_> = links
            .iter()
            .map(|(n, c)| Adjacent::new(name(n), format!("udp:/{}", n), *c))
            .collect();
        let expiration = router.scheduler.after(Duration::from_secs(3600));
        let lsa = AdjLsa::new(name(origin), seq_no, expiration, &adjacents);
        let (lsdb, mut ctx) = router.parts();
        lsdb.install_adj_lsa(lsa, &mut ctx);
    }

    #[test]
    fn initialize_originates_and_publishes() {
        let mut h = harness(HyperbolicState::Off, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        let me = h.router.conf().router_prefix();
        assert!(h.router.lsdb().find_name_lsa(&me).is_some());
        assert_eq!(h.channel.take().len(), 1);

        h.router.advance_by(h.router.conf().adj_lsa_build());
        assert_eq!(h.router.lsdb().find_adj_lsa(&me).unwrap().num_active(), 1);
        let published = h.channel.take();
        assert_eq!(published.last().unwrap().vector().adjacency, 1);
    }

    #[test]
    fn link_state_routes_reach_name_prefix_table() {
        let mut h = harness(HyperbolicState::Off, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        h.router.advance_by(h.router.conf().adj_lsa_build());
        install_foreign_adj(&mut h.router, "/ndn/site/b", 1, &[("/ndn/site/a", 5.0), ("/ndn/site/c", 2.0)]);
        install_foreign_adj(&mut h.router, "/ndn/site/c", 1, &[("/ndn/site/b", 2.0)]);
        {
            let expiration = h.router.scheduler.after(Duration::from_secs(3600));
            let lsa = crate::lsa::NameLsa::new(name("/ndn/site/c"), 1, expiration, [name("/ndn/c/files")]);
            let (lsdb, mut ctx) = h.router.parts();
            lsdb.install_name_lsa(lsa, &mut ctx);
        }
        h.router.advance_by(h.router.conf().routing_calc());

        let to_c = h.router.routing_table().find_routing_table_entry(&name("/ndn/site/c")).unwrap();
        assert_eq!(to_c.next_hops.cost_for("udp://ndn/site/b"), Some(7.0));
        let files = h.router.name_prefix_table().get(&name("/ndn/c/files")).unwrap();
        assert_eq!(files.next_hops.cost_for("udp://ndn/site/b"), Some(7.0));
    }

    #[test]
    fn losing_last_neighbor_clears_routes() {
        let mut h = harness(HyperbolicState::Off, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        h.router.advance_by(h.router.conf().adj_lsa_build());
        install_foreign_adj(&mut h.router, "/ndn/site/b", 1, &[("/ndn/site/a", 5.0)]);
        h.router.advance_by(h.router.conf().routing_calc());
        assert_eq!(h.router.routing_table().len(), 1);

        let b = name("/ndn/site/b");
        for _ in 0..h.router.conf().interest_retry_number {
            h.router.on_hello_timeout(&b);
        }
        assert_eq!(h.router.adjacencies().num_active_neighbors(), 0);
        h.router.advance_by(h.router.conf().adj_lsa_build() + h.router.conf().routing_calc());
        let me = h.router.conf().router_prefix();
        assert!(h.router.lsdb().find_adj_lsa(&me).is_none());
        assert!(h.router.routing_table().is_empty());
    }

    #[test]
    fn dry_run_keeps_link_state_table() {
        let mut h = harness(HyperbolicState::DryRun, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        h.router.advance_by(h.router.conf().adj_lsa_build());
        install_foreign_adj(&mut h.router, "/ndn/site/b", 1, &[("/ndn/site/a", 5.0)]);
        {
            let expiration = h.router.scheduler.after(Duration::from_secs(3600));
            let lsa = CoordinateLsa::new(name("/ndn/site/b"), 1, expiration, 1.0, 0.5);
            let (lsdb, mut ctx) = h.router.parts();
            lsdb.install_coordinate_lsa(lsa, &mut ctx);
        }
        h.router.advance_by(h.router.conf().routing_calc());

        let b = name("/ndn/site/b");
        let rt = h.router.routing_table();
        assert_eq!(rt.find_routing_table_entry(&b).unwrap().next_hops.cost_for("udp://ndn/site/b"), Some(5.0));
        assert_eq!(rt.find_dry_entry(&b).unwrap().next_hops.cost_for("udp://ndn/site/b"), Some(0.0));
    }

    #[test]
    fn hyperbolic_mode_routes_from_coordinates() {
        let mut h = harness(HyperbolicState::On, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        let me = h.router.conf().router_prefix();
        assert!(h.router.lsdb().find_coordinate_lsa(&me).is_some());
        assert!(h.router.lsdb().find_adj_lsa(&me).is_none());
        {
            let expiration = h.router.scheduler.after(Duration::from_secs(3600));
            let lsa = CoordinateLsa::new(name("/ndn/site/b"), 1, expiration, 1.0, 0.5);
            let (lsdb, mut ctx) = h.router.parts();
            lsdb.install_coordinate_lsa(lsa, &mut ctx);
        }
        h.router.advance_by(h.router.conf().routing_calc());
        let b = name("/ndn/site/b");
        assert!(h.router.routing_table().find_routing_table_entry(&b).is_some());
    }

    #[test]
    fn fetched_lsa_is_served_back() {
        let mut h = harness(HyperbolicState::Off, &[]);
        h.router.initialize().unwrap();
        let update = SyncUpdate::new(
            name("/ndn/NLSR/LSA/site/b"),
            crate::protocol::sequencing::SeqVector::new(2, 0, 0).combined(),
        );
        h.router.on_sync_updates(&[update]);
        h.router.advance_by(h.router.conf().sync_fetch_delay());
        let requests = h.fetcher.drain();
        assert_eq!(requests.len(), 1);

        let expiration = h.router.scheduler.after(Duration::from_secs(3600));
        let lsa = crate::lsa::NameLsa::new(name("/ndn/site/b"), 2, expiration, [name("/ndn/b")]);
        h.router.on_fetch_response(FetchResponse {
            request: requests[0].clone(),
            result: Ok(lsa.encode()),
        });
        assert_eq!(h.router.process_interest(&requests[0].interest), Some(lsa.encode()));
    }

    #[test]
    fn tuning_policy_is_stepped_periodically() {
        let mut h = harness(HyperbolicState::Off, &[]);
        h.router
            .set_tuning_policy(Box::new(ThresholdPolicy::default()), Duration::from_secs(60));
        h.router.initialize().unwrap();
        h.router.advance_by(Duration::from_secs(60));
        let pending_steps = h
            .router
            .scheduler()
            .pending()
            .filter(|e| **e == Event::TuningStep)
            .count();
        assert_eq!(pending_steps, 1);
    }

    #[test]
    fn calculation_skipped_for_pending_build_runs_after_it() {
        let mut h = harness(HyperbolicState::Off, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        h.router.advance_by(h.router.conf().adj_lsa_build());
        install_foreign_adj(&mut h.router, "/ndn/site/b", 1, &[("/ndn/site/a", 5.0)]);
        h.router.advance_by(h.router.conf().routing_calc());
        let c = name("/ndn/site/c");
        assert!(h.router.routing_table().find_routing_table_entry(&c).is_none());

        // b gains a link to c; the calculation is due 15s later.
        install_foreign_adj(&mut h.router, "/ndn/site/b", 2, &[("/ndn/site/a", 5.0), ("/ndn/site/c", 2.0)]);
        h.router.advance_by(Duration::from_secs(12));
        let b = name("/ndn/site/b");
        h.router.set_adjacency_status(&b, AdjacencyStatus::Inactive);
        h.router.set_adjacency_status(&b, AdjacencyStatus::Active);
        assert!(h.router.lsdb().is_build_adj_lsa_scheduled());

        h.router.advance_by(Duration::from_secs(3));
        assert!(h.router.routing_table().is_calculation_deferred());
        assert!(h.router.routing_table().find_routing_table_entry(&c).is_none());

        h.router.advance_by(Duration::from_secs(2));
        assert!(!h.router.lsdb().is_build_adj_lsa_scheduled());
        assert!(h.router.routing_table().is_calculation_scheduled());

        h.router.advance_by(h.router.conf().routing_calc());
        let to_c = h.router.routing_table().find_routing_table_entry(&c).unwrap();
        assert_eq!(to_c.next_hops.cost_for("udp://ndn/site/b"), Some(7.0));
        assert!(!h.router.routing_table().is_calculation_deferred());
    }

    #[test]
    fn dry_run_recalculates_on_coordinate_update() {
        let mut h = harness(HyperbolicState::DryRun, &[("/ndn/site/b", 5.0)]);
        h.router.initialize().unwrap();
        h.router.advance_by(h.router.conf().adj_lsa_build());
        install_foreign_adj(&mut h.router, "/ndn/site/b", 1, &[("/ndn/site/a", 5.0), ("/ndn/site/c", 2.0)]);
        let install_coordinate = |router: &mut Router, origin: &str, seq_no: u64, radius: f64, angle: f64| {
            let expiration = router.scheduler.after(Duration::from_secs(3600));
            let lsa = CoordinateLsa::new(name(origin), seq_no, expiration, radius, angle);
            let (lsdb, mut ctx) = router.parts();
            lsdb.install_coordinate_lsa(lsa, &mut ctx);
        };
        install_coordinate(&mut h.router, "/ndn/site/b", 1, 1.0, 0.5);
        install_coordinate(&mut h.router, "/ndn/site/c", 1, 1.0, 0.6);
        h.router.advance_by(h.router.conf().routing_calc());

        let c = name("/ndn/site/c");
        let before = h.router.routing_table().find_dry_entry(&c).unwrap().next_hops.cost_for("udp://ndn/site/b");
        assert!(before.is_some());

        install_coordinate(&mut h.router, "/ndn/site/c", 2, 5.0, 3.0);
        assert!(h.router.routing_table().is_calculation_scheduled());
        h.router.advance_by(h.router.conf().routing_calc());
        let after = h.router.routing_table().find_dry_entry(&c).unwrap().next_hops.cost_for("udp://ndn/site/b");
        assert!(after.unwrap() > before.unwrap());
    }
}
