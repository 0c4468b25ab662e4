//! The link-state database.
//!
//! Holds at most one LSA per `(origin, type)`. Every stored LSA owns exactly one
//! pending [`Event::ExpireOrRefresh`] timer tagged with the sequence number it
//! was scheduled for, so a timer that outlived its LSA version is a no-op.
//! Installing a newer version cancels the old timer.

use log::{debug, error, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::routing_table::RoutingTable;
use super::sync::SyncLogicHandler;
use crate::adjacency::AdjacencyList;
use crate::config::{HyperbolicState, RouterConfig};
use crate::error::Result;
use crate::fetch::{FetchErrorKind, FetchError, FetchRequest, LsaFetcher, LsaValidator};
use crate::lsa::{AdjLsa, CoordinateLsa, Lsa, LsaKey, LsaName, LsaType, NameLsa};
use crate::name::Name;
use crate::name_prefix_table::NamePrefixTable;
use crate::scheduler::{Event, EventScheduler, TaskHandle};

/// Extra lifetime granted to every LSA beyond its advertised expiration.
pub const GRACE_PERIOD: Duration = Duration::from_secs(10);

/// The collaborators an LSDB operation may touch, borrowed from the router for
/// the duration of one callback.
pub struct LsdbContext<'a> {
    pub conf: &'a RouterConfig,
    pub scheduler: &'a mut EventScheduler,
    pub npt: &'a mut NamePrefixTable,
    pub sync: &'a mut SyncLogicHandler,
    pub routing_table: &'a mut RoutingTable,
    pub adjacencies: &'a AdjacencyList,
    pub fetcher: &'a mut dyn LsaFetcher,
    pub validator: &'a dyn LsaValidator,
}

impl LsdbContext<'_> {
    fn schedule_routing_calculation(&mut self) {
        self.routing_table
            .schedule_calculation(self.scheduler, self.conf.routing_calc());
    }
}

/// Retrieval counters for one LSA type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchCounters {
    pub interests: u64,
    pub data: u64,
    pub timeouts: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    counters: [FetchCounters; 3],
}

impl FetchStats {
    pub fn get(&self, lsa_type: LsaType) -> FetchCounters {
        self.counters[lsa_type as usize]
    }

    fn get_mut(&mut self, lsa_type: LsaType) -> &mut FetchCounters {
        &mut self.counters[lsa_type as usize]
    }

    pub fn total(&self) -> FetchCounters {
        self.counters
            .iter()
            .fold(FetchCounters::default(), |acc, c| FetchCounters {
                interests: acc.interests + c.interests,
                data: acc.data + c.data,
                timeouts: acc.timeouts + c.timeouts,
            })
    }
}

#[derive(Debug)]
struct Stored<L> {
    lsa: L,
    expiring: TaskHandle,
}

#[derive(Debug)]
pub struct Lsdb {
    this_router: Name,
    name_lsdb: BTreeMap<Name, Stored<NameLsa>>,
    adj_lsdb: BTreeMap<Name, Stored<AdjLsa>>,
    cor_lsdb: BTreeMap<Name, Stored<CoordinateLsa>>,
    /// Highest sequence number requested per LSA name (interest without seq).
    highest_seq_no: HashMap<Name, u64>,
    adj_build_count: u64,
    is_build_adj_lsa_scheduled: bool,
    stats: FetchStats,
}

impl Lsdb {
    pub fn new(this_router: Name) -> Self {
        Self {
            this_router,
            name_lsdb: BTreeMap::new(),
            adj_lsdb: BTreeMap::new(),
            cor_lsdb: BTreeMap::new(),
            highest_seq_no: HashMap::new(),
            adj_build_count: 0,
            is_build_adj_lsa_scheduled: false,
            stats: FetchStats::default(),
        }
    }

    pub fn this_router(&self) -> &Name {
        &self.this_router
    }

    // ---- lookup ----

    pub fn find_name_lsa(&self, origin: &Name) -> Option<&NameLsa> {
        self.name_lsdb.get(origin).map(|s| &s.lsa)
    }

    pub fn find_adj_lsa(&self, origin: &Name) -> Option<&AdjLsa> {
        self.adj_lsdb.get(origin).map(|s| &s.lsa)
    }

    pub fn find_coordinate_lsa(&self, origin: &Name) -> Option<&CoordinateLsa> {
        self.cor_lsdb.get(origin).map(|s| &s.lsa)
    }

    pub fn name_lsdb(&self) -> impl Iterator<Item = &NameLsa> {
        self.name_lsdb.values().map(|s| &s.lsa)
    }

    pub fn adj_lsdb(&self) -> impl Iterator<Item = &AdjLsa> {
        self.adj_lsdb.values().map(|s| &s.lsa)
    }

    pub fn coordinate_lsdb(&self) -> impl Iterator<Item = &CoordinateLsa> {
        self.cor_lsdb.values().map(|s| &s.lsa)
    }

    fn stored_seq_no(&self, origin: &Name, lsa_type: LsaType) -> Option<u64> {
        match lsa_type {
            LsaType::Name => self.find_name_lsa(origin).map(Lsa::seq_no),
            LsaType::Adjacency => self.find_adj_lsa(origin).map(Lsa::seq_no),
            LsaType::Coordinate => self.find_coordinate_lsa(origin).map(Lsa::seq_no),
        }
    }

    /// True if nothing is stored for `(origin, lsa_type)` or the stored
    /// sequence number is lower than `seq_no`.
    pub fn is_lsa_new(&self, origin: &Name, lsa_type: LsaType, seq_no: u64) -> bool {
        self.stored_seq_no(origin, lsa_type)
            .is_none_or(|stored| stored < seq_no)
    }

    pub fn is_name_lsa_new(&self, origin: &Name, seq_no: u64) -> bool {
        self.is_lsa_new(origin, LsaType::Name, seq_no)
    }

    pub fn is_adj_lsa_new(&self, origin: &Name, seq_no: u64) -> bool {
        self.is_lsa_new(origin, LsaType::Adjacency, seq_no)
    }

    pub fn is_coordinate_lsa_new(&self, origin: &Name, seq_no: u64) -> bool {
        self.is_lsa_new(origin, LsaType::Coordinate, seq_no)
    }

    /// Number of stored LSAs of all types.
    pub fn len(&self) -> usize {
        self.name_lsdb.len() + self.adj_lsdb.len() + self.cor_lsdb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn does_lsa_exist(&self, key: &LsaKey) -> bool {
        self.stored_seq_no(&key.origin, key.lsa_type).is_some()
    }

    /// Timer handle of a stored LSA.
    pub fn expiration_timer(&self, key: &LsaKey) -> Option<TaskHandle> {
        match key.lsa_type {
            LsaType::Name => self.name_lsdb.get(&key.origin).map(|s| s.expiring),
            LsaType::Adjacency => self.adj_lsdb.get(&key.origin).map(|s| s.expiring),
            LsaType::Coordinate => self.cor_lsdb.get(&key.origin).map(|s| s.expiring),
        }
    }

    pub fn highest_requested_seq_no(&self, lsa_name: &Name) -> Option<u64> {
        self.highest_seq_no.get(lsa_name).copied()
    }

    pub fn fetch_stats(&self) -> &FetchStats {
        &self.stats
    }

    pub fn is_build_adj_lsa_scheduled(&self) -> bool {
        self.is_build_adj_lsa_scheduled
    }

    pub fn adj_build_count(&self) -> u64 {
        self.adj_build_count
    }

    // ---- timers ----

    /// Own LSAs are refreshed every refresh interval; foreign ones live until
    /// their advertised expiration.
    fn expiration_delay<L: Lsa>(&self, lsa: &L, ctx: &LsdbContext<'_>) -> Duration {
        if *lsa.origin_router() == self.this_router {
            ctx.conf.lsa_refresh() + GRACE_PERIOD
        } else {
            ctx.scheduler.until(lsa.expiration()) + GRACE_PERIOD
        }
    }

    fn schedule_expiration<L: Lsa>(lsa: &L, delay: Duration, scheduler: &mut EventScheduler) -> TaskHandle {
        debug!(
            "Scheduling expiration of {} seq {} in {:?}",
            lsa.key(),
            lsa.seq_no(),
            delay
        );
        scheduler.schedule(
            delay,
            Event::ExpireOrRefresh {
                key: lsa.key(),
                seq_no: lsa.seq_no(),
            },
        )
    }

    // ---- install / remove ----

    /// Stores a name LSA if it is new, registering its names with the name
    /// prefix table. Returns false for a stale LSA.
    pub fn install_name_lsa(&mut self, lsa: NameLsa, ctx: &mut LsdbContext<'_>) -> bool {
        let delay = self.expiration_delay(&lsa, ctx);
        let origin = lsa.origin_router.clone();
        let is_foreign = origin != self.this_router;

        match self.name_lsdb.get_mut(&origin) {
            None => {
                debug!("New Name LSA {} seq {}", origin, lsa.seq_no);
                if is_foreign {
                    ctx.npt.add_entry(&origin, &origin);
                    for name in lsa.names.iter().filter(|n| **n != self.this_router) {
                        ctx.npt.add_entry(name, &origin);
                    }
                }
                let expiring = Self::schedule_expiration(&lsa, delay, ctx.scheduler);
                self.name_lsdb.insert(origin, Stored { lsa, expiring });
                true
            }
            Some(stored) if stored.lsa.seq_no < lsa.seq_no => {
                debug!(
                    "Updating Name LSA {} seq {} -> {}",
                    origin, stored.lsa.seq_no, lsa.seq_no
                );
                if is_foreign {
                    for added in lsa.names.difference(&stored.lsa.names) {
                        if *added != self.this_router {
                            ctx.npt.add_entry(added, &origin);
                        }
                    }
                    for removed in stored.lsa.names.difference(&lsa.names) {
                        if *removed != self.this_router {
                            ctx.npt.remove_entry(removed, &origin);
                        }
                    }
                }
                ctx.scheduler.cancel(stored.expiring);
                stored.expiring = Self::schedule_expiration(&lsa, delay, ctx.scheduler);
                stored.lsa = lsa;
                true
            }
            Some(_) => false,
        }
    }

    /// Stores an adjacency LSA if it is new. Routing is recalculated when the
    /// LSA is first seen or its adjacencies changed.
    pub fn install_adj_lsa(&mut self, lsa: AdjLsa, ctx: &mut LsdbContext<'_>) -> bool {
        let delay = self.expiration_delay(&lsa, ctx);
        let origin = lsa.origin_router.clone();

        match self.adj_lsdb.get_mut(&origin) {
            None => {
                debug!("New Adj LSA {} seq {}", origin, lsa.seq_no);
                if origin != self.this_router {
                    ctx.npt.add_entry(&origin, &origin);
                }
                let expiring = Self::schedule_expiration(&lsa, delay, ctx.scheduler);
                self.adj_lsdb.insert(origin, Stored { lsa, expiring });
                ctx.schedule_routing_calculation();
                true
            }
            Some(stored) if stored.lsa.seq_no < lsa.seq_no => {
                debug!(
                    "Updating Adj LSA {} seq {} -> {}",
                    origin, stored.lsa.seq_no, lsa.seq_no
                );
                let changed = !stored.lsa.is_equal_content(&lsa);
                ctx.scheduler.cancel(stored.expiring);
                stored.expiring = Self::schedule_expiration(&lsa, delay, ctx.scheduler);
                stored.lsa = lsa;
                if changed {
                    ctx.schedule_routing_calculation();
                }
                true
            }
            Some(_) => false,
        }
    }

    pub fn install_coordinate_lsa(&mut self, lsa: CoordinateLsa, ctx: &mut LsdbContext<'_>) -> bool {
        let delay = self.expiration_delay(&lsa, ctx);
        let origin = lsa.origin_router.clone();
        let state = ctx.conf.hyperbolic_state();

        match self.cor_lsdb.get_mut(&origin) {
            None => {
                debug!("New Coordinate LSA {} seq {}", origin, lsa.seq_no);
                if origin != self.this_router {
                    ctx.npt.add_entry(&origin, &origin);
                }
                let expiring = Self::schedule_expiration(&lsa, delay, ctx.scheduler);
                self.cor_lsdb.insert(origin, Stored { lsa, expiring });
                if state.syncs_coordinates() {
                    ctx.schedule_routing_calculation();
                }
                true
            }
            Some(stored) if stored.lsa.seq_no < lsa.seq_no => {
                debug!(
                    "Updating Coordinate LSA {} seq {} -> {}",
                    origin, stored.lsa.seq_no, lsa.seq_no
                );
                let changed = !stored.lsa.is_equal_content(&lsa);
                ctx.scheduler.cancel(stored.expiring);
                stored.expiring = Self::schedule_expiration(&lsa, delay, ctx.scheduler);
                stored.lsa = lsa;
                if changed && state.syncs_coordinates() {
                    ctx.schedule_routing_calculation();
                }
                true
            }
            Some(_) => false,
        }
    }

    pub fn remove_name_lsa(&mut self, origin: &Name, ctx: &mut LsdbContext<'_>) -> bool {
        let Some(stored) = self.name_lsdb.remove(origin) else {
            return false;
        };
        debug!("Removing Name LSA {} seq {}", origin, stored.lsa.seq_no);
        if *origin != self.this_router {
            ctx.npt.remove_entry(origin, origin);
            for name in stored.lsa.names.iter().filter(|n| **n != self.this_router) {
                ctx.npt.remove_entry(name, origin);
            }
        }
        ctx.scheduler.cancel(stored.expiring);
        true
    }

    pub fn remove_adj_lsa(&mut self, origin: &Name, ctx: &mut LsdbContext<'_>) -> bool {
        let Some(stored) = self.adj_lsdb.remove(origin) else {
            return false;
        };
        debug!("Removing Adj LSA {} seq {}", origin, stored.lsa.seq_no);
        if *origin != self.this_router {
            ctx.npt.remove_entry(origin, origin);
        }
        ctx.scheduler.cancel(stored.expiring);
        true
    }

    pub fn remove_coordinate_lsa(&mut self, origin: &Name, ctx: &mut LsdbContext<'_>) -> bool {
        let Some(stored) = self.cor_lsdb.remove(origin) else {
            return false;
        };
        debug!("Removing Coordinate LSA {} seq {}", origin, stored.lsa.seq_no);
        if *origin != self.this_router {
            ctx.npt.remove_entry(origin, origin);
        }
        ctx.scheduler.cancel(stored.expiring);
        true
    }

    // ---- expiration / refresh ----

    /// Timer callback. Own LSAs are re-advertised with the next sequence
    /// number; foreign LSAs are removed. A timer scheduled for an older
    /// sequence number does nothing.
    pub fn expire_or_refresh(&mut self, key: &LsaKey, seq_no: u64, ctx: &mut LsdbContext<'_>) -> Result<()> {
        let stored_seq_no = self.stored_seq_no(&key.origin, key.lsa_type);
        if stored_seq_no != Some(seq_no) {
            debug!(
                "Ignoring stale timer for {} seq {} (stored {:?})",
                key, seq_no, stored_seq_no
            );
            return Ok(());
        }
        let state = ctx.conf.hyperbolic_state();
        let is_own = key.origin == self.this_router;

        match key.lsa_type {
            LsaType::Name => {
                if is_own {
                    let seq_no = self.refresh_own(LsaType::Name, ctx);
                    ctx.sync.sequencing_mut().set_name_lsa_seq(seq_no);
                    ctx.sync.publish_routing_update()?;
                } else {
                    self.remove_name_lsa(&key.origin, ctx);
                }
            }
            LsaType::Adjacency => {
                if is_own {
                    let seq_no = self.refresh_own(LsaType::Adjacency, ctx);
                    ctx.sync.sequencing_mut().set_adj_lsa_seq(seq_no);
                    ctx.sync.publish_routing_update()?;
                } else {
                    self.remove_adj_lsa(&key.origin, ctx);
                }
                ctx.schedule_routing_calculation();
            }
            LsaType::Coordinate => {
                if is_own {
                    let seq_no = self.refresh_own(LsaType::Coordinate, ctx);
                    if state.syncs_coordinates() {
                        ctx.sync.sequencing_mut().set_cor_lsa_seq(seq_no);
                        ctx.sync.publish_routing_update()?;
                    }
                } else {
                    self.remove_coordinate_lsa(&key.origin, ctx);
                }
                if state == HyperbolicState::On {
                    ctx.schedule_routing_calculation();
                }
            }
        }
        Ok(())
    }

    /// Bumps the sequence number of this router's own LSA, extends its
    /// expiration and reschedules its timer. Returns the new sequence number.
    fn refresh_own(&mut self, lsa_type: LsaType, ctx: &mut LsdbContext<'_>) -> u64 {
        let delay = ctx.conf.lsa_refresh() + GRACE_PERIOD;
        let expiration = ctx.scheduler.after(ctx.conf.router_dead());
        let scheduler = &mut *ctx.scheduler;
        let refreshed = match lsa_type {
            LsaType::Name => self
                .name_lsdb
                .get_mut(&self.this_router)
                .map(|s| refresh_stored(s, expiration, delay, scheduler)),
            LsaType::Adjacency => self
                .adj_lsdb
                .get_mut(&self.this_router)
                .map(|s| refresh_stored(s, expiration, delay, scheduler)),
            LsaType::Coordinate => self
                .cor_lsdb
                .get_mut(&self.this_router)
                .map(|s| refresh_stored(s, expiration, delay, scheduler)),
        };
        refreshed.unwrap_or_default()
    }

    // ---- own LSAs ----

    /// Builds this router's name LSA from the advertised names and installs it.
    pub fn build_and_install_own_name_lsa(&mut self, ctx: &mut LsdbContext<'_>) -> Result<()> {
        let seq_no = ctx.sync.sequencing().name_lsa_seq() + 1;
        let lsa = NameLsa::new(
            self.this_router.clone(),
            seq_no,
            ctx.scheduler.after(ctx.conf.router_dead()),
            ctx.conf.advertised_names.iter().cloned(),
        );
        debug!("Building own Name LSA seq {} with {} names", seq_no, lsa.names.len());
        ctx.sync.sequencing_mut().increase_name_lsa_seq();
        self.install_name_lsa(lsa, ctx);
        if ctx.sync.has_channel() {
            ctx.sync.publish_routing_update()?;
        }
        Ok(())
    }

    /// Builds this router's adjacency LSA from its active neighbors.
    pub fn build_and_install_own_adj_lsa(&mut self, ctx: &mut LsdbContext<'_>) -> Result<()> {
        let seq_no = ctx.sync.sequencing().adj_lsa_seq() + 1;
        let lsa = AdjLsa::new(
            self.this_router.clone(),
            seq_no,
            ctx.scheduler.after(ctx.conf.router_dead()),
            ctx.adjacencies.iter(),
        );
        debug!("Building own Adj LSA seq {} with {} links", seq_no, lsa.num_active());
        let advertise = ctx.conf.hyperbolic_state().syncs_adjacencies();
        if advertise {
            ctx.sync.sequencing_mut().increase_adj_lsa_seq();
        }
        self.install_adj_lsa(lsa, ctx);
        if advertise {
            ctx.sync.publish_routing_update()?;
        }
        Ok(())
    }

    /// Builds this router's coordinate LSA from the configured radius and angle.
    pub fn build_and_install_own_coordinate_lsa(&mut self, ctx: &mut LsdbContext<'_>) -> Result<()> {
        let seq_no = ctx.sync.sequencing().cor_lsa_seq() + 1;
        let lsa = CoordinateLsa::new(
            self.this_router.clone(),
            seq_no,
            ctx.scheduler.after(ctx.conf.router_dead()),
            ctx.conf.hyperbolic.radius,
            ctx.conf.hyperbolic.angle,
        );
        debug!("Building own Coordinate LSA seq {}", seq_no);
        let advertise = ctx.conf.hyperbolic_state().syncs_coordinates();
        if advertise {
            ctx.sync.sequencing_mut().increase_cor_lsa_seq();
        }
        self.install_coordinate_lsa(lsa, ctx);
        if advertise {
            ctx.sync.publish_routing_update()?;
        }
        Ok(())
    }

    /// Requests a rebuild of the own adjacency LSA. Requests arriving before the
    /// build runs are folded into it.
    pub fn schedule_adj_lsa_build(&mut self, ctx: &mut LsdbContext<'_>) {
        self.adj_build_count += 1;
        if ctx.conf.hyperbolic_state() == HyperbolicState::On {
            debug!("Adjacency LSA not built: hyperbolic routing is on");
            return;
        }
        if !self.is_build_adj_lsa_scheduled {
            debug!("Scheduling adjacency LSA build in {:?}", ctx.conf.adj_lsa_build());
            ctx.scheduler.schedule(ctx.conf.adj_lsa_build(), Event::BuildAdjLsa);
            self.is_build_adj_lsa_scheduled = true;
        }
    }

    /// Timer callback for [`Lsdb::schedule_adj_lsa_build`].
    pub fn build_adj_lsa(&mut self, ctx: &mut LsdbContext<'_>) -> Result<()> {
        self.is_build_adj_lsa_scheduled = false;

        if !ctx.adjacencies.is_adj_lsa_buildable(ctx.conf.interest_retry_number) {
            debug!("Adjacency list not settled, rescheduling adjacency LSA build");
            ctx.scheduler.schedule(ctx.conf.adj_lsa_build(), Event::BuildAdjLsa);
            self.is_build_adj_lsa_scheduled = true;
            return Ok(());
        }

        let build_count = self.adj_build_count;
        let result = if build_count == 0 {
            Ok(())
        } else if ctx.adjacencies.num_active_neighbors() > 0 {
            self.build_and_install_own_adj_lsa(ctx)
        } else {
            debug!("No active neighbors, removing own adjacency LSA");
            let this_router = self.this_router.clone();
            self.remove_adj_lsa(&this_router, ctx);
            ctx.schedule_routing_calculation();
            Ok(())
        };
        self.adj_build_count -= build_count;
        if ctx.routing_table.take_deferred() {
            debug!("Rescheduling routing table calculation deferred by the build");
            ctx.schedule_routing_calculation();
        }
        result
    }

    // ---- fetching ----

    /// Fetches `interest` unless a higher sequence number was already requested
    /// for the same LSA.
    pub fn express_interest(
        &mut self,
        interest: &Name,
        retry: u32,
        deadline: Option<Duration>,
        ctx: &mut LsdbContext<'_>,
    ) {
        let parsed = match LsaName::parse(interest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Not fetching {}: {}", interest, e);
                return;
            }
        };
        let deadline =
            deadline.unwrap_or_else(|| ctx.scheduler.elapsed() + ctx.conf.lsa_retrieval_deadline());
        let lsa_name = interest.parent();

        match self.highest_seq_no.get_mut(&lsa_name) {
            Some(highest) if parsed.seq_no < *highest => {
                debug!(
                    "Not fetching {}: seq {} already requested",
                    interest, *highest
                );
                return;
            }
            Some(highest) => *highest = parsed.seq_no,
            None => {
                self.highest_seq_no.insert(lsa_name, parsed.seq_no);
            }
        }

        self.stats.get_mut(parsed.lsa_type).interests += 1;
        debug!("Fetching {} (retry {})", interest, retry);
        ctx.fetcher.fetch(FetchRequest {
            interest: interest.clone(),
            lifetime: ctx.conf.interest_lifetime(),
            retry,
            deadline,
        });
    }

    /// Retries a failed fetch while the deadline has not passed and no newer
    /// version of the LSA has been requested since.
    pub fn on_fetch_error(&mut self, request: &FetchRequest, error: &FetchError, ctx: &mut LsdbContext<'_>) {
        debug!("Fetch of {} failed: {}", request.interest, error);
        if error.kind == FetchErrorKind::InterestTimeout {
            if let Ok(parsed) = LsaName::parse(&request.interest) {
                self.stats.get_mut(parsed.lsa_type).timeouts += 1;
            }
        }
        if ctx.scheduler.elapsed() >= request.deadline {
            debug!("Giving up on {}: retrieval deadline passed", request.interest);
            return;
        }
        let Some(seq_no) = request.interest.last_number() else {
            return;
        };
        if self.highest_seq_no.get(&request.interest.parent()) != Some(&seq_no) {
            debug!("Not retrying {}: a newer version was requested", request.interest);
            return;
        }
        let delay = match error.kind {
            FetchErrorKind::InterestTimeout => Duration::ZERO,
            FetchErrorKind::Other => ctx.conf.interest_lifetime(),
        };
        ctx.scheduler.schedule(
            delay,
            Event::ExpressInterest {
                interest: request.interest.clone(),
                retry: request.retry + 1,
                deadline: Some(request.deadline),
            },
        );
    }

    /// Handles retrieved LSA content.
    pub fn after_fetch_lsa(&mut self, data_name: &Name, content: &[u8], ctx: &mut LsdbContext<'_>) {
        let parsed = match LsaName::parse(data_name) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Discarding LSA data: {}", e);
                return;
            }
        };
        if let Some(highest) = self.highest_seq_no.get(&data_name.parent()) {
            if *highest != parsed.seq_no {
                debug!(
                    "Discarding {}: seq {} has been requested since",
                    data_name, *highest
                );
                return;
            }
        }
        self.stats.get_mut(parsed.lsa_type).data += 1;

        if !ctx.validator.validate(data_name, content) {
            warn!("Validation failed for {}", data_name);
            return;
        }
        match parsed.lsa_type {
            LsaType::Name => self.process_content_name_lsa(&parsed, content, ctx),
            LsaType::Adjacency => self.process_content_adj_lsa(&parsed, content, ctx),
            LsaType::Coordinate => self.process_content_coordinate_lsa(&parsed, content, ctx),
        }
    }

    pub fn process_content_name_lsa(&mut self, parsed: &LsaName, content: &[u8], ctx: &mut LsdbContext<'_>) {
        if !self.is_name_lsa_new(&parsed.origin, parsed.seq_no) {
            return;
        }
        if let Some(lsa) = decode_matching::<NameLsa>(parsed, content) {
            self.install_name_lsa(lsa, ctx);
        }
    }

    pub fn process_content_adj_lsa(&mut self, parsed: &LsaName, content: &[u8], ctx: &mut LsdbContext<'_>) {
        if !self.is_adj_lsa_new(&parsed.origin, parsed.seq_no) {
            return;
        }
        if let Some(lsa) = decode_matching::<AdjLsa>(parsed, content) {
            self.install_adj_lsa(lsa, ctx);
        }
    }

    pub fn process_content_coordinate_lsa(&mut self, parsed: &LsaName, content: &[u8], ctx: &mut LsdbContext<'_>) {
        if !self.is_coordinate_lsa_new(&parsed.origin, parsed.seq_no) {
            return;
        }
        if let Some(lsa) = decode_matching::<CoordinateLsa>(parsed, content) {
            self.install_coordinate_lsa(lsa, ctx);
        }
    }

    /// Content for an LSA interest, if the exact requested version is stored.
    pub fn process_interest(&self, interest: &Name, state: HyperbolicState) -> Option<Vec<u8>> {
        let parsed = match LsaName::parse(interest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring LSA interest: {}", e);
                return None;
            }
        };
        match parsed.lsa_type {
            LsaType::Name => encode_if_seq(self.find_name_lsa(&parsed.origin), parsed.seq_no),
            LsaType::Adjacency => {
                if state == HyperbolicState::On {
                    error!("Received interest for an adjacency LSA while hyperbolic routing is on");
                }
                encode_if_seq(self.find_adj_lsa(&parsed.origin), parsed.seq_no)
            }
            LsaType::Coordinate => {
                if state == HyperbolicState::Off {
                    error!("Received interest for a coordinate LSA while hyperbolic routing is off");
                }
                encode_if_seq(self.find_coordinate_lsa(&parsed.origin), parsed.seq_no)
            }
        }
    }

    pub fn write_log(&self) {
        debug!("---------------Name LSDB-------------------");
        for s in self.name_lsdb.values() {
            debug!(
                "{} seq {} expires {} names {:?}",
                s.lsa.origin_router,
                s.lsa.seq_no,
                s.lsa.expiration,
                s.lsa.names.iter().map(ToString::to_string).collect::<Vec<_>>()
            );
        }
        debug!("---------------Adj LSDB--------------------");
        for s in self.adj_lsdb.values() {
            debug!(
                "{} seq {} expires {}",
                s.lsa.origin_router, s.lsa.seq_no, s.lsa.expiration
            );
            for adj in &s.lsa.adjacents {
                debug!("  {} face {} cost {}", adj.name, adj.face_uri, adj.link_cost);
            }
        }
        debug!("---------------Cor LSDB--------------------");
        for s in self.cor_lsdb.values() {
            debug!(
                "{} seq {} expires {} radius {} angle {}",
                s.lsa.origin_router, s.lsa.seq_no, s.lsa.expiration, s.lsa.radius, s.lsa.angle
            );
        }
    }
}

fn refresh_stored<L: Lsa>(
    stored: &mut Stored<L>,
    expiration: chrono::DateTime<chrono::Utc>,
    delay: Duration,
    scheduler: &mut EventScheduler,
) -> u64 {
    let seq_no = stored.lsa.seq_no() + 1;
    stored.lsa.set_seq_no(seq_no);
    stored.lsa.set_expiration(expiration);
    scheduler.cancel(stored.expiring);
    stored.expiring = Lsdb::schedule_expiration(&stored.lsa, delay, scheduler);
    debug!("Refreshed own {} to seq {}", stored.lsa.key(), seq_no);
    seq_no
}

/// Decodes content and checks it is the LSA its name claims to be.
fn decode_matching<L: Lsa>(parsed: &LsaName, content: &[u8]) -> Option<L> {
    match L::decode(content) {
        Ok(lsa) if *lsa.origin_router() == parsed.origin && lsa.seq_no() == parsed.seq_no => Some(lsa),
        Ok(lsa) => {
            warn!(
                "Discarding {} seq {}: content is {} seq {}",
                parsed.key(),
                parsed.seq_no,
                lsa.key(),
                lsa.seq_no()
            );
            None
        }
        Err(e) => {
            warn!("Discarding {} seq {}: {}", parsed.key(), parsed.seq_no, e);
            None
        }
    }
}

fn encode_if_seq<L: Lsa>(lsa: Option<&L>, seq_no: u64) -> Option<Vec<u8>> {
    lsa.filter(|l| l.seq_no() == seq_no).map(Lsa::encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{AdjacencyStatus, Adjacent};
    use crate::test_support::{Fixture, name};

    fn hour(fx: &Fixture) -> chrono::DateTime<chrono::Utc> {
        fx.scheduler.after(Duration::from_secs(3600))
    }

    fn expire_events(fx: &Fixture) -> Vec<(LsaKey, u64)> {
        fx.scheduler
            .pending()
            .filter_map(|e| match e {
                Event::ExpireOrRefresh { key, seq_no } => Some((key.clone(), *seq_no)),
                _ => None,
            })
            .collect()
    }

    /// Pops and runs every expiration timer due by `until`.
    fn fire_timers(fx: &mut Fixture, until: Duration) {
        while let Some(event) = fx.scheduler.pop_due(until) {
            if let Event::ExpireOrRefresh { key, seq_no } = event {
                let (lsdb, mut ctx) = fx.parts();
                lsdb.expire_or_refresh(&key, seq_no, &mut ctx).unwrap();
            }
        }
        fx.scheduler.advance_clock(until);
    }

    #[test]
    fn installs_only_newer_versions() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let exp = hour(&fx);
        let (lsdb, mut ctx) = fx.parts();

        assert!(lsdb.install_name_lsa(NameLsa::new(b.clone(), 5, exp, []), &mut ctx));
        assert!(!lsdb.install_name_lsa(NameLsa::new(b.clone(), 5, exp, []), &mut ctx));
        assert!(!lsdb.install_name_lsa(NameLsa::new(b.clone(), 4, exp, []), &mut ctx));
        assert!(lsdb.install_name_lsa(NameLsa::new(b.clone(), 6, exp, []), &mut ctx));
        assert_eq!(lsdb.find_name_lsa(&b).unwrap().seq_no, 6);
        assert!(!lsdb.is_name_lsa_new(&b, 6));
        assert!(lsdb.is_name_lsa_new(&b, 7));
        assert!(lsdb.is_adj_lsa_new(&b, 1));
    }

    #[test]
    fn one_live_timer_per_lsa() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let exp = hour(&fx);
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.install_name_lsa(NameLsa::new(b.clone(), 1, exp, []), &mut ctx);
            lsdb.install_name_lsa(NameLsa::new(b.clone(), 2, exp, []), &mut ctx);
            lsdb.install_name_lsa(NameLsa::new(b.clone(), 3, exp, []), &mut ctx);
        }
        let timers = expire_events(&fx);
        assert_eq!(timers, vec![(LsaKey::new(b.clone(), LsaType::Name), 3)]);
        let handle = fx.lsdb.expiration_timer(&LsaKey::new(b, LsaType::Name)).unwrap();
        assert!(fx.scheduler.is_pending(handle));
    }

    #[test]
    fn stale_timer_is_a_no_op() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let exp = hour(&fx);
        let (lsdb, mut ctx) = fx.parts();
        lsdb.install_name_lsa(NameLsa::new(b.clone(), 2, exp, []), &mut ctx);

        let key = LsaKey::new(b.clone(), LsaType::Name);
        lsdb.expire_or_refresh(&key, 1, &mut ctx).unwrap();
        assert!(lsdb.find_name_lsa(&b).is_some());
    }

    #[test]
    fn foreign_lsa_expires_after_grace_period() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let exp = fx.scheduler.after(Duration::from_secs(100));
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.install_name_lsa(NameLsa::new(b.clone(), 1, exp, [name("/ndn/b/files")]), &mut ctx);
        }
        assert!(fx.npt.contains(&name("/ndn/b/files"), &b));

        fire_timers(&mut fx, Duration::from_secs(109));
        assert!(fx.lsdb.find_name_lsa(&b).is_some());

        fire_timers(&mut fx, Duration::from_secs(110));
        assert!(fx.lsdb.find_name_lsa(&b).is_none());
        assert!(fx.npt.is_empty());
    }

    #[test]
    fn own_lsa_is_refreshed_not_removed() {
        let mut fx = Fixture::new("/a");
        fx.conf.advertised_names = vec![name("/ndn/a/files")];
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.build_and_install_own_name_lsa(&mut ctx).unwrap();
        }
        let me = fx.conf.router_prefix();
        assert_eq!(fx.lsdb.find_name_lsa(&me).unwrap().seq_no, 1);
        assert!(fx.npt.is_empty());
        fx.channel.take();

        let refresh = fx.conf.lsa_refresh() + GRACE_PERIOD;
        fire_timers(&mut fx, refresh);
        assert_eq!(fx.lsdb.find_name_lsa(&me).unwrap().seq_no, 2);
        assert_eq!(fx.sync.sequencing().name_lsa_seq(), 2);
        assert_eq!(fx.channel.take().len(), 1);

        fire_timers(&mut fx, refresh * 10);
        assert_eq!(fx.lsdb.find_name_lsa(&me).unwrap().seq_no, 11);
    }

    #[test]
    fn name_updates_diff_prefix_registrations() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let (x, y, z) = (name("/x"), name("/y"), name("/z"));
        let exp = hour(&fx);
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.install_name_lsa(NameLsa::new(b.clone(), 1, exp, [x.clone(), y.clone()]), &mut ctx);
            lsdb.install_name_lsa(NameLsa::new(b.clone(), 2, exp, [y.clone(), z.clone()]), &mut ctx);
        }
        assert!(!fx.npt.contains(&x, &b));
        assert!(fx.npt.contains(&y, &b));
        assert!(fx.npt.contains(&z, &b));
        assert!(fx.npt.contains(&b, &b));
    }

    #[test]
    fn unchanged_adjacencies_do_not_trigger_calculation() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let c = Adjacent::new(name("/ndn/site/c"), "udp://c", 10.0);
        let exp = hour(&fx);
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.install_adj_lsa(AdjLsa::new(b.clone(), 1, exp, [&c]), &mut ctx);
        }
        assert!(fx.routing_table.is_calculation_scheduled());
        fx.routing_table.finish_calculation();
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.install_adj_lsa(AdjLsa::new(b.clone(), 2, exp, [&c]), &mut ctx);
        }
        assert!(!fx.routing_table.is_calculation_scheduled());
    }

    #[test]
    fn fetch_tracks_highest_requested_seq() {
        let mut fx = Fixture::new("/a");
        let lsa_name = name("/ndn/NLSR/LSA/site/b/name");
        let (lsdb, mut ctx) = fx.parts();
        lsdb.express_interest(&lsa_name.clone().append_number(4), 0, None, &mut ctx);
        lsdb.express_interest(&lsa_name.clone().append_number(3), 0, None, &mut ctx);
        lsdb.express_interest(&lsa_name.clone().append_number(4), 1, None, &mut ctx);
        assert_eq!(lsdb.highest_requested_seq_no(&lsa_name), Some(4));
        assert_eq!(lsdb.fetch_stats().get(LsaType::Name).interests, 2);

        let requests = fx.fetcher.drain();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].lifetime, fx.conf.interest_lifetime());
        assert_eq!(requests[1].retry, 1);
    }

    #[test]
    fn timeout_retries_immediately_until_superseded() {
        let mut fx = Fixture::new("/a");
        let lsa_name = name("/ndn/NLSR/LSA/site/b/adjacency");
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.express_interest(&lsa_name.clone().append_number(1), 0, None, &mut ctx);
        }
        let first = fx.fetcher.drain().remove(0);
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.on_fetch_error(&first, &FetchError::timeout(), &mut ctx);
        }
        assert_eq!(
            fx.scheduler.pop_due(Duration::ZERO),
            Some(Event::ExpressInterest {
                interest: first.interest.clone(),
                retry: 1,
                deadline: Some(first.deadline),
            })
        );

        let (lsdb, mut ctx) = fx.parts();
        lsdb.express_interest(&lsa_name.clone().append_number(2), 0, None, &mut ctx);
        lsdb.on_fetch_error(&first, &FetchError::other("nack"), &mut ctx);
        assert_eq!(lsdb.fetch_stats().get(LsaType::Adjacency).timeouts, 1);
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn no_retry_after_deadline() {
        let mut fx = Fixture::new("/a");
        let interest = name("/ndn/NLSR/LSA/site/b/name/1");
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.express_interest(&interest, 0, Some(Duration::from_secs(5)), &mut ctx);
        }
        let request = fx.fetcher.drain().remove(0);
        fx.scheduler.advance_clock(Duration::from_secs(5));
        let (lsdb, mut ctx) = fx.parts();
        lsdb.on_fetch_error(&request, &FetchError::timeout(), &mut ctx);
        assert!(fx.scheduler.is_empty());
    }

    #[test]
    fn fetched_content_is_installed_once() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let data_name = name("/ndn/NLSR/LSA/site/b/name/7");
        let lsa = NameLsa::new(b.clone(), 7, hour(&fx), [name("/ndn/b/video")]);
        let (lsdb, mut ctx) = fx.parts();
        lsdb.express_interest(&data_name, 0, None, &mut ctx);
        lsdb.after_fetch_lsa(&data_name, &lsa.encode(), &mut ctx);
        lsdb.after_fetch_lsa(&data_name, &lsa.encode(), &mut ctx);
        assert_eq!(lsdb.find_name_lsa(&b).unwrap().seq_no, 7);
        assert_eq!(lsdb.fetch_stats().get(LsaType::Name).data, 2);
        assert!(fx.npt.contains(&name("/ndn/b/video"), &b));
    }

    #[test]
    fn mismatched_or_outdated_content_is_discarded() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        let lsa = NameLsa::new(b.clone(), 7, hour(&fx), []);
        let (lsdb, mut ctx) = fx.parts();

        lsdb.after_fetch_lsa(&name("/ndn/NLSR/LSA/site/b/name/8"), &lsa.encode(), &mut ctx);
        assert!(lsdb.find_name_lsa(&b).is_none());

        lsdb.express_interest(&name("/ndn/NLSR/LSA/site/b/name/9"), 0, None, &mut ctx);
        lsdb.after_fetch_lsa(&name("/ndn/NLSR/LSA/site/b/name/7"), &lsa.encode(), &mut ctx);
        assert!(lsdb.find_name_lsa(&b).is_none());
    }

    #[test]
    fn interests_are_served_for_the_stored_version_only() {
        let mut fx = Fixture::new("/a");
        fx.conf.advertised_names = vec![name("/ndn/a/files")];
        let (lsdb, mut ctx) = fx.parts();
        lsdb.build_and_install_own_name_lsa(&mut ctx).unwrap();

        let content = lsdb
            .process_interest(&name("/ndn/NLSR/LSA/site/a/name/1"), HyperbolicState::Off)
            .unwrap();
        let decoded = NameLsa::decode(&content).unwrap();
        assert!(decoded.names.contains(&name("/ndn/a/files")));
        assert!(lsdb
            .process_interest(&name("/ndn/NLSR/LSA/site/a/name/2"), HyperbolicState::Off)
            .is_none());
    }

    #[test]
    fn adj_build_folds_requests_and_follows_neighbors() {
        let mut fx = Fixture::new("/a");
        let b = name("/ndn/site/b");
        fx.adjacencies.insert(Adjacent::new(b.clone(), "udp://b", 5.0));
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.schedule_adj_lsa_build(&mut ctx);
            lsdb.schedule_adj_lsa_build(&mut ctx);
            assert_eq!(lsdb.adj_build_count(), 2);
            assert!(lsdb.is_build_adj_lsa_scheduled());
        }
        assert_eq!(fx.scheduler.len(), 1);
        assert_eq!(fx.scheduler.pop_due(fx.conf.adj_lsa_build()), Some(Event::BuildAdjLsa));

        let me = fx.conf.router_prefix();
        {
            let (lsdb, mut ctx) = fx.parts();
            lsdb.build_adj_lsa(&mut ctx).unwrap();
            assert_eq!(lsdb.adj_build_count(), 0);
            assert_eq!(lsdb.find_adj_lsa(&me).unwrap().num_active(), 1);
        }
        assert_eq!(fx.sync.sequencing().adj_lsa_seq(), 1);

        fx.adjacencies.set_status(&b, AdjacencyStatus::Inactive);
        fx.adjacencies.find_mut(&b).unwrap().interest_timed_out = fx.conf.interest_retry_number;
        let (lsdb, mut ctx) = fx.parts();
        lsdb.schedule_adj_lsa_build(&mut ctx);
        lsdb.build_adj_lsa(&mut ctx).unwrap();
        assert!(lsdb.find_adj_lsa(&me).is_none());
    }

    #[test]
    fn hyperbolic_mode_does_not_build_adjacency_lsa() {
        let mut fx = Fixture::new("/a");
        fx.conf.hyperbolic.state = HyperbolicState::On;
        let (lsdb, mut ctx) = fx.parts();
        lsdb.schedule_adj_lsa_build(&mut ctx);
        assert!(!lsdb.is_build_adj_lsa_scheduled());
        assert!(fx.scheduler.is_empty());
    }
}
