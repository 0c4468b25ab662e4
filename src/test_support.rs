//! Shared fixtures for unit tests.

use chrono::{TimeZone, Utc};

use crate::adjacency::AdjacencyList;
use crate::config::RouterConfig;
use crate::fetch::{AcceptAllValidator, QueueFetcher};
use crate::name::Name;
use crate::name_prefix_table::NamePrefixTable;
use crate::protocol::lsdb::{Lsdb, LsdbContext};
use crate::protocol::routing_table::RoutingTable;
use crate::protocol::sequencing::SequencingManager;
use crate::protocol::sync::{MemorySyncChannel, SyncLogicHandler};
use crate::scheduler::EventScheduler;

pub(crate) fn name(s: &str) -> Name {
    s.parse().unwrap()
}

/// The parts a router owns, laid out so tests can borrow them separately.
pub(crate) struct Fixture {
    pub conf: RouterConfig,
    pub scheduler: EventScheduler,
    pub lsdb: Lsdb,
    pub sync: SyncLogicHandler,
    pub npt: NamePrefixTable,
    pub routing_table: RoutingTable,
    pub adjacencies: AdjacencyList,
    pub fetcher: QueueFetcher,
    pub validator: AcceptAllValidator,
    pub channel: MemorySyncChannel,
}

impl Fixture {
    /// Router `/ndn/site<router>` with no neighbors and an in-memory sync channel.
    pub fn new(router: &str) -> Self {
        let conf = RouterConfig::new(name("/ndn"), name("/site"), name(router));
        let channel = MemorySyncChannel::new();
        let mut sync = SyncLogicHandler::new(&conf, SequencingManager::in_memory());
        sync.set_channel(Box::new(channel.clone()));
        Self {
            lsdb: Lsdb::new(conf.router_prefix()),
            scheduler: EventScheduler::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            sync,
            npt: NamePrefixTable::new(),
            routing_table: RoutingTable::new(),
            adjacencies: AdjacencyList::new(),
            fetcher: QueueFetcher::new(),
            validator: AcceptAllValidator,
            channel,
            conf,
        }
    }

    pub fn parts(&mut self) -> (&mut Lsdb, LsdbContext<'_>) {
        (
            &mut self.lsdb,
            LsdbContext {
                conf: &self.conf,
                scheduler: &mut self.scheduler,
                npt: &mut self.npt,
                sync: &mut self.sync,
                routing_table: &mut self.routing_table,
                adjacencies: &self.adjacencies,
                fetcher: &mut self.fetcher,
                validator: &self.validator,
            },
        )
    }
}
