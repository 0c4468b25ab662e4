use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use super::lsdb::Lsdb;
use super::sequencing::{SeqVector, SequencingManager};
use crate::config::{HyperbolicState, RouterConfig};
use crate::error::{Error, Result};
use crate::lsa::LsaType;
use crate::name::Name;
use crate::scheduler::{Event, EventScheduler};

/// One `(prefix, sequence vector)` pair carried by the sync protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUpdate {
    /// Update prefix of the publishing router, `network/NLSR/LSA/site/router`.
    pub prefix: Name,
    /// Combined sequence vector, see [`SeqVector::combined`].
    pub seq_no: u64,
}

impl SyncUpdate {
    pub fn new(prefix: Name, seq_no: u64) -> Self {
        Self { prefix, seq_no }
    }

    pub fn vector(&self) -> SeqVector {
        SeqVector::from_combined(self.seq_no)
    }

    /// Router that published this update: the update prefix without the
    /// `NLSR/LSA` components.
    pub fn origin_router(&self) -> Result<Name> {
        let malformed = |reason| Error::MalformedName {
            name: self.prefix.to_string(),
            reason,
        };
        let nlsr = self
            .prefix
            .position_of("NLSR")
            .ok_or_else(|| malformed("missing NLSR component"))?;
        let lsa = self
            .prefix
            .position_of("LSA")
            .ok_or_else(|| malformed("missing LSA component"))?;
        if lsa <= nlsr || lsa + 1 >= self.prefix.len() {
            return Err(malformed("missing router name"));
        }
        Ok(self
            .prefix
            .sub_name(0, nlsr)
            .append_name(&self.prefix.suffix_from(lsa + 1)))
    }
}

/// Dataset synchronization transport: publishes this router's vector.
/// Updates from other routers are fed to [`SyncLogicHandler::on_update`] by the
/// owner of the channel.
pub trait SyncChannel: Send {
    fn publish(&mut self, update: SyncUpdate) -> Result<()>;
}

/// Channel that records published updates for the owner to deliver.
#[derive(Debug, Clone, Default)]
pub struct MemorySyncChannel {
    published: Arc<Mutex<Vec<SyncUpdate>>>,
}

impl MemorySyncChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything published so far.
    pub fn take(&self) -> Vec<SyncUpdate> {
        match self.published.lock() {
            Ok(mut published) => std::mem::take(&mut *published),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl SyncChannel for MemorySyncChannel {
    fn publish(&mut self, update: SyncUpdate) -> Result<()> {
        match self.published.lock() {
            Ok(mut published) => published.push(update),
            Err(poisoned) => poisoned.into_inner().push(update),
        }
        Ok(())
    }
}

/// Publishes this router's sequence vector and turns other routers' vectors
/// into LSA fetches.
pub struct SyncLogicHandler {
    router_prefix: Name,
    update_prefix: Name,
    sequencing: SequencingManager,
    channel: Option<Box<dyn SyncChannel>>,
    /// New LSAs advertised for a type the local mode does not synchronize.
    mode_mismatches: u64,
}

impl SyncLogicHandler {
    pub fn new(conf: &RouterConfig, sequencing: SequencingManager) -> Self {
        Self {
            router_prefix: conf.router_prefix(),
            update_prefix: conf.update_prefix(),
            sequencing,
            channel: None,
            mode_mismatches: 0,
        }
    }

    pub fn set_channel(&mut self, channel: Box<dyn SyncChannel>) {
        self.channel = Some(channel);
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    pub fn sequencing(&self) -> &SequencingManager {
        &self.sequencing
    }

    pub fn sequencing_mut(&mut self) -> &mut SequencingManager {
        &mut self.sequencing
    }

    pub fn mode_mismatches(&self) -> u64 {
        self.mode_mismatches
    }

    /// Persists the counters, then advertises the combined vector.
    pub fn publish_routing_update(&mut self) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(Error::SyncChannelMissing)?;
        self.sequencing.vector().check_width()?;
        self.sequencing.write_to_storage()?;
        let update = SyncUpdate::new(self.update_prefix.clone(), self.sequencing.combined_seq_no());
        debug!(
            "Publishing routing update {} with {:?}",
            update.prefix,
            self.sequencing.vector()
        );
        channel.publish(update)
    }

    /// Schedules a delayed fetch for every LSA type whose advertised sequence
    /// number is newer than the stored one.
    pub fn on_update(
        &mut self,
        updates: &[SyncUpdate],
        conf: &RouterConfig,
        lsdb: &Lsdb,
        scheduler: &mut EventScheduler,
    ) {
        for update in updates {
            debug!("Sync update: {} seq {}", update.prefix, update.seq_no);
            let origin = match update.origin_router() {
                Ok(origin) => origin,
                Err(e) => {
                    warn!("Discarding sync update: {}", e);
                    continue;
                }
            };
            if origin == self.router_prefix {
                continue;
            }
            let vector = update.vector();
            for lsa_type in LsaType::ALL {
                let seq_no = vector.get(lsa_type);
                if seq_no == 0 || !lsdb.is_lsa_new(&origin, lsa_type, seq_no) {
                    continue;
                }
                if !self.is_synced(lsa_type, seq_no, conf.hyperbolic_state(), &origin) {
                    continue;
                }
                let interest = update
                    .prefix
                    .clone()
                    .append(lsa_type.as_str())
                    .append_number(seq_no);
                debug!("Scheduling fetch of {} in {:?}", interest, conf.sync_fetch_delay());
                scheduler.schedule(
                    conf.sync_fetch_delay(),
                    Event::ExpressInterest {
                        interest,
                        retry: 0,
                        deadline: None,
                    },
                );
            }
        }
    }

    /// Whether `lsa_type` is synchronized in `state`. A new LSA of a type that
    /// is not is a protocol error on the sender's side.
    fn is_synced(&mut self, lsa_type: LsaType, seq_no: u64, state: HyperbolicState, origin: &Name) -> bool {
        let synced = match lsa_type {
            LsaType::Name => true,
            LsaType::Adjacency => state.syncs_adjacencies(),
            LsaType::Coordinate => state.syncs_coordinates(),
        };
        if !synced {
            self.mode_mismatches += 1;
            error!(
                "Received {} LSA seq {} from {} while hyperbolic routing is {}",
                lsa_type, seq_no, origin, state
            );
        }
        synced
    }
}
