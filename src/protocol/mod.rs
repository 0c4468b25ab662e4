pub mod lsdb;
pub mod messages;
pub mod routing_table;
pub mod sequencing;
pub mod sync;

pub use lsdb::{FetchCounters, FetchStats, GRACE_PERIOD, Lsdb, LsdbContext};
pub use messages::Packet;
pub use routing_table::{NextHop, NexthopList, RoutingTable, RoutingTableEntry};
pub use sequencing::{SeqVector, SequencingManager};
pub use sync::{MemorySyncChannel, SyncChannel, SyncLogicHandler, SyncUpdate};
