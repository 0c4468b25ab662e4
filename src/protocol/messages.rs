use serde::{Deserialize, Serialize};

use super::sync::SyncUpdate;
use crate::error::Result;
use crate::name::Name;

/// Datagram exchanged between daemons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    /// A router's sequence vector, flooded to every neighbor.
    Sync(SyncUpdate),
    /// Request for the LSA named `name`.
    Interest { name: Name },
    /// LSA content answering an interest.
    Data { name: Name, content: Vec<u8> },
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
