use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::config::HyperbolicState;
use crate::error::{Error, Result};
use crate::lsa::LsaType;

const NAME_BITS: u32 = 24;
const ADJ_BITS: u32 = 20;
const COR_BITS: u32 = 20;
const ADJ_MASK: u64 = (1 << ADJ_BITS) - 1;
const COR_MASK: u64 = (1 << COR_BITS) - 1;

/// Margin added to restored counters in case the last increment was advertised
/// but never written.
const RESTORE_MARGIN: u64 = 10;

/// Per-type sequence numbers of one router, as carried by a sync update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqVector {
    pub name: u64,
    pub adjacency: u64,
    pub coordinate: u64,
}

impl SeqVector {
    pub fn new(name: u64, adjacency: u64, coordinate: u64) -> Self {
        Self {
            name,
            adjacency,
            coordinate,
        }
    }

    /// Packs the vector into one number: name in the high 24 bits, coordinate in
    /// the middle 20 and adjacency in the low 20.
    pub fn combined(&self) -> u64 {
        (self.name << 40) | ((self.coordinate & COR_MASK) << 20) | (self.adjacency & ADJ_MASK)
    }

    /// Fails if a counter has outgrown its field in [`SeqVector::combined`].
    pub fn check_width(&self) -> Result<()> {
        for (lsa_type, bits) in [
            (LsaType::Name, NAME_BITS),
            (LsaType::Adjacency, ADJ_BITS),
            (LsaType::Coordinate, COR_BITS),
        ] {
            let seq_no = self.get(lsa_type);
            if seq_no >> bits != 0 {
                return Err(Error::SequenceOverflow {
                    lsa_type,
                    seq_no,
                    bits,
                });
            }
        }
        Ok(())
    }

    pub fn from_combined(seq: u64) -> Self {
        Self {
            name: seq >> 40,
            adjacency: seq & ADJ_MASK,
            coordinate: (seq >> 20) & COR_MASK,
        }
    }

    pub fn get(&self, lsa_type: LsaType) -> u64 {
        match lsa_type {
            LsaType::Name => self.name,
            LsaType::Adjacency => self.adjacency,
            LsaType::Coordinate => self.coordinate,
        }
    }

    fn slot(&mut self, lsa_type: LsaType) -> &mut u64 {
        match lsa_type {
            LsaType::Name => &mut self.name,
            LsaType::Adjacency => &mut self.adjacency,
            LsaType::Coordinate => &mut self.coordinate,
        }
    }
}

/// Owns the sequence numbers of this router's own LSAs.
#[derive(Debug, Default)]
pub struct SequencingManager {
    seq: SeqVector,
    path: Option<PathBuf>,
}

impl SequencingManager {
    /// Counters persisted to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            seq: SeqVector::default(),
            path: Some(path.into()),
        }
    }

    /// Counters that are never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn name_lsa_seq(&self) -> u64 {
        self.seq.name
    }

    pub fn adj_lsa_seq(&self) -> u64 {
        self.seq.adjacency
    }

    pub fn cor_lsa_seq(&self) -> u64 {
        self.seq.coordinate
    }

    pub fn seq(&self, lsa_type: LsaType) -> u64 {
        self.seq.get(lsa_type)
    }

    pub fn vector(&self) -> SeqVector {
        self.seq
    }

    pub fn combined_seq_no(&self) -> u64 {
        self.seq.combined()
    }

    pub fn increase_name_lsa_seq(&mut self) {
        self.increase(LsaType::Name);
    }

    pub fn increase_adj_lsa_seq(&mut self) {
        self.increase(LsaType::Adjacency);
    }

    pub fn increase_cor_lsa_seq(&mut self) {
        self.increase(LsaType::Coordinate);
    }

    pub fn increase(&mut self, lsa_type: LsaType) {
        *self.seq.slot(lsa_type) += 1;
    }

    pub fn set_name_lsa_seq(&mut self, seq_no: u64) {
        self.set(LsaType::Name, seq_no);
    }

    pub fn set_adj_lsa_seq(&mut self, seq_no: u64) {
        self.set(LsaType::Adjacency, seq_no);
    }

    pub fn set_cor_lsa_seq(&mut self, seq_no: u64) {
        self.set(LsaType::Coordinate, seq_no);
    }

    /// Resynchronizes a counter after a refresh. A lower value is ignored.
    pub fn set(&mut self, lsa_type: LsaType, seq_no: u64) {
        let slot = self.seq.slot(lsa_type);
        if seq_no < *slot {
            warn!(
                "Refusing to move {} sequence number back from {} to {}",
                lsa_type, *slot, seq_no
            );
            return;
        }
        *slot = seq_no;
    }

    /// Writes the counters; the file is replaced atomically.
    pub fn write_to_storage(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(&self.seq)?)?;
        fs::rename(&tmp, path)?;
        debug!("Wrote sequence numbers {:?} to {}", self.seq, path.display());
        Ok(())
    }

    /// Restores the counters written by a previous run, if any, and bumps the
    /// counters of the LSA types this router advertises in `state`.
    pub fn init_from_storage(&mut self, state: HyperbolicState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !path.exists() {
            info!("No sequence number file at {}, starting from zero", path.display());
            return Ok(());
        }
        let stored: SeqVector = serde_json::from_slice(&fs::read(path)?)?;
        self.seq = stored;
        self.seq.name += RESTORE_MARGIN;
        if state.syncs_adjacencies() {
            self.seq.adjacency += RESTORE_MARGIN;
        }
        if state.syncs_coordinates() {
            self.seq.coordinate += RESTORE_MARGIN;
        }
        info!("Restored sequence numbers {:?} from {}", self.seq, path.display());
        Ok(())
    }

    pub fn write_log(&self) {
        debug!(
            "----SequencingManager---- Name LSA seq: {} Adj LSA seq: {} Cor LSA seq: {}",
            self.seq.name, self.seq.adjacency, self.seq.coordinate
        );
    }
}
