//! Link-state advertisements and their identities.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::adjacency::{Adjacent, AdjacencyStatus};
use crate::error::{Error, Result};
use crate::name::Name;

/// The three kinds of LSA a router originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LsaType {
    Name,
    Adjacency,
    Coordinate,
}

impl LsaType {
    pub const ALL: [LsaType; 3] = [LsaType::Name, LsaType::Adjacency, LsaType::Coordinate];

    /// Token used for this type in LSA names.
    pub fn as_str(self) -> &'static str {
        match self {
            LsaType::Name => "name",
            LsaType::Adjacency => "adjacency",
            LsaType::Coordinate => "coordinate",
        }
    }
}

impl fmt::Display for LsaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LsaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(LsaType::Name),
            "adjacency" => Ok(LsaType::Adjacency),
            "coordinate" => Ok(LsaType::Coordinate),
            other => Err(Error::UnknownLsaType(other.to_string())),
        }
    }
}

/// Identity of a stored LSA: at most one LSA per key lives in the LSDB.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LsaKey {
    pub origin: Name,
    pub lsa_type: LsaType,
}

impl LsaKey {
    pub fn new(origin: Name, lsa_type: LsaType) -> Self {
        Self { origin, lsa_type }
    }
}

impl fmt::Display for LsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.origin, self.lsa_type)
    }
}

/// Behaviour shared by every LSA variant.
pub trait Lsa: Clone + fmt::Debug + Serialize + DeserializeOwned {
    const TYPE: LsaType;

    fn origin_router(&self) -> &Name;
    fn seq_no(&self) -> u64;
    fn set_seq_no(&mut self, seq_no: u64);
    fn expiration(&self) -> DateTime<Utc>;
    fn set_expiration(&mut self, expiration: DateTime<Utc>);

    /// True when the payloads match, ignoring sequence number and expiration.
    fn is_equal_content(&self, other: &Self) -> bool;

    fn key(&self) -> LsaKey {
        LsaKey::new(self.origin_router().clone(), Self::TYPE)
    }

    fn encode(&self) -> Vec<u8> {
        // Plain data structs; serialization into a Vec cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    fn decode(content: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(content)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameLsa {
    pub origin_router: Name,
    pub seq_no: u64,
    pub expiration: DateTime<Utc>,
    pub names: BTreeSet<Name>,
}

impl NameLsa {
    pub fn new(
        origin_router: Name,
        seq_no: u64,
        expiration: DateTime<Utc>,
        names: impl IntoIterator<Item = Name>,
    ) -> Self {
        Self {
            origin_router,
            seq_no,
            expiration,
            names: names.into_iter().collect(),
        }
    }
}

impl Lsa for NameLsa {
    const TYPE: LsaType = LsaType::Name;

    fn origin_router(&self) -> &Name {
        &self.origin_router
    }
    fn seq_no(&self) -> u64 {
        self.seq_no
    }
    fn set_seq_no(&mut self, seq_no: u64) {
        self.seq_no = seq_no;
    }
    fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }
    fn set_expiration(&mut self, expiration: DateTime<Utc>) {
        self.expiration = expiration;
    }
    fn is_equal_content(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjLsa {
    pub origin_router: Name,
    pub seq_no: u64,
    pub expiration: DateTime<Utc>,
    pub adjacents: Vec<Adjacent>,
}

impl AdjLsa {
    /// Only active adjacencies are advertised.
    pub fn new<'a>(
        origin_router: Name,
        seq_no: u64,
        expiration: DateTime<Utc>,
        adjacents: impl IntoIterator<Item = &'a Adjacent>,
    ) -> Self {
        Self {
            origin_router,
            seq_no,
            expiration,
            adjacents: adjacents
                .into_iter()
                .filter(|a| a.status == AdjacencyStatus::Active)
                .cloned()
                .collect(),
        }
    }

    pub fn num_active(&self) -> usize {
        self.adjacents.len()
    }

    fn sorted_links(&self) -> Vec<(&Name, &str, f64)> {
        let mut links: Vec<_> = self
            .adjacents
            .iter()
            .map(|a| (&a.name, a.face_uri.as_str(), a.link_cost))
            .collect();
        links.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));
        links
    }
}

impl Lsa for AdjLsa {
    const TYPE: LsaType = LsaType::Adjacency;

    fn origin_router(&self) -> &Name {
        &self.origin_router
    }
    fn seq_no(&self) -> u64 {
        self.seq_no
    }
    fn set_seq_no(&mut self, seq_no: u64) {
        self.seq_no = seq_no;
    }
    fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }
    fn set_expiration(&mut self, expiration: DateTime<Utc>) {
        self.expiration = expiration;
    }
    fn is_equal_content(&self, other: &Self) -> bool {
        self.sorted_links() == other.sorted_links()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateLsa {
    pub origin_router: Name,
    pub seq_no: u64,
    pub expiration: DateTime<Utc>,
    pub radius: f64,
    pub angle: f64,
}

impl CoordinateLsa {
    pub fn new(
        origin_router: Name,
        seq_no: u64,
        expiration: DateTime<Utc>,
        radius: f64,
        angle: f64,
    ) -> Self {
        Self {
            origin_router,
            seq_no,
            expiration,
            radius,
            angle,
        }
    }
}

impl Lsa for CoordinateLsa {
    const TYPE: LsaType = LsaType::Coordinate;

    fn origin_router(&self) -> &Name {
        &self.origin_router
    }
    fn seq_no(&self) -> u64 {
        self.seq_no
    }
    fn set_seq_no(&mut self, seq_no: u64) {
        self.seq_no = seq_no;
    }
    fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }
    fn set_expiration(&mut self, expiration: DateTime<Utc>) {
        self.expiration = expiration;
    }
    fn is_equal_content(&self, other: &Self) -> bool {
        self.radius == other.radius && self.angle == other.angle
    }
}

/// Pieces of an LSA data or interest name:
/// `/network/NLSR/LSA/site.../router.../type/seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsaName {
    pub origin: Name,
    pub lsa_type: LsaType,
    pub seq_no: u64,
}

impl LsaName {
    pub fn parse(name: &Name) -> Result<Self> {
        let malformed = |reason| Error::MalformedName {
            name: name.to_string(),
            reason,
        };
        let nlsr = name
            .position_of("NLSR")
            .ok_or_else(|| malformed("missing NLSR component"))?;
        let lsa = name
            .position_of("LSA")
            .ok_or_else(|| malformed("missing LSA component"))?;
        if name.len() < lsa + 4 {
            return Err(malformed("missing router, type or sequence number"));
        }
        let seq_no = name
            .last_number()
            .ok_or_else(|| malformed("sequence number is not a number"))?;
        let lsa_type: LsaType = name.get(-2).unwrap_or_default().parse()?;
        let origin = name
            .sub_name(0, nlsr)
            .append_name(&name.sub_name(lsa + 1, name.len() - lsa - 3));
        Ok(Self {
            origin,
            lsa_type,
            seq_no,
        })
    }

    pub fn key(&self) -> LsaKey {
        LsaKey::new(self.origin.clone(), self.lsa_type)
    }
}
