use serde::{Deserialize, Serialize};

use crate::config::NeighborConfig;
use crate::name::Name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdjacencyStatus {
    #[default]
    Active,
    Inactive,
}

/// One configured neighbor of this router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjacent {
    pub name: Name,
    pub face_uri: String,
    pub link_cost: f64,
    pub status: AdjacencyStatus,
    /// Consecutive hello timeouts; maintained by the liveness prober.
    #[serde(skip)]
    pub interest_timed_out: u32,
}

impl Adjacent {
    pub fn new(name: Name, face_uri: impl Into<String>, link_cost: f64) -> Self {
        Self {
            name,
            face_uri: face_uri.into(),
            link_cost,
            status: AdjacencyStatus::Active,
            interest_timed_out: 0,
        }
    }
}

impl From<&NeighborConfig> for Adjacent {
    fn from(config: &NeighborConfig) -> Self {
        Adjacent::new(config.name.clone(), config.face_uri.clone(), config.link_cost)
    }
}

/// Neighbors of this router and their liveness as reported by the hello protocol.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyList {
    adjacents: Vec<Adjacent>,
}

impl AdjacencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(neighbors: &[NeighborConfig]) -> Self {
        Self {
            adjacents: neighbors.iter().map(Adjacent::from).collect(),
        }
    }

    /// Adds a neighbor; returns false if one with the same name exists.
    pub fn insert(&mut self, adjacent: Adjacent) -> bool {
        if self.find(&adjacent.name).is_some() {
            return false;
        }
        self.adjacents.push(adjacent);
        true
    }

    pub fn find(&self, name: &Name) -> Option<&Adjacent> {
        self.adjacents.iter().find(|a| &a.name == name)
    }

    pub fn find_mut(&mut self, name: &Name) -> Option<&mut Adjacent> {
        self.adjacents.iter_mut().find(|a| &a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Adjacent> {
        self.adjacents.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Adjacent> {
        self.adjacents
            .iter()
            .filter(|a| a.status == AdjacencyStatus::Active)
    }

    pub fn num_active_neighbors(&self) -> usize {
        self.active().count()
    }

    /// Records a liveness change. Returns true if the status actually changed.
    pub fn set_status(&mut self, name: &Name, status: AdjacencyStatus) -> bool {
        match self.find_mut(name) {
            Some(adjacent) if adjacent.status != status => {
                adjacent.status = status;
                if status == AdjacencyStatus::Active {
                    adjacent.interest_timed_out = 0;
                }
                true
            }
            _ => false,
        }
    }

    /// An adjacency LSA can be built once every neighbor is either active or has
    /// exhausted its hello retries.
    pub fn is_adj_lsa_buildable(&self, retry_limit: u32) -> bool {
        self.adjacents.iter().all(|a| {
            a.status == AdjacencyStatus::Active || a.interest_timed_out >= retry_limit
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacent(name: &str, cost: f64) -> Adjacent {
        Adjacent::new(name.parse().unwrap(), format!("udp:/{}", name), cost)
    }

    #[test]
    fn counts_active_neighbors() {
        let mut list = AdjacencyList::new();
        assert!(list.insert(adjacent("/ndn/b", 5.0)));
        assert!(list.insert(adjacent("/ndn/c", 7.0)));
        assert!(!list.insert(adjacent("/ndn/c", 9.0)));
        assert_eq!(list.num_active_neighbors(), 2);

        let c: Name = "/ndn/c".parse().unwrap();
        assert!(list.set_status(&c, AdjacencyStatus::Inactive));
        assert!(!list.set_status(&c, AdjacencyStatus::Inactive));
        assert_eq!(list.num_active_neighbors(), 1);
    }

    #[test]
    fn buildable_waits_for_retry_exhaustion() {
        let mut list = AdjacencyList::new();
        list.insert(adjacent("/ndn/b", 5.0));
        let b: Name = "/ndn/b".parse().unwrap();
        list.set_status(&b, AdjacencyStatus::Inactive);
        assert!(!list.is_adj_lsa_buildable(3));

        list.find_mut(&b).unwrap().interest_timed_out = 3;
        assert!(list.is_adj_lsa_buildable(3));
    }
}
