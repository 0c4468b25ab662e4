use log::debug;
use std::collections::HashMap;

use crate::lsa::{AdjLsa, CoordinateLsa};
use crate::name::Name;

/// Bijection between router names and dense matrix indices, rebuilt for every
/// calculation.
#[derive(Debug, Clone, Default)]
pub struct RouterMap {
    names: Vec<Name>,
    indices: HashMap<Name, usize>,
}

impl RouterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every origin router and every router it lists as adjacent.
    pub fn from_adj_lsas<'a>(lsas: impl IntoIterator<Item = &'a AdjLsa>) -> Self {
        let mut map = Self::new();
        for lsa in lsas {
            map.add(&lsa.origin_router);
            for adjacent in &lsa.adjacents {
                map.add(&adjacent.name);
            }
        }
        map
    }

    pub fn from_coordinate_lsas<'a>(lsas: impl IntoIterator<Item = &'a CoordinateLsa>) -> Self {
        let mut map = Self::new();
        for lsa in lsas {
            map.add(&lsa.origin_router);
        }
        map
    }

    /// Returns the index of `name`, assigning the next free one if it is new.
    pub fn add(&mut self, name: &Name) -> usize {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.clone());
        self.indices.insert(name.clone(), index);
        index
    }

    pub fn index_of(&self, name: &Name) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn name_of(&self, index: usize) -> Option<&Name> {
        self.names.get(index)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Name)> {
        self.names.iter().enumerate()
    }

    pub fn write_log(&self) {
        debug!("---------------Map----------------------");
        for (index, name) in self.iter() {
            debug!("{} -> {}", index, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::Adjacent;
    use chrono::Utc;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn indices_follow_discovery_order() {
        let now = Utc::now();
        let b = Adjacent::new(name("/ndn/b"), "udp://b", 5.0);
        let c = Adjacent::new(name("/ndn/c"), "udp://c", 7.0);
        let a_lsa = AdjLsa::new(name("/ndn/a"), 1, now, [&b, &c]);
        let a = Adjacent::new(name("/ndn/a"), "udp://a", 5.0);
        let b_lsa = AdjLsa::new(name("/ndn/b"), 1, now, [&a]);

        let map = RouterMap::from_adj_lsas([&a_lsa, &b_lsa]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.index_of(&name("/ndn/a")), Some(0));
        assert_eq!(map.index_of(&name("/ndn/c")), Some(2));
        assert_eq!(map.name_of(1), Some(&name("/ndn/b")));
        assert_eq!(map.index_of(&name("/ndn/d")), None);
    }
}
