use log::debug;
use std::collections::BTreeMap;

use crate::name::Name;
use crate::protocol::routing_table::{NexthopList, RoutingTable};

/// One advertised name and the routers that advertise it.
#[derive(Debug, Clone, Default)]
pub struct NptEntry {
    /// Origin router to number of live registrations (name, adjacency and
    /// coordinate LSAs can each register the origin's own prefix).
    origins: BTreeMap<Name, usize>,
    pub next_hops: NexthopList,
}

impl NptEntry {
    pub fn origins(&self) -> impl Iterator<Item = &Name> {
        self.origins.keys()
    }
}

/// Name prefixes reachable through remote routers, the input of the FIB.
#[derive(Debug, Default)]
pub struct NamePrefixTable {
    entries: BTreeMap<Name, NptEntry>,
}

impl NamePrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, name: &Name, origin: &Name) {
        debug!("Adding origin {} for name prefix {}", origin, name);
        let entry = self.entries.entry(name.clone()).or_default();
        *entry.origins.entry(origin.clone()).or_insert(0) += 1;
    }

    pub fn remove_entry(&mut self, name: &Name, origin: &Name) {
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };
        if let Some(count) = entry.origins.get_mut(origin) {
            *count -= 1;
            if *count == 0 {
                debug!("Removing origin {} for name prefix {}", origin, name);
                entry.origins.remove(origin);
            }
        }
        if entry.origins.is_empty() {
            self.entries.remove(name);
        }
    }

    pub fn contains(&self, name: &Name, origin: &Name) -> bool {
        self.entries
            .get(name)
            .is_some_and(|e| e.origins.contains_key(origin))
    }

    pub fn get(&self, name: &Name) -> Option<&NptEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &NptEntry)> {
        self.entries.iter()
    }

    /// Recomputes each prefix's next hops from the routes to its origin routers.
    pub fn update_with_new_route(&mut self, routing_table: &RoutingTable) {
        for entry in self.entries.values_mut() {
            let mut next_hops = NexthopList::default();
            for origin in entry.origins.keys() {
                if let Some(route) = routing_table.find_routing_table_entry(origin) {
                    for nh in route.next_hops.iter() {
                        next_hops.add_next_hop(nh.clone());
                    }
                }
            }
            entry.next_hops = next_hops;
        }
    }

    pub fn write_log(&self) {
        debug!("----------------NPT----------------------");
        for (name, entry) in &self.entries {
            debug!(
                "Name: {} origins: {:?} next hops: {}",
                name,
                entry.origins.keys().map(ToString::to_string).collect::<Vec<_>>(),
                entry.next_hops.len()
            );
        }
    }
}
