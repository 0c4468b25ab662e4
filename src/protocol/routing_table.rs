use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::HyperbolicState;
use crate::name::Name;
use crate::scheduler::{Event, EventScheduler};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextHop {
    pub face_uri: String,
    pub route_cost: f64,
}

impl NextHop {
    pub fn new(face_uri: impl Into<String>, route_cost: f64) -> Self {
        Self {
            face_uri: face_uri.into(),
            route_cost,
        }
    }
}

impl PartialEq for NextHop {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NextHop {}

impl Ord for NextHop {
    fn cmp(&self, other: &Self) -> Ordering {
        self.route_cost
            .total_cmp(&other.route_cost)
            .then_with(|| self.face_uri.cmp(&other.face_uri))
    }
}

impl PartialOrd for NextHop {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Next hops towards one destination, at most one per face, cheapest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NexthopList {
    next_hops: Vec<NextHop>,
}

impl NexthopList {
    /// Adds a next hop; a face already present keeps the lower cost.
    pub fn add_next_hop(&mut self, next_hop: NextHop) {
        match self
            .next_hops
            .iter_mut()
            .find(|nh| nh.face_uri == next_hop.face_uri)
        {
            Some(existing) => {
                if next_hop.route_cost < existing.route_cost {
                    existing.route_cost = next_hop.route_cost;
                }
            }
            None => self.next_hops.push(next_hop),
        }
        self.next_hops.sort();
    }

    pub fn iter(&self) -> impl Iterator<Item = &NextHop> {
        self.next_hops.iter()
    }

    pub fn len(&self) -> usize {
        self.next_hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_hops.is_empty()
    }

    pub fn cost_for(&self, face_uri: &str) -> Option<f64> {
        self.next_hops
            .iter()
            .find(|nh| nh.face_uri == face_uri)
            .map(|nh| nh.route_cost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingTableEntry {
    pub destination: Name,
    pub next_hops: NexthopList,
}

/// Computed next hops per destination router, plus the hyperbolic dry-run table.
#[derive(Debug, Default)]
pub struct RoutingTable {
    entries: BTreeMap<Name, RoutingTableEntry>,
    dry_entries: BTreeMap<Name, RoutingTableEntry>,
    is_calculating: bool,
    is_scheduled: bool,
    /// A calculation was skipped while an adjacency LSA build was pending.
    deferred: bool,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_next_hop(&mut self, destination: &Name, next_hop: NextHop) {
        debug!("Adding {:?} for destination: {}", next_hop, destination);
        Self::insert(&mut self.entries, destination, next_hop);
    }

    pub fn add_next_hop_to_dry_table(&mut self, destination: &Name, next_hop: NextHop) {
        debug!("Adding {:?} to dry table for destination: {}", next_hop, destination);
        Self::insert(&mut self.dry_entries, destination, next_hop);
    }

    fn insert(table: &mut BTreeMap<Name, RoutingTableEntry>, destination: &Name, next_hop: NextHop) {
        table
            .entry(destination.clone())
            .or_insert_with(|| RoutingTableEntry {
                destination: destination.clone(),
                next_hops: NexthopList::default(),
            })
            .next_hops
            .add_next_hop(next_hop);
    }

    pub fn find_routing_table_entry(&self, destination: &Name) -> Option<&RoutingTableEntry> {
        self.entries.get(destination)
    }

    pub fn find_dry_entry(&self, destination: &Name) -> Option<&RoutingTableEntry> {
        self.dry_entries.get(destination)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn clear_dry(&mut self) {
        self.dry_entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutingTableEntry> {
        self.entries.values()
    }

    pub fn dry_iter(&self) -> impl Iterator<Item = &RoutingTableEntry> {
        self.dry_entries.values()
    }

    /// Schedules one calculation after `interval` unless one is already pending,
    /// so bursts of LSDB changes coalesce.
    pub fn schedule_calculation(&mut self, scheduler: &mut EventScheduler, interval: Duration) {
        if !self.is_scheduled {
            debug!("Scheduling routing table calculation in {:?}", interval);
            scheduler.schedule(interval, Event::CalculateRoutingTable);
            self.is_scheduled = true;
        }
    }

    pub fn is_calculation_scheduled(&self) -> bool {
        self.is_scheduled
    }

    pub fn is_calculating(&self) -> bool {
        self.is_calculating
    }

    /// Marks the table busy. Returns false if a calculation is already running.
    pub(crate) fn begin_calculation(&mut self) -> bool {
        if self.is_calculating {
            return false;
        }
        self.is_calculating = true;
        true
    }

    pub(crate) fn defer_calculation(&mut self) {
        self.deferred = true;
    }

    /// Returns whether a skipped calculation is owed, clearing the mark.
    pub(crate) fn take_deferred(&mut self) -> bool {
        std::mem::take(&mut self.deferred)
    }

    pub fn is_calculation_deferred(&self) -> bool {
        self.deferred
    }

    pub(crate) fn finish_calculation(&mut self) {
        self.is_scheduled = false;
        self.is_calculating = false;
    }

    pub fn write_log(&self, state: HyperbolicState) {
        debug!("---------------Routing Table------------------");
        for entry in self.entries.values() {
            debug!("Destination: {}", entry.destination);
            for nh in entry.next_hops.iter() {
                debug!("  NextHop(Uri: {}, Cost: {})", nh.face_uri, nh.route_cost);
            }
        }
        if state == HyperbolicState::DryRun {
            debug!("--------Hyperbolic Routing Table(Dry)---------");
            for entry in self.dry_entries.values() {
                debug!("Destination: {}", entry.destination);
                for nh in entry.next_hops.iter() {
                    debug!("  NextHop(Uri: {}, Cost: {})", nh.face_uri, nh.route_cost);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn same_face_keeps_lower_cost() {
        let mut list = NexthopList::default();
        list.add_next_hop(NextHop::new("udp://b", 10.0));
        list.add_next_hop(NextHop::new("udp://c", 7.0));
        list.add_next_hop(NextHop::new("udp://b", 5.0));
        list.add_next_hop(NextHop::new("udp://b", 12.0));

        assert_eq!(list.len(), 2);
        assert_eq!(list.cost_for("udp://b"), Some(5.0));
        let faces: Vec<_> = list.iter().map(|nh| nh.face_uri.as_str()).collect();
        assert_eq!(faces, vec!["udp://b", "udp://c"]);
    }

    #[test]
    fn entries_and_dry_entries_are_separate() {
        let mut table = RoutingTable::new();
        let dest = name("/ndn/b");
        table.add_next_hop(&dest, NextHop::new("udp://b", 5.0));
        table.add_next_hop_to_dry_table(&dest, NextHop::new("udp://c", 0.7));

        assert_eq!(table.find_routing_table_entry(&dest).unwrap().next_hops.len(), 1);
        assert_eq!(table.find_dry_entry(&dest).unwrap().next_hops.cost_for("udp://c"), Some(0.7));
        table.clear();
        assert!(table.find_routing_table_entry(&dest).is_none());
        assert!(table.find_dry_entry(&dest).is_some());
    }

    #[test]
    fn scheduling_coalesces() {
        let mut table = RoutingTable::new();
        let mut scheduler = EventScheduler::new(Utc::now());
        table.schedule_calculation(&mut scheduler, Duration::from_secs(15));
        table.schedule_calculation(&mut scheduler, Duration::from_secs(15));
        assert_eq!(scheduler.len(), 1);

        assert!(table.begin_calculation());
        assert!(!table.begin_calculation());
        table.finish_calculation();
        table.schedule_calculation(&mut scheduler, Duration::from_secs(15));
        assert_eq!(scheduler.len(), 2);
    }
}
