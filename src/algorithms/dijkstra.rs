use log::{debug, warn};
use std::collections::BTreeSet;

use super::map::RouterMap;
use crate::adjacency::AdjacencyList;
use crate::config::LinkCostPolicy;
use crate::lsa::AdjLsa;
use crate::name::Name;
use crate::protocol::routing_table::{NextHop, RoutingTable};

pub const INF: f64 = f64::INFINITY;

const EPSILON: f64 = 1e-9;

fn same_cost(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Dense `n x n` link-cost matrix. Unknown links cost [`INF`], the diagonal 0.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    n: usize,
    costs: Vec<f64>,
}

impl CostMatrix {
    pub fn new(n: usize) -> Self {
        let mut costs = vec![INF; n * n];
        for i in 0..n {
            costs[i * n + i] = 0.0;
        }
        Self { n, costs }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        let mut matrix = Self::new(n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &cost) in row.iter().enumerate().take(n) {
                matrix.set(i, j, cost);
            }
        }
        matrix
    }

    /// One row per origin router, filled from the links its LSA advertises.
    pub fn from_adj_lsas<'a>(
        map: &RouterMap,
        lsas: impl IntoIterator<Item = &'a AdjLsa>,
        policy: LinkCostPolicy,
    ) -> Self {
        let mut matrix = Self::new(map.len());
        for lsa in lsas {
            let Some(row) = map.index_of(&lsa.origin_router) else {
                continue;
            };
            for adjacent in &lsa.adjacents {
                if let Some(col) = map.index_of(&adjacent.name) {
                    if row != col {
                        matrix.set(row, col, adjacent.link_cost);
                    }
                }
            }
        }
        matrix.apply_policy(policy);
        matrix
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.costs[from * self.n + to]
    }

    pub fn set(&mut self, from: usize, to: usize, cost: f64) {
        self.costs[from * self.n + to] = cost;
    }

    /// Reconciles links whose two directions advertise different costs. Links
    /// known in one direction only are left as they are.
    pub fn apply_policy(&mut self, policy: LinkCostPolicy) {
        if policy == LinkCostPolicy::AsGiven {
            return;
        }
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                let (to, from) = (self.get(i, j), self.get(j, i));
                if to.is_infinite() || from.is_infinite() || to == from {
                    continue;
                }
                let cost = match policy {
                    LinkCostPolicy::Max => to.max(from),
                    LinkCostPolicy::Min => to.min(from),
                    LinkCostPolicy::AsGiven => continue,
                };
                debug!("Link {} <-> {}: costs {} and {} reconciled to {}", i, j, to, from, cost);
                self.set(i, j, cost);
                self.set(j, i, cost);
            }
        }
    }

    pub fn write_log(&self) {
        debug!("-----------Cost Matrix-----------");
        for i in 0..self.n {
            let row: Vec<String> = (0..self.n).map(|j| format!("{}", self.get(i, j))).collect();
            debug!("{}: {}", i, row.join(" "));
        }
    }
}

/// Single-source shortest paths over a [`CostMatrix`].
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    pub source: usize,
    pub distance: Vec<f64>,
    /// Predecessor on the first shortest path found.
    pub parent: Vec<Option<usize>>,
    /// Every neighbor of the source that starts a shortest path.
    pub first_hops: Vec<BTreeSet<usize>>,
}

/// O(n^2) Dijkstra. Among equally distant candidates the lowest index is
/// settled first.
pub fn calculate_shortest_paths(matrix: &CostMatrix, source: usize) -> ShortestPaths {
    let n = matrix.len();
    let mut distance = vec![INF; n];
    let mut parent = vec![None; n];
    let mut visited = vec![false; n];
    let mut settle_order = Vec::with_capacity(n);
    if source < n {
        distance[source] = 0.0;
    }

    loop {
        let mut next: Option<usize> = None;
        for v in 0..n {
            if visited[v] || distance[v].is_infinite() {
                continue;
            }
            if next.is_none_or(|u| distance[v] < distance[u]) {
                next = Some(v);
            }
        }
        let Some(u) = next else {
            break;
        };
        visited[u] = true;
        settle_order.push(u);

        for v in 0..n {
            let w = matrix.get(u, v);
            if visited[v] || w.is_infinite() {
                continue;
            }
            let candidate = distance[u] + w;
            if candidate < distance[v] {
                distance[v] = candidate;
                parent[v] = Some(u);
            }
        }
    }

    let first_hops = collect_first_hops(matrix, source, &distance, &settle_order);
    ShortestPaths {
        source,
        distance,
        parent,
        first_hops,
    }
}

/// For each node `v`, every node `u` settled before it on a shortest path
/// (`distance[u] + w(u, v) == distance[v]`) contributes its first hops, or `v`
/// itself when `u` is the source.
fn collect_first_hops(
    matrix: &CostMatrix,
    source: usize,
    distance: &[f64],
    settle_order: &[usize],
) -> Vec<BTreeSet<usize>> {
    let mut first_hops = vec![BTreeSet::new(); distance.len()];
    for (position, &v) in settle_order.iter().enumerate() {
        if v == source {
            continue;
        }
        let mut hops = BTreeSet::new();
        for &u in &settle_order[..position] {
            let w = matrix.get(u, v);
            if w.is_infinite() || !same_cost(distance[u] + w, distance[v]) {
                continue;
            }
            if u == source {
                hops.insert(v);
            } else {
                hops.extend(first_hops[u].iter().copied());
            }
        }
        first_hops[v] = hops;
    }
    first_hops
}

impl ShortestPaths {
    pub fn is_reachable(&self, node: usize) -> bool {
        self.distance.get(node).is_some_and(|d| d.is_finite())
    }

    /// Nodes on the recorded path from `dest` back to the source, both ends
    /// included. `None` if `dest` is unreachable.
    pub fn path_to(&self, dest: usize) -> Option<Vec<usize>> {
        if !self.is_reachable(dest) {
            return None;
        }
        let mut path = vec![dest];
        let mut current = dest;
        while let Some(prev) = self.parent[current] {
            path.push(prev);
            current = prev;
        }
        Some(path)
    }

    /// Fraction of shortest paths from the source to every other node that
    /// pass through each node, endpoints counted.
    pub fn centrality(&self) -> Vec<f64> {
        let n = self.distance.len();
        let mut occurrences = vec![0usize; n];
        for dest in (0..n).filter(|&d| d != self.source) {
            if let Some(path) = self.path_to(dest) {
                for node in path {
                    occurrences[node] += 1;
                }
            }
        }
        let others = n.saturating_sub(1).max(1) as f64;
        occurrences.into_iter().map(|c| c as f64 / others).collect()
    }
}

/// Installs link-state routes from this router to every reachable router in
/// the adjacency LSDB.
pub fn calculate_link_state_routes<'a>(
    map: &RouterMap,
    lsas: impl IntoIterator<Item = &'a AdjLsa>,
    this_router: &Name,
    adjacencies: &AdjacencyList,
    policy: LinkCostPolicy,
    routing_table: &mut RoutingTable,
) {
    let Some(source) = map.index_of(this_router) else {
        warn!("{} is not in the adjacency map, no link-state routes", this_router);
        return;
    };
    let matrix = CostMatrix::from_adj_lsas(map, lsas, policy);
    map.write_log();
    matrix.write_log();

    let paths = calculate_shortest_paths(&matrix, source);
    for (dest, dest_name) in map.iter() {
        if dest == source || !paths.is_reachable(dest) {
            continue;
        }
        for &hop in &paths.first_hops[dest] {
            let Some(hop_name) = map.name_of(hop) else {
                continue;
            };
            match adjacencies.find(hop_name) {
                Some(adjacent) => routing_table.add_next_hop(
                    dest_name,
                    NextHop::new(adjacent.face_uri.clone(), paths.distance[dest]),
                ),
                None => warn!("No face to first hop {} towards {}", hop_name, dest_name),
            }
        }
    }
}
