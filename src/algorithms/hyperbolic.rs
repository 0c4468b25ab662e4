use log::{debug, warn};
use std::f64::consts::PI;

use super::map::RouterMap;
use crate::adjacency::AdjacencyList;
use crate::name::Name;
use crate::protocol::routing_table::{NextHop, RoutingTable};

const EPSILON: f64 = 1e-9;

/// Polar coordinates of a router in the hyperbolic plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub radius: f64,
    pub angle: f64,
}

impl Coordinate {
    pub fn new(radius: f64, angle: f64) -> Self {
        Self { radius, angle }
    }
}

/// Hyperbolic distance between two points given in polar coordinates.
pub fn hyperbolic_distance(from: Coordinate, to: Coordinate) -> f64 {
    let delta = PI - (PI - (from.angle - to.angle).abs()).abs();
    let arg = from.radius.cosh() * to.radius.cosh()
        - from.radius.sinh() * to.radius.sinh() * delta.cos();
    arg.max(1.0).acosh()
}

/// Greedy hyperbolic routing: for every destination, installs the active
/// neighbors closest to it. A neighbor reaches itself at cost 0. With `dry_run`
/// the routes go to the dry table.
pub fn calculate_hyperbolic_routes(
    map: &RouterMap,
    coordinates: impl Fn(&Name) -> Option<Coordinate>,
    this_router: &Name,
    adjacencies: &AdjacencyList,
    dry_run: bool,
    routing_table: &mut RoutingTable,
) {
    map.write_log();
    let neighbors: Vec<_> = adjacencies
        .active()
        .filter(|a| a.name != *this_router && map.index_of(&a.name).is_some())
        .collect();
    if neighbors.is_empty() {
        debug!("No active neighbors in the map, no hyperbolic routes");
        return;
    }

    for (_, dest) in map.iter() {
        if dest == this_router {
            continue;
        }
        let dest_coordinate = coordinates(dest);

        let mut candidates: Vec<(&str, f64)> = Vec::new();
        for neighbor in &neighbors {
            let distance = if neighbor.name == *dest {
                0.0
            } else {
                match (coordinates(&neighbor.name), dest_coordinate) {
                    (Some(from), Some(to)) => hyperbolic_distance(from, to),
                    _ => continue,
                }
            };
            candidates.push((neighbor.face_uri.as_str(), distance));
        }

        let Some(best) = candidates.iter().map(|(_, d)| *d).min_by(f64::total_cmp) else {
            warn!("No coordinates to estimate a route to {}", dest);
            continue;
        };
        for (face_uri, distance) in candidates {
            if distance - best > EPSILON {
                continue;
            }
            let next_hop = NextHop::new(face_uri, distance);
            if dry_run {
                routing_table.add_next_hop_to_dry_table(dest, next_hop);
            } else {
                routing_table.add_next_hop(dest, next_hop);
            }
        }
    }
}
