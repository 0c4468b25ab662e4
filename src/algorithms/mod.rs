//! Routing table calculators.

pub mod dijkstra;
pub mod hyperbolic;
pub mod map;

pub use dijkstra::{CostMatrix, ShortestPaths, calculate_link_state_routes, calculate_shortest_paths};
pub use hyperbolic::{Coordinate, calculate_hyperbolic_routes, hyperbolic_distance};
pub use map::RouterMap;
