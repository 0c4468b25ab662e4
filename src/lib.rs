pub mod adjacency;
pub mod algorithms;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lsa;
pub mod name;
pub mod name_prefix_table;
pub mod protocol;
pub mod router;
pub mod scheduler;
pub mod transport;
pub mod tuning;

#[cfg(test)]
mod test_support;

pub use adjacency::{AdjacencyList, AdjacencyStatus, Adjacent};
pub use config::{HyperbolicState, LinkCostPolicy, RouterConfig};
pub use error::{Error, Result};
pub use fetch::{FetchError, FetchRequest, FetchResponse, LsaFetcher, LsaValidator};
pub use lsa::{AdjLsa, CoordinateLsa, LsaType, NameLsa};
pub use name::Name;
pub use router::{InstanceId, Router};
