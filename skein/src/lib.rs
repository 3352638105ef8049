//! Per-node task manager for a distributed task-parallel runtime.
//!
//! Every node owns one [`TaskManager`]. Local workers call
//! [`TaskManager::get_work`] in a loop; tasks come from the node's private
//! queue, its public queue, and, when both are empty, from neighbors (work
//! stealing and work-sharing) or from a cluster-wide global queue. `get_work`
//! only returns `None` once a distributed termination barrier confirmed that
//! no work is left anywhere.
//!
//! The network, the global queue and the termination detector are traits
//! (see [`transport`]). The [`cluster`] module implements them in-process.
//!
//! ```no_run
//! use skein::{Builder, Cluster};
//!
//! fn hello(a: u64, _: u64, _: u64) {
//!     println!("hello from task {a}");
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let cluster = Cluster::try_build(Builder::new().chunk_size(4), 3)?;
//! for i in 0..100 {
//!     cluster.node(0).spawn_public(hello, i, 0, 0);
//! }
//! cluster.run()?;
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub use cluster::{Cluster, CountingBarrier, InMemoryGlobalQueue, LoopbackNetwork, Registry};

pub mod errors;
pub use errors::TaskManagerError;

pub mod handler;
pub use handler::in_handler;

pub mod manager;
pub use manager::{Builder, Phase, TaskManager, TaskManagerConfig};

pub mod stats;
pub use stats::{StatsSnapshot, TaskManagerStatistics};

pub mod task;
pub use task::{Task, TaskFn, Word};

pub mod topology;
pub use topology::{NodeId, Topology};

pub mod transport;

mod utils;

#[cfg(test)]
mod test_utils;
