//! In-process implementations of the collaborator seams, and a [`Cluster`]
//! that wires several task managers together inside one process.
//!
//! Everything here is synchronous: messages are delivered inline on the
//! sending thread, wrapped in [`in_handler`](crate::handler::in_handler).

use crate::TaskManager;
use crate::errors::TaskManagerError;
use crate::manager::Builder;
use crate::topology::NodeId;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use std::thread;
use tracing::debug;

mod barrier;
pub use barrier::CountingBarrier;

mod global_queue;
pub use global_queue::InMemoryGlobalQueue;

mod network;
pub use network::LoopbackNetwork;

mod registry;
pub use registry::Registry;


/// Several task managers sharing one [`Registry`], one loopback network, one
/// global queue and one termination barrier.
#[derive(Debug)]
pub struct Cluster {
    nodes: Vec<Arc<TaskManager>>,
    registry: Arc<Registry>,
    global_queue: Arc<InMemoryGlobalQueue>,
    barrier: Arc<CountingBarrier>,
}

impl Cluster {
    /// Builds `num_nodes` active task managers, every node a neighbor of
    /// every other one.
    pub fn try_build(builder: Builder, num_nodes: usize) -> Result<Self> {
        let ids = (0..num_nodes).map(node_id).collect::<Result<Vec<_>>>()?;

        let neighbors: Vec<Vec<NodeId>> = ids
            .iter()
            .map(|me| ids.iter().copied().filter(|n| n != me).collect())
            .collect();

        Self::try_build_with_neighbors(builder, neighbors)
    }

    /// Builds one active task manager per entry of `neighbors`. Node `i` gets
    /// id `i` and steals from/shares with `neighbors[i]`.
    pub fn try_build_with_neighbors(builder: Builder, neighbors: Vec<Vec<NodeId>>) -> Result<Self> {
        let num_nodes = neighbors.len();
        if num_nodes == 0 {
            return Err(TaskManagerError::InvalidConfig("a cluster needs at least one node").into());
        }

        let registry = Arc::new(Registry::new());
        let network = Arc::new(LoopbackNetwork::new(Arc::clone(&registry)));
        let global_queue = Arc::new(InMemoryGlobalQueue::new(Arc::clone(&registry), usize::MAX));
        let barrier = Arc::new(CountingBarrier::new(Arc::clone(&registry), num_nodes));

        let nodes = neighbors
            .into_iter()
            .enumerate()
            .map(|(i, peers)| -> Result<Arc<TaskManager>> {
                if let Some(unknown) = peers.iter().find(|p| p.as_usize() >= num_nodes) {
                    return Err(TaskManagerError::UnknownNode(*unknown).into());
                }

                let tm = Arc::new(builder.clone().try_build(
                    network.clone(),
                    global_queue.clone(),
                    barrier.clone(),
                )?);
                tm.init(node_id(i)?, peers, num_nodes)?;
                registry.register(&tm);
                Ok(tm)
            })
            .collect::<Result<Vec<_>>>()?;

        // Only start once every peer is reachable.
        for tm in &nodes {
            tm.activate()?;
        }

        debug!(num_nodes, "cluster ready");
        Ok(Self {
            nodes,
            registry,
            global_queue,
            barrier,
        })
    }

    #[track_caller]
    pub fn node(&self, idx: usize) -> &Arc<TaskManager> {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[Arc<TaskManager>] {
        &self.nodes
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn global_queue(&self) -> &Arc<InMemoryGlobalQueue> {
        &self.global_queue
    }

    pub fn barrier(&self) -> &Arc<CountingBarrier> {
        &self.barrier
    }

    /// Runs `workers` threads per node, each executing tasks until global
    /// termination. Returns once every thread exited.
    pub fn run(&self) -> Result<()> {
        let handles = self
            .nodes
            .iter()
            .flat_map(|tm| (0..tm.config().workers).map(move |i| (tm, i)))
            .map(|(tm, i)| spawn_worker_thread(Arc::clone(tm), i))
            .collect::<Result<Vec<_>>>()?;

        let num_panicked = handles
            .into_iter()
            .filter_map(|handle| handle.join().err())
            .count();

        if num_panicked == 0 {
            Ok(())
        } else {
            Err(anyhow!("{num_panicked} worker thread(s) panicked"))
        }
    }
}

fn spawn_worker_thread(tm: Arc<TaskManager>, idx: usize) -> Result<thread::JoinHandle<()>> {
    let name = format!("skein-{}-{idx}", tm.local_id());

    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            while let Some(task) = tm.get_work() {
                task.execute();
            }
            debug!(node = %tm.local_id(), worker = idx, "worker exiting");
        })
        .with_context(|| format!("failed to spawn worker thread {name}"))
}

fn node_id(idx: usize) -> Result<NodeId> {
    u16::try_from(idx)
        .map(NodeId)
        .map_err(|_| TaskManagerError::InvalidConfig("too many nodes").into())
}
