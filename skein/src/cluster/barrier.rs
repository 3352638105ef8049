use crate::cluster::Registry;
use crate::handler::in_handler;
use crate::topology::NodeId;
use crate::transport::TerminationDetector;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct BarrierState {
    entered: HashSet<NodeId>,
    cancellations: u64,
    terminated: bool,
}

/// In-process [`TerminationDetector`]. Termination is declared the moment all
/// `num_nodes` nodes are in the barrier at once; any cancel takes the node
/// back out of the current round.
#[derive(Debug)]
pub struct CountingBarrier {
    registry: Arc<Registry>,
    num_nodes: usize,
    state: Mutex<BarrierState>,
}

impl CountingBarrier {
    pub fn new(registry: Arc<Registry>, num_nodes: usize) -> Self {
        Self {
            registry,
            num_nodes,
            state: Mutex::new(BarrierState::default()),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    pub fn num_entered(&self) -> usize {
        self.state.lock().entered.len()
    }

    pub fn cancellations(&self) -> u64 {
        self.state.lock().cancellations
    }
}

impl TerminationDetector for CountingBarrier {
    fn enter(&self, node: NodeId) {
        let terminated = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }

            state.entered.insert(node);
            state.terminated = state.entered.len() == self.num_nodes;
            state.terminated
        };

        if terminated {
            debug!(nodes = self.num_nodes, "all nodes in barrier, terminating");
            // State lock released: managers are notified without holding it.
            for manager in self.registry.all() {
                in_handler(|| manager.confirm_termination());
            }
        }
    }

    fn cancel(&self, node: NodeId) {
        let mut state = self.state.lock();

        if state.terminated {
            warn!(%node, "barrier cancel after termination");
            return;
        }

        if state.entered.remove(&node) {
            state.cancellations += 1;
        }
    }
}
