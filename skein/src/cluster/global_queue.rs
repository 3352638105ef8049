use crate::cluster::Registry;
use crate::handler::in_handler;
use crate::task::Task;
use crate::topology::NodeId;
use crate::transport::GlobalQueue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

/// In-process, bounded [`GlobalQueue`]. A push is all-or-nothing: a chunk that
/// does not fit is refused whole. Pulls complete inline.
#[derive(Debug)]
pub struct InMemoryGlobalQueue {
    registry: Arc<Registry>,
    capacity: usize,
    tasks: Mutex<VecDeque<Task>>,
}

impl InMemoryGlobalQueue {
    pub fn new(registry: Arc<Registry>, capacity: usize) -> Self {
        Self {
            registry,
            capacity,
            tasks: Mutex::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl GlobalQueue for InMemoryGlobalQueue {
    fn push(&self, _from: NodeId, chunk: Vec<Task>) -> Result<(), Vec<Task>> {
        let mut tasks = self.tasks.lock();

        if tasks.len() + chunk.len() > self.capacity {
            return Err(chunk);
        }

        tasks.extend(chunk);
        Ok(())
    }

    fn pull(&self, requester: NodeId, max: usize) {
        let Some(manager) = self.registry.get(requester) else {
            warn!(%requester, "globalq pull from unknown node");
            return;
        };

        let chunk = {
            let mut tasks = self.tasks.lock();
            let n = max.min(tasks.len());
            tasks.drain(..n).collect::<Vec<_>>()
        };

        in_handler(|| manager.complete_pull(chunk));
    }
}
