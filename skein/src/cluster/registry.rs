use crate::TaskManager;
use crate::topology::NodeId;
use dashmap::DashMap;
use std::sync::{Arc, Weak};

/// Directory of the task managers reachable in this process. Holds weak
/// references so collaborators owned by the managers don't keep them alive.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: DashMap<NodeId, Weak<TaskManager>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an initialized task manager under its node id, replacing any
    /// previous entry.
    pub fn register(&self, manager: &Arc<TaskManager>) {
        self.nodes
            .insert(manager.local_id(), Arc::downgrade(manager));
    }

    pub fn get(&self, id: NodeId) -> Option<Arc<TaskManager>> {
        // Upgrade outside of the shard guard: callers go on to call into the
        // manager, which may call back into the registry.
        let weak = self.nodes.get(&id).map(|w| w.value().clone())?;
        weak.upgrade()
    }

    pub fn all(&self) -> Vec<Arc<TaskManager>> {
        let weak = self
            .nodes
            .iter()
            .map(|e| e.value().clone())
            .collect::<Vec<_>>();

        weak.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
