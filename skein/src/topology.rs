use crate::errors::TaskManagerError;
use std::collections::HashSet;
use std::fmt;

/// Identifier of a node in the cluster.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct NodeId(pub u16);

impl NodeId {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        NodeId(id)
    }
}

/// Where a node sits in the cluster. Bound once by `TaskManager::init` and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Machine-local id of this node.
    pub local_id: NodeId,

    /// Sibling nodes used as steal victims and share targets. Never contains
    /// `local_id`.
    pub neighbors: Vec<NodeId>,

    /// Number of nodes on the local machine.
    pub num_local_nodes: usize,
}

impl Topology {
    pub fn try_new(
        local_id: NodeId,
        neighbors: Vec<NodeId>,
        num_local_nodes: usize,
    ) -> Result<Self, TaskManagerError> {
        let mut seen = HashSet::with_capacity(neighbors.len());

        for n in &neighbors {
            if *n == local_id {
                return Err(TaskManagerError::SelfNeighbor(local_id));
            }
            if !seen.insert(*n) {
                return Err(TaskManagerError::DuplicateNeighbor(*n));
            }
        }

        if num_local_nodes == 0 {
            return Err(TaskManagerError::InvalidConfig(
                "num_local_nodes must be greater than 0",
            ));
        }

        Ok(Self {
            local_id,
            neighbors,
            num_local_nodes,
        })
    }

    pub fn has_neighbors(&self) -> bool {
        !self.neighbors.is_empty()
    }
}
