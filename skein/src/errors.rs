use crate::topology::NodeId;

/// Errors surfaced by the task manager lifecycle and configuration. Balancing
/// failures are never reported through this type, they only show up in the
/// statistics.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskManagerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("task manager is already initialized")]
    AlreadyInitialized,

    #[error("task manager must be initialized first")]
    NotInitialized,

    #[error("task manager is already active")]
    AlreadyActive,

    #[error("node {0} cannot be its own neighbor")]
    SelfNeighbor(NodeId),

    #[error("node {0} appears more than once in the neighbor list")]
    DuplicateNeighbor(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}
