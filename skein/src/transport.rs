//! Seams to the collaborators the task manager talks to but does not own: the
//! active-message network, the cluster-wide global queue and the distributed
//! termination detector.
//!
//! All requests are fire-and-forget. Whoever implements a trait is
//! responsible for eventually delivering the matching completion back to the
//! originating [`TaskManager`](crate::TaskManager), wrapped in
//! [`in_handler`](crate::handler::in_handler):
//!
//! | request | completion on the requester |
//! |---|---|
//! | [`Network::request_steal`] | [`TaskManager::complete_steal`](crate::TaskManager::complete_steal) |
//! | [`Network::send_share`] | [`TaskManager::complete_share`](crate::TaskManager::complete_share) |
//! | [`GlobalQueue::pull`] | [`TaskManager::complete_pull`](crate::TaskManager::complete_pull) |
//! | [`TerminationDetector::enter`] | [`TaskManager::confirm_termination`](crate::TaskManager::confirm_termination) |
//!
//! Completions may be delivered inline, from inside the request call. The task
//! manager holds no lock across these calls, except its own barrier flag
//! around [`TerminationDetector::enter`] and [`TerminationDetector::cancel`]:
//! a detector may call `confirm_termination` from there, but nothing else on
//! the task manager.

use crate::task::Task;
use crate::topology::NodeId;
use std::fmt;

/// Steal request sent by a thief to its victim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealRequest {
    pub thief: NodeId,
    pub victim: NodeId,
    /// Upper bound on the number of tasks to hand over.
    pub max: usize,
}

/// A work-share proposal from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareMessage {
    /// The initiator is overloaded and gives away tasks.
    Give {
        from: NodeId,
        to: NodeId,
        tasks: Vec<Task>,
    },

    /// The initiator is underloaded and asks for up to `amount` tasks.
    Ask {
        from: NodeId,
        to: NodeId,
        amount: usize,
    },
}

impl ShareMessage {
    pub fn from(&self) -> NodeId {
        match self {
            ShareMessage::Give { from, .. } | ShareMessage::Ask { from, .. } => *from,
        }
    }

    pub fn to(&self) -> NodeId {
        match self {
            ShareMessage::Give { to, .. } | ShareMessage::Ask { to, .. } => *to,
        }
    }
}

/// Outcome of a work-share, delivered back to the initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareReply {
    /// The peer took `count` given tasks.
    Accepted { count: usize },

    /// The peer refused the given tasks, they come back untouched.
    Refused { tasks: Vec<Task> },

    /// The peer answered an `Ask` with these tasks (possibly none).
    Delivered { tasks: Vec<Task> },

    /// The peer could not be reached. A `Give` gets its tasks back.
    Unreachable { tasks: Vec<Task> },
}

/// Active-message transport between nodes.
pub trait Network: Send + Sync + fmt::Debug {
    /// Ask `req.victim` for up to `req.max` tasks from its public queue.
    fn request_steal(&self, req: StealRequest);

    /// Deliver a work-share proposal to `msg.to()`.
    fn send_share(&self, msg: ShareMessage);

    /// Last known public-queue occupancy of `node`. This is the load signal
    /// used by work-sharing; `None` when nothing is known.
    fn load_of(&self, node: NodeId) -> Option<usize>;
}

/// The cluster-wide global task queue.
pub trait GlobalQueue: Send + Sync + fmt::Debug {
    /// Push a chunk. On refusal the chunk is handed back.
    fn push(&self, from: NodeId, chunk: Vec<Task>) -> Result<(), Vec<Task>>;

    /// Start pulling up to `max` tasks for `requester`. The result, possibly
    /// empty, arrives later through `complete_pull`.
    fn pull(&self, requester: NodeId, max: usize);
}

/// Distributed termination detector ("cooperative barrier").
pub trait TerminationDetector: Send + Sync + fmt::Debug {
    /// `node` is locally exhausted and joins the current barrier round.
    fn enter(&self, node: NodeId);

    /// `node` received work and leaves the current round.
    fn cancel(&self, node: NodeId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_message_endpoints() {
        let give = ShareMessage::Give {
            from: NodeId(1),
            to: NodeId(2),
            tasks: vec![],
        };
        let ask = ShareMessage::Ask {
            from: NodeId(3),
            to: NodeId(4),
            amount: 2,
        };

        assert_eq!((give.from(), give.to()), (NodeId(1), NodeId(2)));
        assert_eq!((ask.from(), ask.to()), (NodeId(3), NodeId(4)));
    }
}
