use crate::task::Task;
use crate::topology::NodeId;
use crate::transport::{GlobalQueue, Network, ShareMessage, StealRequest, TerminationDetector};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records requests; the test delivers completions by hand.
#[derive(Debug, Default)]
pub(crate) struct SpyNetwork {
    steals: Mutex<Vec<StealRequest>>,
    shares: Mutex<Vec<ShareMessage>>,
    loads: Mutex<HashMap<NodeId, usize>>,
}

impl SpyNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn steal_requests(&self) -> Vec<StealRequest> {
        self.steals.lock().clone()
    }

    pub(crate) fn take_shares(&self) -> Vec<ShareMessage> {
        std::mem::take(&mut *self.shares.lock())
    }

    pub(crate) fn set_load(&self, node: NodeId, load: usize) {
        self.loads.lock().insert(node, load);
    }
}

impl Network for SpyNetwork {
    fn request_steal(&self, req: StealRequest) {
        self.steals.lock().push(req);
    }

    fn send_share(&self, msg: ShareMessage) {
        self.shares.lock().push(msg);
    }

    fn load_of(&self, node: NodeId) -> Option<usize> {
        self.loads.lock().get(&node).copied()
    }
}

#[derive(Debug, Default)]
pub(crate) struct SpyGlobalQueue {
    pushed: Mutex<Vec<Task>>,
    pulls: Mutex<Vec<(NodeId, usize)>>,
    refuse: AtomicBool,
}

impl SpyGlobalQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pushed(&self) -> Vec<Task> {
        self.pushed.lock().clone()
    }

    pub(crate) fn pulls(&self) -> Vec<(NodeId, usize)> {
        self.pulls.lock().clone()
    }

    pub(crate) fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }
}

impl GlobalQueue for SpyGlobalQueue {
    fn push(&self, _from: NodeId, chunk: Vec<Task>) -> Result<(), Vec<Task>> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(chunk);
        }
        self.pushed.lock().extend(chunk);
        Ok(())
    }

    fn pull(&self, requester: NodeId, max: usize) {
        self.pulls.lock().push((requester, max));
    }
}

#[derive(Debug, Default)]
pub(crate) struct SpyDetector {
    entered: Mutex<Vec<NodeId>>,
    cancelled: Mutex<Vec<NodeId>>,
}

impl SpyDetector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enters(&self) -> usize {
        self.entered.lock().len()
    }

    pub(crate) fn cancels(&self) -> usize {
        self.cancelled.lock().len()
    }
}

impl TerminationDetector for SpyDetector {
    fn enter(&self, node: NodeId) {
        self.entered.lock().push(node);
    }

    fn cancel(&self, node: NodeId) {
        self.cancelled.lock().push(node);
    }
}
