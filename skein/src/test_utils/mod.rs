use crate::manager::Builder;
use crate::task::{Task, Word};
use crate::topology::NodeId;
use crate::TaskManager;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) mod mocks;
pub(crate) use mocks::{SpyDetector, SpyGlobalQueue, SpyNetwork};

/// Records the arguments of every call to an entry function. Meant to live in
/// a `static`, one per test.
#[derive(Debug)]
pub(crate) struct Recorder {
    calls: Mutex<Vec<(Word, Word, Word)>>,
}

impl Recorder {
    pub(crate) const fn new() -> Self {
        Self {
            calls: parking_lot::const_mutex(Vec::new()),
        }
    }

    pub(crate) fn record(&self, a0: Word, a1: Word, a2: Word) {
        self.calls.lock().push((a0, a1, a2));
    }

    pub(crate) fn calls(&self) -> Vec<(Word, Word, Word)> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

pub(crate) fn noop_entry(_: Word, _: Word, _: Word) {}

pub(crate) fn noop_task() -> Task {
    Task::new(noop_entry, 0, 0, 0)
}

/// Task whose first argument identifies it.
pub(crate) fn tagged(tag: u64) -> Task {
    Task::new(noop_entry, tag, 0, 0)
}

pub(crate) fn tag_of(task: &Task) -> u64 {
    task.args()[0]
}

/// Collaborators of a task manager built by [`mock_manager`].
#[derive(Debug)]
pub(crate) struct Mocks {
    pub(crate) network: Arc<SpyNetwork>,
    pub(crate) global_queue: Arc<SpyGlobalQueue>,
    pub(crate) detector: Arc<SpyDetector>,
}

/// An active task manager, node 0, wired to spies that record every request
/// and never complete anything on their own.
pub(crate) fn mock_manager(builder: Builder, neighbors: &[u16]) -> (Arc<TaskManager>, Mocks) {
    let mocks = Mocks {
        network: Arc::new(SpyNetwork::new()),
        global_queue: Arc::new(SpyGlobalQueue::new()),
        detector: Arc::new(SpyDetector::new()),
    };

    let tm = builder
        .try_build(
            mocks.network.clone(),
            mocks.global_queue.clone(),
            mocks.detector.clone(),
        )
        .expect("valid config");

    let neighbors = neighbors.iter().copied().map(NodeId).collect::<Vec<_>>();
    let num_local_nodes = neighbors.len() + 1;

    tm.init(NodeId(0), neighbors, num_local_nodes)
        .expect("valid topology");
    tm.activate().expect("fresh task manager");

    (Arc::new(tm), mocks)
}

/// Polls `cond` until it holds, failing the test after a generous deadline.
#[track_caller]
pub(crate) fn wait_until<F: FnMut() -> bool>(mut cond: F) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(1));
    }
}
