use crate::task::Task;
use crossbeam_deque::{Injector, Steal};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;

/// How many times we retry a contended public queue before giving up on a
/// claim. A contended victim counts as a failed steal.
const MAX_CLAIM_RETRIES: usize = 3;

/// Node-private task queue.
///
/// Two LIFO stacks behind one short critical section: the head holds remote
/// arrivals and is always popped first, the tail holds local spawns. Remote
/// handlers never take the lock: they land in a lock-free inbox that the
/// next consumer moves onto the head, oldest first, so the newest arrival
/// ends up on top.
#[derive(Debug, Default)]
pub(crate) struct PrivateQueue {
    inbox: SegQueue<Task>,
    ends: Mutex<Ends>,
}

#[derive(Debug, Default)]
struct Ends {
    head: Vec<Task>,
    tail: Vec<Task>,
}

impl PrivateQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_head(&self, task: Task) {
        self.inbox.push(task);
    }

    pub(crate) fn push_tail(&self, task: Task) {
        self.ends.lock().tail.push(task);
    }

    /// Most recent remote arrival, else the most recently spawned local task.
    pub(crate) fn pop(&self) -> Option<Task> {
        let mut ends = self.ends.lock();
        while let Some(t) = self.inbox.pop() {
            ends.head.push(t);
        }
        ends.head.pop().or_else(|| ends.tail.pop())
    }

    pub(crate) fn len(&self) -> usize {
        let ends = self.ends.lock();
        self.inbox.len() + ends.head.len() + ends.tail.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn drain(&self) -> Vec<Task> {
        let mut ends = self.ends.lock();
        let mut out = std::iter::from_fn(|| self.inbox.pop()).collect::<Vec<_>>();
        out.append(&mut ends.head);
        out.append(&mut ends.tail);
        out
    }
}

/// Result of claiming a batch from the public queue.
#[derive(Debug, Default)]
pub(crate) struct Claim {
    pub(crate) tasks: Vec<Task>,

    /// We stopped early because the queue stayed contended.
    pub(crate) contended: bool,
}

/// Node-local public queue, shared by every local worker and the only source
/// for steals. Each task is claimed by exactly one consumer. Ordering between
/// tasks is best-effort.
#[derive(Debug, Default)]
pub(crate) struct PublicQueue {
    inner: Injector<Task>,
}

impl PublicQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, task: Task) {
        self.inner.push(task);
    }

    pub(crate) fn extend<I: IntoIterator<Item = Task>>(&self, tasks: I) {
        tasks.into_iter().for_each(|t| self.inner.push(t));
    }

    pub(crate) fn pop(&self) -> Option<Task> {
        std::iter::repeat_with(|| self.inner.steal())
            .find(|s| !s.is_retry())
            .and_then(Steal::success)
    }

    /// Claims up to `max` tasks.
    pub(crate) fn claim(&self, max: usize) -> Claim {
        let mut claim = Claim {
            tasks: Vec::with_capacity(max.min(self.len())),
            contended: false,
        };
        let mut retries = 0;

        while claim.tasks.len() < max {
            match self.inner.steal() {
                Steal::Success(t) => claim.tasks.push(t),
                Steal::Empty => break,
                Steal::Retry if retries < MAX_CLAIM_RETRIES => retries += 1,
                Steal::Retry => {
                    claim.contended = true;
                    break;
                }
            }
        }

        claim
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn drain(&self) -> Vec<Task> {
        self.claim(usize::MAX).tasks
    }
}
