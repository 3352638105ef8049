//! The per-node task manager.
//!
//! Workers pull tasks with [`TaskManager::get_work`]. The lookup order is the
//! private queue, the public queue, then load balancing (steal, work-share,
//! global queue) and finally a bounded park until work shows up or the
//! termination detector confirms that the whole cluster is out of work.

use crate::errors::TaskManagerError;
use crate::handler;
use crate::stats::TaskManagerStatistics;
use crate::task::{Task, TaskFn, Word};
use crate::topology::{NodeId, Topology};
use crate::transport::{
    GlobalQueue, Network, ShareMessage, ShareReply, StealRequest, TerminationDetector,
};
use crate::utils::ScopeGuard;
use anyhow::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering, fence};
use tracing::{debug, trace, warn};

// Public API
pub mod builder;
pub use builder::{Builder, TaskManagerConfig};

mod park;
use park::Parker;

mod queues;
use queues::{PrivateQueue, PublicQueue};

mod session;
use session::SessionLock;

mod ticker;
use ticker::{Ticker, TickerData, TickerEvents};

mod victims;
use victims::VictimRing;


/// Lifecycle of a task manager. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    Created = 0,
    Initialized = 1,
    Active = 2,
    Finished = 3,
}

impl Phase {
    fn from_u8(v: u8) -> Phase {
        match v {
            0 => Phase::Created,
            1 => Phase::Initialized,
            2 => Phase::Active,
            _ => Phase::Finished,
        }
    }
}

/// Keeps track of tasks, pairing workers with tasks, and load balancing.
///
/// There is one task manager per node. It is shared as an `Arc<TaskManager>`
/// between the node's workers and the handlers of the transport.
#[derive(Debug)]
pub struct TaskManager {
    cfg: TaskManagerConfig,

    phase: AtomicU8,

    topology: OnceLock<Topology>,

    /// Steal victims.
    victims: OnceLock<VictimRing>,

    /// Work-share targets, rotated independently from steal victims.
    share_targets: OnceLock<VictimRing>,

    /// Queue for tasks assigned specifically to this node.
    private: PrivateQueue,

    /// Queue visible to all local workers, and to thieves.
    public: PublicQueue,

    steal_lock: SessionLock,
    share_lock: SessionLock,
    gq_push_lock: SessionLock,
    gq_pull_lock: SessionLock,

    /// Result of a global queue pull, waiting for `check_pull` to claim it.
    pending_pull: Mutex<Option<Vec<Task>>>,

    /// Global termination was confirmed. Never goes back to false.
    work_done: AtomicBool,

    /// Hint that the public queue may be non-empty, cleared by a worker that
    /// found it empty. Never authoritative.
    shared_may_have_work: AtomicBool,

    /// Whether this node currently takes part in a termination barrier round.
    /// Only set under `barrier_lock`, read without it on the spawn path.
    in_barrier: AtomicBool,

    /// Serializes entering and cancelling a barrier round.
    barrier_lock: Mutex<()>,

    /// Workers currently parked in `get_work`.
    idle_workers: AtomicUsize,

    /// Failed steal sessions since work last arrived. Once a full rotation of
    /// victims came back empty the node may report itself exhausted.
    steal_misses: AtomicUsize,

    /// The last global queue pull came back empty and nothing was pushed since.
    gq_drained: AtomicBool,

    ticker: Ticker,

    parker: Parker,

    stats: TaskManagerStatistics,

    network: Arc<dyn Network>,
    global_queue: Arc<dyn GlobalQueue>,
    detector: Arc<dyn TerminationDetector>,
}

impl TaskManager {
    pub(crate) fn new(
        cfg: TaskManagerConfig,
        network: Arc<dyn Network>,
        global_queue: Arc<dyn GlobalQueue>,
        detector: Arc<dyn TerminationDetector>,
    ) -> Self {
        Self {
            cfg,
            phase: AtomicU8::new(Phase::Created as u8),
            topology: OnceLock::new(),
            victims: OnceLock::new(),
            share_targets: OnceLock::new(),
            private: PrivateQueue::new(),
            public: PublicQueue::new(),
            steal_lock: SessionLock::new("steal"),
            share_lock: SessionLock::new("workshare"),
            gq_push_lock: SessionLock::new("globalq push"),
            gq_pull_lock: SessionLock::new("globalq pull"),
            pending_pull: Mutex::new(None),
            work_done: AtomicBool::new(false),
            shared_may_have_work: AtomicBool::new(false),
            in_barrier: AtomicBool::new(false),
            barrier_lock: Mutex::new(()),
            idle_workers: AtomicUsize::new(0),
            steal_misses: AtomicUsize::new(0),
            gq_drained: AtomicBool::new(false),
            ticker: Ticker::new(),
            parker: Parker::new(),
            stats: TaskManagerStatistics::new(),
            network,
            global_queue,
            detector,
        }
    }

    /// Binds the node to its place in the cluster.
    pub fn init(
        &self,
        local_id: NodeId,
        neighbors: impl Into<Vec<NodeId>>,
        num_local_nodes: usize,
    ) -> Result<()> {
        if self.phase() != Phase::Created {
            return Err(TaskManagerError::AlreadyInitialized.into());
        }

        let topology = Topology::try_new(local_id, neighbors.into(), num_local_nodes)?;
        let seed = self.cfg.victim_seed;

        self.victims
            .get_or_init(|| VictimRing::new(local_id, &topology.neighbors, seed));
        self.share_targets
            .get_or_init(|| VictimRing::new(local_id, &topology.neighbors, !seed));
        self.topology
            .set(topology)
            .map_err(|_| TaskManagerError::AlreadyInitialized)?;

        self.phase.store(Phase::Initialized as u8, Ordering::Release);
        debug!(node = %local_id, neighbors = ?self.neighbors(), "task manager initialized");
        Ok(())
    }

    /// Starts accepting work.
    pub fn activate(&self) -> Result<()> {
        self.phase
            .compare_exchange(
                Phase::Initialized as u8,
                Phase::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|p| match Phase::from_u8(p) {
                Phase::Created => TaskManagerError::NotInitialized,
                _ => TaskManagerError::AlreadyActive,
            })?;

        debug!(node = %self.local_id(), "task manager active");
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn config(&self) -> &TaskManagerConfig {
        &self.cfg
    }

    #[track_caller]
    fn topology(&self) -> &Topology {
        self.topology
            .get()
            .expect("task manager used before init")
    }

    pub fn local_id(&self) -> NodeId {
        self.topology().local_id
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.topology().neighbors
    }

    pub fn num_local_nodes(&self) -> usize {
        self.topology().num_local_nodes
    }

    pub fn stats(&self) -> &TaskManagerStatistics {
        &self.stats
    }

    /// True once the cluster agreed that all work is finished.
    pub fn is_work_done(&self) -> bool {
        self.work_done.load(Ordering::Acquire)
    }

    pub fn global_queue_on(&self) -> bool {
        self.cfg.do_global_queue
    }

    pub fn public_len(&self) -> usize {
        self.public.len()
    }

    pub fn private_len(&self) -> usize {
        self.private.len()
    }

    pub fn is_in_barrier(&self) -> bool {
        self.in_barrier.load(Ordering::SeqCst)
    }

    /// Whether work exists locally.
    pub fn local_available(&self) -> bool {
        !self.private.is_empty() || !self.public.is_empty()
    }

    /// Whether work possibly exists locally or is on its way: a balancing
    /// session that may still bring tasks in counts as available.
    pub fn available(&self) -> bool {
        self.local_available()
            || (self.cfg.do_steal && self.steal_lock.is_held())
            || (self.cfg.do_share && self.share_lock.is_held())
            || (self.cfg.do_global_queue && self.gq_pull_lock.is_held())
    }
}

// ===== Spawn =====

impl TaskManager {
    /// Creates a task in the node's public queue, where any local worker, or a
    /// thief, can claim it. Callable from any context.
    pub fn spawn_public(&self, entry: TaskFn, arg0: Word, arg1: Word, arg2: Word) {
        self.push_public_task(Task::new(entry, arg0, arg1, arg2));
    }

    /// Creates a task at the tail of the private queue.
    ///
    /// Must not be called from a remote-message handler. No wakeup is needed:
    /// a worker spawning locally proves the node is not idle.
    pub fn spawn_local_private(&self, entry: TaskFn, arg0: Word, arg1: Word, arg2: Word) {
        debug_assert!(
            !handler::is_handler_context(),
            "spawn_local_private called from a handler"
        );

        let task = Task::new(entry, arg0, arg1, arg2);
        trace!(node = %self.local_id(), %task, "spawn local private");
        self.private.push_tail(task);
    }

    /// Creates a task at the head of the private queue, ahead of local work.
    ///
    /// Must only be called from a remote-message handler. Remote work arriving
    /// means the node is not exhausted, so this leaves any barrier round.
    pub fn spawn_remote_private(&self, entry: TaskFn, arg0: Word, arg1: Word, arg2: Word) {
        debug_assert!(
            handler::is_handler_context(),
            "spawn_remote_private called outside of a handler"
        );

        let task = Task::new(entry, arg0, arg1, arg2);
        trace!(node = %self.local_id(), %task, "spawn remote private");

        self.private.push_head(task);
        self.stats.record_remote_private_task_spawn();
        self.note_arrival();
        self.parker.unpark_one();
    }

    fn push_public_task(&self, task: Task) {
        trace!(node = %self.local_id(), %task, "spawn public");

        self.public.push(task);
        self.shared_may_have_work.store(true, Ordering::Release);
        self.note_arrival();
        self.parker.unpark_one();
    }

    /// Tasks landed on this node from elsewhere. Leaves the barrier round if
    /// we were in one.
    fn note_arrival(&self) {
        self.steal_misses.store(0, Ordering::Relaxed);

        if self.is_work_done() {
            warn!(node = %self.local_id(), "work arrived after termination");
            return;
        }

        // Pairs with the fence in `try_enter_barrier`: either it sees the new
        // task, or we see its flag and cancel.
        fence(Ordering::SeqCst);
        if !self.in_barrier.load(Ordering::SeqCst) {
            return;
        }

        let _guard = self.barrier_lock.lock();
        if self.in_barrier.swap(false, Ordering::SeqCst) {
            debug!(node = %self.local_id(), "cancel barrier");
            self.detector.cancel(self.local_id());
        }
    }
}

// ===== Consume =====

impl TaskManager {
    /// Gets the next task to execute, blocking until one is available.
    ///
    /// Returns `None` only once global termination is confirmed; "no work right
    /// now" blocks instead.
    pub fn get_work(&self) -> Option<Task> {
        debug_assert!(
            self.phase() >= Phase::Active,
            "get_work called before activate"
        );

        loop {
            if let Some(task) = self.try_consume_local() {
                return Some(task);
            }

            self.maintain();

            if let Some(task) = self.try_consume_shared() {
                return Some(task);
            }

            if self.is_work_done() {
                return None;
            }

            if let Some(task) = self.wait_consume_any() {
                self.steal_misses.store(0, Ordering::Relaxed);
                return Some(task);
            }
        }
    }

    fn try_consume_local(&self) -> Option<Task> {
        let task = self.private.pop()?;
        self.stats.record_private_task_dequeue();
        Some(task)
    }

    fn try_consume_shared(&self) -> Option<Task> {
        match self.public.pop() {
            Some(task) => {
                self.stats.record_public_task_dequeue();
                Some(task)
            }
            None => {
                self.shared_may_have_work.store(false, Ordering::Release);
                None
            }
        }
    }

    /// Sampled bookkeeping on the miss path of `get_work`.
    fn maintain(&self) {
        let events = self.ticker.tick(self, &self.cfg);

        if events.contains(TickerEvents::CHECK_PULL) {
            self.check_pull();
        }

        if events.contains(TickerEvents::PUSH_GLOBAL) {
            self.try_push_to_global();
        }

        if events.contains(TickerEvents::WORK_SHARE) {
            self.check_work_share();
        }
    }

    /// Nothing local: start balancing, then park until something changes.
    /// Returns `None` when the caller should simply look again.
    fn wait_consume_any(&self) -> Option<Task> {
        // A node inside a barrier round waits to be handed work; it does not
        // go looking for it.
        if !self.is_in_barrier() {
            self.try_steal();
            self.try_start_pull();
            self.check_work_share();
        }

        // Sessions may have completed inline.
        self.check_pull();

        if let Some(task) = self.try_consume_local() {
            return Some(task);
        }

        if self.shared_may_have_work.load(Ordering::Acquire)
            && let Some(task) = self.try_consume_shared()
        {
            return Some(task);
        }

        if self.is_work_done() {
            return None;
        }

        self.idle_workers.fetch_add(1, Ordering::AcqRel);
        let _idle = ScopeGuard::new(|| {
            self.idle_workers.fetch_sub(1, Ordering::AcqRel);
        });

        self.try_enter_barrier();

        self.parker.park_timeout(self.cfg.park_timeout, || {
            self.local_available() || self.is_work_done() || self.pending_pull.lock().is_some()
        });

        None
    }
}

// ===== Sessions =====

impl TaskManager {
    /// Takes `lock` unless this node sits in a barrier round. A node that
    /// reported exhaustion waits to be handed work and never starts a session
    /// whose reply could land after termination.
    fn begin_session(&self, lock: &SessionLock) -> bool {
        if !lock.try_begin() {
            return false;
        }

        // Pairs with the fence in `try_enter_barrier`: either it sees the held
        // session as pending work, or we see its flag and back off.
        fence(Ordering::SeqCst);
        if self.in_barrier.load(Ordering::SeqCst) {
            lock.finish();
            return false;
        }

        true
    }
}

// ===== Stealing =====

impl TaskManager {
    /// Starts a steal session against the next victim, unless one is already
    /// in flight.
    fn try_steal(&self) {
        if !self.cfg.do_steal || !self.topology().has_neighbors() {
            return;
        }

        if !self.begin_session(&self.steal_lock) {
            return;
        }

        let Some(victim) = self.victims().next() else {
            self.steal_lock.finish();
            return;
        };

        let req = StealRequest {
            thief: self.local_id(),
            victim,
            max: self.cfg.chunk_size,
        };

        trace!(node = %req.thief, %victim, max = req.max, "steal request");
        self.network.request_steal(req);
    }

    /// Victim side of a steal: hands over up to `req.max` public tasks.
    pub fn serve_steal(&self, req: StealRequest) -> Vec<Task> {
        debug_assert_eq!(req.victim, self.local_id());

        let claim = self.public.claim(req.max);

        if claim.tasks.is_empty() && claim.contended {
            self.stats.record_failed_acquire();
        } else {
            self.stats.record_successful_acquire();
            self.stats.record_release();
        }

        trace!(node = %self.local_id(), thief = %req.thief, amount = claim.tasks.len(), "served steal");
        claim.tasks
    }

    /// Thief side completion of a steal session. An empty `tasks` is a failed
    /// session; the next attempt moves on to the next victim.
    pub fn complete_steal(&self, victim: NodeId, tasks: Vec<Task>) {
        if !self.steal_lock.is_held() {
            warn!(node = %self.local_id(), %victim, "steal completion without a session");
            if !tasks.is_empty() {
                self.public.extend(tasks);
                self.note_arrival();
                self.parker.unpark_all();
            }
            return;
        }

        let amount = tasks.len();

        if amount == 0 {
            self.stats.record_failed_steal_session();
            self.stats.record_failed_steal();
            self.steal_misses.fetch_add(1, Ordering::Relaxed);
            self.steal_lock.finish();

            // Let a parked worker pick the next victim or report exhaustion.
            self.parker.unpark_one();
            return;
        }

        tasks.iter().for_each(Task::on_stolen);
        self.public.extend(tasks);
        self.shared_may_have_work.store(true, Ordering::Release);

        self.stats.record_successful_steal_session();
        self.stats.record_successful_steal(amount as u64);
        debug!(node = %self.local_id(), %victim, amount, "steal succeeded");

        self.note_arrival();
        self.steal_lock.finish();
        self.parker.unpark_n(amount);
    }

    #[track_caller]
    fn victims(&self) -> &VictimRing {
        self.victims.get().expect("task manager used before init")
    }

    /// Index of the next steal victim in the permutation.
    pub fn next_victim_index(&self) -> usize {
        self.victims().cursor()
    }
}

// ===== Work-sharing =====

impl TaskManager {
    /// Compares our load with the next share target and moves up to a chunk
    /// toward whichever side is underloaded.
    fn check_work_share(&self) {
        if !self.cfg.do_share || !self.topology().has_neighbors() {
            return;
        }

        self.stats.record_workshare_test();

        if !self.begin_session(&self.share_lock) {
            return;
        }

        let local_id = self.local_id();
        let Some(peer) = self.share_targets().next() else {
            self.share_lock.finish();
            return;
        };

        let Some(theirs) = self.network.load_of(peer) else {
            self.share_lock.finish();
            return;
        };

        let mine = self.public.len();
        let diff = mine.abs_diff(theirs);
        if diff <= self.cfg.share_threshold {
            self.share_lock.finish();
            return;
        }

        let amount = (diff / 2).clamp(1, self.cfg.chunk_size);

        let msg = if mine > theirs {
            let tasks = self.public.claim(amount).tasks;
            if tasks.is_empty() {
                self.share_lock.finish();
                return;
            }
            ShareMessage::Give {
                from: local_id,
                to: peer,
                tasks,
            }
        } else {
            ShareMessage::Ask {
                from: local_id,
                to: peer,
                amount,
            }
        };

        trace!(node = %local_id, %peer, mine, theirs, "workshare");
        self.network.send_share(msg);
    }

    /// Receiving side of a work-share.
    pub fn handle_share(&self, msg: ShareMessage) -> ShareReply {
        debug_assert_eq!(msg.to(), self.local_id());

        match msg {
            ShareMessage::Give { from, tasks, .. } => {
                // Refuse when shutting down, or when already overloaded ourselves.
                if self.is_work_done()
                    || self.phase() != Phase::Active
                    || self.public.len() >= self.cfg.global_queue_threshold
                {
                    debug!(node = %self.local_id(), %from, "refused workshare");
                    return ShareReply::Refused { tasks };
                }

                let count = tasks.len();
                tasks.iter().for_each(Task::on_stolen);
                self.public.extend(tasks);
                self.shared_may_have_work.store(true, Ordering::Release);
                self.stats.record_workshare(count as i64);

                self.note_arrival();
                self.parker.unpark_n(count);
                ShareReply::Accepted { count }
            }
            ShareMessage::Ask { amount, .. } => {
                if self.is_work_done() {
                    return ShareReply::Delivered { tasks: Vec::new() };
                }

                // Never give away more than half of what we hold.
                let tasks = self.public.claim(amount.min(self.public.len() / 2)).tasks;
                if !tasks.is_empty() {
                    self.stats.record_workshare(-(tasks.len() as i64));
                }
                ShareReply::Delivered { tasks }
            }
        }
    }

    /// Initiator side completion of a work-share.
    pub fn complete_share(&self, reply: ShareReply) {
        if !self.share_lock.is_held() {
            warn!(node = %self.local_id(), ?reply, "workshare completion without a session");
        }

        match reply {
            ShareReply::Accepted { count } => {
                self.stats.record_workshare(-(count as i64));
            }
            ShareReply::Refused { tasks } | ShareReply::Unreachable { tasks } => {
                self.stats.record_failed_workshare();
                let n = tasks.len();
                if n > 0 {
                    self.public.extend(tasks);
                    self.shared_may_have_work.store(true, Ordering::Release);
                    self.parker.unpark_n(n);
                }
            }
            ShareReply::Delivered { tasks } if tasks.is_empty() => {
                self.stats.record_failed_workshare();
            }
            ShareReply::Delivered { tasks } => {
                let n = tasks.len();
                tasks.iter().for_each(Task::on_stolen);
                self.public.extend(tasks);
                self.shared_may_have_work.store(true, Ordering::Release);
                self.stats.record_workshare(n as i64);

                self.note_arrival();
                self.parker.unpark_n(n);
            }
        }

        self.share_lock.finish();
    }

    #[track_caller]
    fn share_targets(&self) -> &VictimRing {
        self.share_targets
            .get()
            .expect("task manager used before init")
    }
}

// ===== Global queue =====

impl TaskManager {
    /// Spills a chunk of the public queue to the global queue when we hold
    /// more than the high-water mark.
    fn try_push_to_global(&self) {
        if !self.cfg.do_global_queue || self.public.len() <= self.cfg.global_queue_threshold {
            return;
        }

        if !self.begin_session(&self.gq_push_lock) {
            return;
        }

        let chunk = self.public.claim(self.cfg.chunk_size).tasks;
        let amount = chunk.len();

        if amount > 0 {
            match self.global_queue.push(self.local_id(), chunk) {
                Ok(()) => {
                    self.stats.record_globalq_push(amount as u64, true);
                    self.gq_drained.store(false, Ordering::Release);
                    debug!(node = %self.local_id(), amount, "pushed to global queue");
                }
                Err(chunk) => {
                    self.stats.record_globalq_push(amount as u64, false);
                    self.public.extend(chunk);
                    debug!(node = %self.local_id(), amount, "global queue refused push");
                }
            }
        }

        self.gq_push_lock.finish();
    }

    /// Starts a global queue pull when nothing is left locally.
    fn try_start_pull(&self) {
        if !self.cfg.do_global_queue || self.local_available() {
            return;
        }

        if !self.begin_session(&self.gq_pull_lock) {
            return;
        }

        self.stats.record_globalq_pull_start();
        trace!(node = %self.local_id(), max = self.cfg.chunk_size, "globalq pull");
        self.global_queue.pull(self.local_id(), self.cfg.chunk_size);
    }

    /// Asynchronous completion of a global queue pull. The tasks are parked
    /// until a worker claims them in `check_pull`.
    pub fn complete_pull(&self, tasks: Vec<Task>) {
        {
            let mut pending = self.pending_pull.lock();
            match pending.as_mut() {
                Some(already) => {
                    warn!(node = %self.local_id(), "duplicate globalq pull completion");
                    already.extend(tasks);
                }
                None => *pending = Some(tasks),
            }
        }

        self.parker.unpark_one();
    }

    /// Claims the result of a completed pull into the public queue, if any.
    fn check_pull(&self) {
        let Some(tasks) = self.pending_pull.lock().take() else {
            return;
        };

        let amount = tasks.len();
        self.stats.record_globalq_pull(amount as u64);

        if amount == 0 {
            self.gq_drained.store(true, Ordering::Release);
        } else {
            tasks.iter().for_each(Task::on_stolen);
            self.public.extend(tasks);
            self.shared_may_have_work.store(true, Ordering::Release);
            debug!(node = %self.local_id(), amount, "pulled from global queue");

            self.note_arrival();
            self.parker.unpark_n(amount);
        }

        if !self.gq_pull_lock.finish() {
            warn!(node = %self.local_id(), "globalq pull claimed without a session");
        }
    }
}

// ===== Termination =====

impl TaskManager {
    /// Every balancing mechanism had its chance since work last arrived.
    fn balancing_exhausted(&self) -> bool {
        let steal_done = !self.cfg.do_steal
            || self.steal_misses.load(Ordering::Relaxed) >= self.victims().len();
        let gq_done = !self.cfg.do_global_queue || self.gq_drained.load(Ordering::Acquire);

        steal_done && gq_done
    }

    /// Reports local exhaustion to the termination detector if every worker
    /// is idle and nothing is available or on its way.
    fn try_enter_barrier(&self) {
        let _guard = self.barrier_lock.lock();

        if self.in_barrier.load(Ordering::SeqCst)
            || self.is_work_done()
            || self.idle_workers.load(Ordering::Acquire) < self.cfg.workers
            || !self.balancing_exhausted()
        {
            return;
        }

        // Publish the flag before the final look at the queues and sessions,
        // so spawns and session starts racing with us see one or the other.
        self.in_barrier.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        if self.available() {
            self.in_barrier.store(false, Ordering::SeqCst);
            return;
        }

        debug!(node = %self.local_id(), "enter barrier");
        self.detector.enter(self.local_id());
    }

    /// Forces the local-exhaustion report into the barrier, regardless of how
    /// many workers are idle.
    pub fn signal_termination(&self) {
        let _guard = self.barrier_lock.lock();

        if self.in_barrier.load(Ordering::SeqCst) || self.is_work_done() {
            return;
        }

        self.in_barrier.store(true, Ordering::SeqCst);
        debug!(node = %self.local_id(), "signal termination");
        self.detector.enter(self.local_id());
    }

    /// Called by the termination detector once every node agreed there is no
    /// work left. Wakes every parked worker so `get_work` can return `None`.
    ///
    /// May be called from inside `TerminationDetector::enter`, so it must not
    /// take the barrier lock.
    pub fn confirm_termination(&self) {
        if self.work_done.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(node = %self.local_id(), "global termination");
        self.parker.unpark_all();
    }

    /// Shuts the node down: marks work as done, wakes every parked worker and
    /// returns whatever was still queued.
    pub fn finish(&self) -> Vec<Task> {
        self.phase.store(Phase::Finished as u8, Ordering::Release);
        self.work_done.store(true, Ordering::Release);
        self.parker.unpark_all();

        let mut leftover = self.private.drain();
        leftover.extend(self.public.drain());
        if let Some(pulled) = self.pending_pull.lock().take() {
            leftover.extend(pulled);
        }

        if !leftover.is_empty() {
            warn!(node = %self.local_id(), count = leftover.len(), "finished with queued tasks");
        }

        debug!(node = %self.local_id(), stats = %self.stats, "task manager finished");
        leftover
    }
}

/// Maintenance sampling policy.
impl TickerData for TaskManagerConfig {
    type Context = TaskManager;

    fn update_and_check(&self, tm: &TaskManager, tick: u32) -> TickerEvents {
        let mut events = TickerEvents::empty();

        if !tick.is_multiple_of(self.maintenance_interval) {
            return events;
        }

        if self.do_global_queue {
            if tm.gq_pull_lock.is_held() {
                events.insert(TickerEvents::CHECK_PULL);
            }
            if tm.public.len() > self.global_queue_threshold {
                events.insert(TickerEvents::PUSH_GLOBAL);
            }
        }

        if self.do_share {
            events.insert(TickerEvents::WORK_SHARE);
        }

        events
    }
}

impl fmt::Display for TaskManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(topo) = self.topology.get() else {
            return write!(f, "TaskManager{{ phase={:?} }}", self.phase());
        };

        write!(
            f,
            "TaskManager{{ node={}, neighbors={:?}, phase={:?}, private={}, public={}, \
             steal={}/{}, share={}/{}, gq={}/push:{}/pull:{}, nextVictimIndex={}, \
             chunkSize={}, idle={}/{}, inBarrier={}, workDone={}, sharedMayHaveWork={} }}",
            topo.local_id,
            topo.neighbors,
            self.phase(),
            self.private.len(),
            self.public.len(),
            self.cfg.do_steal,
            self.steal_lock.is_held(),
            self.cfg.do_share,
            self.share_lock.is_held(),
            self.cfg.do_global_queue,
            self.gq_push_lock.is_held(),
            self.gq_pull_lock.is_held(),
            self.next_victim_index(),
            self.cfg.chunk_size,
            self.idle_workers.load(Ordering::Relaxed),
            self.cfg.workers,
            self.is_in_barrier(),
            self.is_work_done(),
            self.shared_may_have_work.load(Ordering::Relaxed),
        )
    }
}
