use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Write-only counters bumped by the task manager at well defined events.
/// Nothing in the scheduling logic ever reads them back.
#[derive(Debug, Default)]
pub struct TaskManagerStatistics {
    steal_sessions_ok: AtomicU64,
    steal_sessions_failed: AtomicU64,
    stolen_tasks: AtomicU64,
    steals_failed: AtomicU64,

    acquires_ok: AtomicU64,
    acquires_failed: AtomicU64,
    releases: AtomicU64,

    public_dequeues: AtomicU64,
    private_dequeues: AtomicU64,
    remote_private_spawns: AtomicU64,

    globalq_pushes: AtomicU64,
    globalq_pushes_failed: AtomicU64,
    globalq_pushed_tasks: AtomicU64,
    globalq_pull_starts: AtomicU64,
    globalq_pulls: AtomicU64,
    globalq_pulled_tasks: AtomicU64,

    workshare_tests: AtomicU64,
    workshares: AtomicU64,
    workshares_failed: AtomicU64,
    workshare_net_change: AtomicI64,
}

macro_rules! bump {
    ($field:expr) => {
        $field.fetch_add(1, Ordering::Relaxed)
    };
    ($field:expr, $n:expr) => {
        $field.fetch_add($n, Ordering::Relaxed)
    };
}

impl TaskManagerStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_successful_steal_session(&self) {
        bump!(self.steal_sessions_ok);
    }

    pub fn record_failed_steal_session(&self) {
        bump!(self.steal_sessions_failed);
    }

    pub fn record_successful_steal(&self, amount: u64) {
        bump!(self.stolen_tasks, amount);
    }

    pub fn record_failed_steal(&self) {
        bump!(self.steals_failed);
    }

    pub fn record_successful_acquire(&self) {
        bump!(self.acquires_ok);
    }

    pub fn record_failed_acquire(&self) {
        bump!(self.acquires_failed);
    }

    pub fn record_release(&self) {
        bump!(self.releases);
    }

    pub fn record_public_task_dequeue(&self) {
        bump!(self.public_dequeues);
    }

    pub fn record_private_task_dequeue(&self) {
        bump!(self.private_dequeues);
    }

    pub fn record_globalq_push(&self, amount: u64, success: bool) {
        if success {
            bump!(self.globalq_pushes);
            bump!(self.globalq_pushed_tasks, amount);
        } else {
            bump!(self.globalq_pushes_failed);
        }
    }

    pub fn record_globalq_pull_start(&self) {
        bump!(self.globalq_pull_starts);
    }

    pub fn record_globalq_pull(&self, amount: u64) {
        bump!(self.globalq_pulls);
        bump!(self.globalq_pulled_tasks, amount);
    }

    pub fn record_workshare_test(&self) {
        bump!(self.workshare_tests);
    }

    pub fn record_remote_private_task_spawn(&self) {
        bump!(self.remote_private_spawns);
    }

    /// `change` is the signed change in local load, negative when we gave
    /// tasks away.
    pub fn record_workshare(&self, change: i64) {
        bump!(self.workshares);
        bump!(self.workshare_net_change, change);
    }

    pub fn record_failed_workshare(&self) {
        bump!(self.workshares_failed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);

        StatsSnapshot {
            steal_sessions_ok: get(&self.steal_sessions_ok),
            steal_sessions_failed: get(&self.steal_sessions_failed),
            stolen_tasks: get(&self.stolen_tasks),
            steals_failed: get(&self.steals_failed),
            acquires_ok: get(&self.acquires_ok),
            acquires_failed: get(&self.acquires_failed),
            releases: get(&self.releases),
            public_dequeues: get(&self.public_dequeues),
            private_dequeues: get(&self.private_dequeues),
            remote_private_spawns: get(&self.remote_private_spawns),
            globalq_pushes: get(&self.globalq_pushes),
            globalq_pushes_failed: get(&self.globalq_pushes_failed),
            globalq_pushed_tasks: get(&self.globalq_pushed_tasks),
            globalq_pull_starts: get(&self.globalq_pull_starts),
            globalq_pulls: get(&self.globalq_pulls),
            globalq_pulled_tasks: get(&self.globalq_pulled_tasks),
            workshare_tests: get(&self.workshare_tests),
            workshares: get(&self.workshares),
            workshares_failed: get(&self.workshares_failed),
            workshare_net_change: self.workshare_net_change.load(Ordering::Relaxed),
        }
    }
}

/// Point in time copy of [`TaskManagerStatistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub steal_sessions_ok: u64,
    pub steal_sessions_failed: u64,
    pub stolen_tasks: u64,
    pub steals_failed: u64,
    pub acquires_ok: u64,
    pub acquires_failed: u64,
    pub releases: u64,
    pub public_dequeues: u64,
    pub private_dequeues: u64,
    pub remote_private_spawns: u64,
    pub globalq_pushes: u64,
    pub globalq_pushes_failed: u64,
    pub globalq_pushed_tasks: u64,
    pub globalq_pull_starts: u64,
    pub globalq_pulls: u64,
    pub globalq_pulled_tasks: u64,
    pub workshare_tests: u64,
    pub workshares: u64,
    pub workshares_failed: u64,
    pub workshare_net_change: i64,
}

impl StatsSnapshot {
    pub fn steal_sessions(&self) -> u64 {
        self.steal_sessions_ok + self.steal_sessions_failed
    }
}

impl fmt::Display for TaskManagerStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot();
        write!(
            f,
            "TaskStatistics{{ steal_sessions={}/{}, stolen={}, dequeues(pub/priv)={}/{}, \
             remote_private_spawns={}, gq_push={}/{} ({} tasks), gq_pull={}/{} ({} tasks), \
             workshare={}/{} (tests={}, net={}) }}",
            s.steal_sessions_ok,
            s.steal_sessions(),
            s.stolen_tasks,
            s.public_dequeues,
            s.private_dequeues,
            s.remote_private_spawns,
            s.globalq_pushes,
            s.globalq_pushes + s.globalq_pushes_failed,
            s.globalq_pushed_tasks,
            s.globalq_pulls,
            s.globalq_pull_starts,
            s.globalq_pulled_tasks,
            s.workshares,
            s.workshares + s.workshares_failed,
            s.workshare_tests,
            s.workshare_net_change,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globalq_push_failure_does_not_count_tasks() {
        let stats = TaskManagerStatistics::new();
        stats.record_globalq_push(10, true);
        stats.record_globalq_push(10, false);

        let s = stats.snapshot();
        assert_eq!(s.globalq_pushes, 1);
        assert_eq!(s.globalq_pushes_failed, 1);
        assert_eq!(s.globalq_pushed_tasks, 10);
    }

    #[test]
    fn test_workshare_net_change_is_signed() {
        let stats = TaskManagerStatistics::new();
        stats.record_workshare(-4);
        stats.record_workshare(1);

        let s = stats.snapshot();
        assert_eq!(s.workshares, 2);
        assert_eq!(s.workshare_net_change, -3);
    }

    #[test]
    fn test_steal_sessions_total() {
        let stats = TaskManagerStatistics::new();
        stats.record_successful_steal_session();
        stats.record_failed_steal_session();
        stats.record_failed_steal_session();

        assert_eq!(stats.snapshot().steal_sessions(), 3);
    }
}
