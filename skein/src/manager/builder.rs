use crate::errors::TaskManagerError;
use crate::manager::TaskManager;
use crate::transport::{GlobalQueue, Network, TerminationDetector};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Batch size for steals and global queue transfers.
const CHUNK_SIZE: usize = 10;

/// Public queue occupancy, in chunks, above which we spill to the global queue.
const GLOBAL_QUEUE_THRESHOLD_CHUNKS: usize = 4;

/// Number of `get_work` misses between two maintenance passes.
#[cfg(not(test))]
const MAINTENANCE_INTERVAL: u32 = 8;

#[cfg(test)]
const MAINTENANCE_INTERVAL: u32 = 1; // make tests deterministic

/// Upper bound on how long an idle worker sleeps before re-polling.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

const VICTIM_SEED: u64 = 0x5eed;

/// Immutable configuration of a [`TaskManager`], produced by [`Builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskManagerConfig {
    pub do_steal: bool,
    pub do_share: bool,
    pub do_global_queue: bool,
    pub chunk_size: usize,
    pub global_queue_threshold: usize,
    pub share_threshold: usize,
    pub workers: usize,
    pub maintenance_interval: u32,
    pub park_timeout: Duration,
    pub victim_seed: u64,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            do_steal: true,
            do_share: false,
            do_global_queue: false,
            chunk_size: CHUNK_SIZE,
            global_queue_threshold: CHUNK_SIZE.saturating_mul(GLOBAL_QUEUE_THRESHOLD_CHUNKS),
            share_threshold: CHUNK_SIZE,
            workers: 1,
            maintenance_interval: MAINTENANCE_INTERVAL,
            park_timeout: PARK_TIMEOUT,
            victim_seed: VICTIM_SEED,
        }
    }
}

impl TaskManagerConfig {
    fn validate(&self) -> Result<(), TaskManagerError> {
        if self.chunk_size == 0 {
            return Err(TaskManagerError::InvalidConfig("chunk_size must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(TaskManagerError::InvalidConfig("workers must be greater than 0"));
        }
        if self.maintenance_interval == 0 {
            return Err(TaskManagerError::InvalidConfig(
                "maintenance_interval must be greater than 0",
            ));
        }
        if self.park_timeout.is_zero() {
            return Err(TaskManagerError::InvalidConfig("park_timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Builds a [`TaskManager`].
///
/// The balancing modes are fixed here and can't be changed afterwards.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    cfg: TaskManagerConfig,

    // When left unset, the corresponding threshold follows `chunk_size`.
    global_queue_threshold: Option<usize>,
    share_threshold: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables stealing from neighbors' public queues. On by default.
    pub fn stealing(mut self, on: bool) -> Self {
        self.cfg.do_steal = on;
        self
    }

    /// Enables proactive work-sharing with neighbors. Off by default.
    pub fn sharing(mut self, on: bool) -> Self {
        self.cfg.do_share = on;
        self
    }

    /// Enables pushing to and pulling from the global queue. Off by default.
    pub fn global_queue(mut self, on: bool) -> Self {
        self.cfg.do_global_queue = on;
        self
    }

    /// Batch size for steals and global queue transfers, and upper bound of
    /// one work-share. Defaults to 10.
    pub fn chunk_size(mut self, val: usize) -> Self {
        self.cfg.chunk_size = val;
        self
    }

    /// Public queue occupancy above which a chunk is pushed to the global
    /// queue. Defaults to `4 * chunk_size`.
    pub fn global_queue_threshold(mut self, val: usize) -> Self {
        self.global_queue_threshold = Some(val);
        self
    }

    /// Minimum load difference with a neighbor before a work-share happens.
    /// Defaults to `chunk_size`.
    pub fn share_threshold(mut self, val: usize) -> Self {
        self.share_threshold = Some(val);
        self
    }

    /// Number of local workers calling `get_work`. The node only reports
    /// itself exhausted once all of them are idle. Defaults to 1.
    pub fn workers(mut self, val: usize) -> Self {
        self.cfg.workers = val;
        self
    }

    /// Number of `get_work` misses between maintenance passes (global queue
    /// push/pull check, work-share evaluation).
    pub fn maintenance_interval(mut self, val: u32) -> Self {
        self.cfg.maintenance_interval = val;
        self
    }

    /// Upper bound on how long an idle worker stays parked before it polls
    /// again. Defaults to 1ms.
    pub fn park_timeout(mut self, val: Duration) -> Self {
        self.cfg.park_timeout = val;
        self
    }

    /// Seed of the victim permutation.
    pub fn victim_seed(mut self, val: u64) -> Self {
        self.cfg.victim_seed = val;
        self
    }

    pub fn config(&self) -> TaskManagerConfig {
        let mut cfg = self.cfg.clone();
        cfg.global_queue_threshold = self
            .global_queue_threshold
            .unwrap_or(cfg.chunk_size.saturating_mul(GLOBAL_QUEUE_THRESHOLD_CHUNKS));
        cfg.share_threshold = self.share_threshold.unwrap_or(cfg.chunk_size);
        cfg
    }

    /// Creates the [`TaskManager`]. It still needs `init` and `activate`
    /// before workers can use it.
    pub fn try_build(
        self,
        network: Arc<dyn Network>,
        global_queue: Arc<dyn GlobalQueue>,
        detector: Arc<dyn TerminationDetector>,
    ) -> Result<TaskManager> {
        let cfg = self.config();
        cfg.validate()?;

        Ok(TaskManager::new(cfg, network, global_queue, detector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_thresholds_follow_chunk_size() {
        let cfg = Builder::new().chunk_size(3).config();

        assert_eq!(cfg.global_queue_threshold, 12);
        assert_eq!(cfg.share_threshold, 3);
    }

    #[test]
    fn test_explicit_thresholds_win() {
        let cfg = Builder::new()
            .chunk_size(3)
            .global_queue_threshold(5)
            .share_threshold(1)
            .config();

        assert_eq!(cfg.global_queue_threshold, 5);
        assert_eq!(cfg.share_threshold, 1);
    }

    #[test]
    fn test_huge_chunk_size_saturates_threshold() {
        let cfg = Builder::new().chunk_size(usize::MAX).config();

        assert_eq!(cfg.global_queue_threshold, usize::MAX);
        assert_eq!(cfg.share_threshold, usize::MAX);
        assert!(cfg.validate().is_ok());
    }

    #[rstest]
    #[case::chunk(Builder::new().chunk_size(0))]
    #[case::workers(Builder::new().workers(0))]
    #[case::interval(Builder::new().maintenance_interval(0))]
    #[case::park(Builder::new().park_timeout(Duration::ZERO))]
    fn test_invalid_config(#[case] builder: Builder) {
        assert!(matches!(
            builder.config().validate(),
            Err(TaskManagerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let cfg = Builder::new().config();

        assert!(cfg.do_steal);
        assert!(!cfg.do_share);
        assert!(!cfg.do_global_queue);
        assert_eq!(cfg.chunk_size, CHUNK_SIZE);
        assert!(cfg.validate().is_ok());
    }
}
