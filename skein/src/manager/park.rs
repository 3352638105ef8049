use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Parked {
    thread: Thread,
    woken: Arc<AtomicBool>,
}

/// Where idle workers of a node block while waiting for work.
///
/// Waiters are kept LIFO: the most recently parked worker is the first one
/// woken, its cache is the hottest.
#[derive(Debug, Default)]
pub(crate) struct Parker {
    parked: Mutex<VecDeque<Parked>>,
}

impl Parker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Parks the current thread for at most `timeout`.
    ///
    /// `ready` is evaluated while holding the waiter list lock, and wakers
    /// take that same lock, so a notification sent after a state change can't
    /// be missed: either `ready` observes the change or the waker finds us in
    /// the list. Returns true if woken by a notification or if `ready` held.
    pub(crate) fn park_timeout<F>(&self, timeout: Duration, ready: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let woken = Arc::new(AtomicBool::new(false));
        {
            let mut parked = self.parked.lock();
            if ready() {
                return true;
            }

            parked.push_back(Parked {
                thread: thread::current(),
                woken: Arc::clone(&woken),
            });
        }

        // Loop to absorb spurious wakeups.
        let deadline = Instant::now() + timeout;
        while !woken.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }

        if woken.load(Ordering::Acquire) {
            return true;
        }

        // Timed out. If a waker popped us in the meantime, count it as a wakeup.
        let mut parked = self.parked.lock();
        let before = parked.len();
        parked.retain(|p| !Arc::ptr_eq(&p.woken, &woken));
        parked.len() == before
    }

    pub(crate) fn unpark_one(&self) -> bool {
        let Some(p) = self.parked.lock().pop_back() else {
            return false;
        };

        p.woken.store(true, Ordering::Release);
        p.thread.unpark();
        true
    }

    pub(crate) fn unpark_n(&self, n: usize) -> usize {
        (0..n).take_while(|_| self.unpark_one()).count()
    }

    pub(crate) fn unpark_all(&self) -> usize {
        let mut parked = self.parked.lock();
        let mut num_unparked = 0;

        while let Some(p) = parked.pop_back() {
            p.woken.store(true, Ordering::Release);
            p.thread.unpark();
            num_unparked += 1;
        }

        num_unparked
    }

    #[cfg(test)]
    pub(crate) fn num_parked(&self) -> usize {
        self.parked.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Parker: Send, Sync);

    #[test]
    fn test_ready_skips_parking() {
        let parker = Parker::new();
        let start = Instant::now();

        assert!(parker.park_timeout(Duration::from_secs(10), || true));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(parker.num_parked(), 0);
    }

    #[test]
    fn test_times_out_and_deregisters() {
        let parker = Parker::new();

        assert!(!parker.park_timeout(Duration::from_millis(5), || false));
        assert_eq!(parker.num_parked(), 0);
    }

    #[test]
    fn test_unpark_one_wakes_waiter() {
        let parker = Arc::new(Parker::new());

        let waiter = {
            let parker = Arc::clone(&parker);
            thread::spawn(move || parker.park_timeout(Duration::from_secs(30), || false))
        };

        while parker.num_parked() == 0 {
            thread::yield_now();
        }

        assert!(parker.unpark_one());
        assert!(waiter.join().unwrap());
        assert!(!parker.unpark_one());
    }

    #[test]
    fn test_unpark_all() {
        let parker = Arc::new(Parker::new());

        let waiters = (0..3)
            .map(|_| {
                let parker = Arc::clone(&parker);
                thread::spawn(move || parker.park_timeout(Duration::from_secs(30), || false))
            })
            .collect::<Vec<_>>();

        while parker.num_parked() < 3 {
            thread::yield_now();
        }

        assert_eq!(parker.unpark_all(), 3);
        for w in waiters {
            assert!(w.join().unwrap());
        }
    }
}
