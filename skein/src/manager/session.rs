use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single permit guarding one kind of in-flight cross-node session (steal,
/// share, global-queue push or pull).
///
/// Sessions complete asynchronously, usually on another thread than the one
/// that started them, so this is not an RAII guard: `try_begin` and `finish`
/// are called from different places.
pub(crate) struct SessionLock {
    name: &'static str,
    in_flight: AtomicBool,
}

impl SessionLock {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self {
            name,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns true if the caller now owns the session. A false return means
    /// one is already outstanding and the caller must do nothing.
    #[inline]
    pub(crate) fn try_begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Completes the outstanding session. Returns false if there was none,
    /// meaning the completion is a duplicate and must be ignored.
    #[inline]
    pub(crate) fn finish(&self) -> bool {
        self.in_flight.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLock")
            .field("name", &self.name)
            .field("in_flight", &self.is_held())
            .finish()
    }
}
