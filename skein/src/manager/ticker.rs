use bitflags::bitflags;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counts `get_work` passes that missed the private queue. Shared by every
/// worker of the node.
#[derive(Debug)]
pub(crate) struct Ticker {
    tick: AtomicU32,
}

impl Ticker {
    pub(crate) fn new() -> Self {
        Self {
            tick: AtomicU32::new(0),
        }
    }

    pub(crate) fn tick<T: TickerData>(&self, ctx: &T::Context, data: &T) -> TickerEvents {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        data.update_and_check(ctx, tick)
    }
}

/// Turns a tick into the set of maintenance actions due on it. Keeps the
/// sampling policy apart from the state it looks at.
pub(crate) trait TickerData {
    type Context;

    fn update_and_check(&self, ctx: &Self::Context, tick: u32) -> TickerEvents;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub(crate) struct TickerEvents: u8 {
        /// Claim the result of a completed global queue pull.
        const CHECK_PULL = 1;

        /// Spill a chunk of the public queue to the global queue.
        const PUSH_GLOBAL = 1 << 1;

        /// Compare load with a neighbor and share work if unbalanced.
        const WORK_SHARE = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EveryOther;

    impl TickerData for EveryOther {
        type Context = ();

        fn update_and_check(&self, _ctx: &(), tick: u32) -> TickerEvents {
            if tick.is_multiple_of(2) {
                TickerEvents::all()
            } else {
                TickerEvents::empty()
            }
        }
    }

    #[test]
    fn test_ticks_start_at_one() {
        let ticker = Ticker::new();

        assert!(ticker.tick(&(), &EveryOther).is_empty());
        assert_eq!(ticker.tick(&(), &EveryOther), TickerEvents::all());
        assert!(ticker.tick(&(), &EveryOther).is_empty());
    }
}
