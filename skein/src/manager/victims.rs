use crate::topology::NodeId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotating cursor over a fixed pseudo-random permutation of the neighbors.
///
/// Every neighbor is visited once per cycle, so repeated steal attempts do not
/// hammer the same victim. The permutation is seeded, which keeps victim order
/// reproducible in tests while still differing between nodes.
#[derive(Debug)]
pub(crate) struct VictimRing {
    permutation: Box<[NodeId]>,
    next: AtomicUsize,
}

impl VictimRing {
    pub(crate) fn new(local_id: NodeId, neighbors: &[NodeId], seed: u64) -> Self {
        let mut permutation = neighbors.to_vec();
        debug_assert!(!permutation.contains(&local_id));

        // Mix in the node id so each node walks its neighbors in its own order,
        // which spreads contention when several thieves go idle together.
        let mut rng = fastrand::Rng::with_seed(seed ^ (local_id.0 as u64).rotate_left(32));
        rng.shuffle(&mut permutation);

        Self {
            permutation: permutation.into_boxed_slice(),
            next: AtomicUsize::new(0),
        }
    }

    /// Next neighbor in rotation, advancing the cursor. `None` when there are
    /// no neighbors at all.
    pub(crate) fn next(&self) -> Option<NodeId> {
        if self.permutation.is_empty() {
            return None;
        }

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.permutation.len();
        Some(self.permutation[idx])
    }

    /// Current cursor position, for diagnostics.
    pub(crate) fn cursor(&self) -> usize {
        match self.permutation.len() {
            0 => 0,
            n => self.next.load(Ordering::Relaxed) % n,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.permutation.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    fn neighbors(n: u16) -> Vec<NodeId> {
        (1..=n).map(NodeId).collect()
    }

    #[rstest]
    #[case::one(1)]
    #[case::three(3)]
    #[case::eight(8)]
    fn test_full_cycle_before_repeat(#[case] n: u16) {
        let ring = VictimRing::new(NodeId(0), &neighbors(n), 42);

        for _ in 0..3 {
            let cycle = (0..n).filter_map(|_| ring.next()).collect::<HashSet<_>>();
            assert_eq!(cycle.len(), n as usize);
            assert!(!cycle.contains(&NodeId(0)));
        }
    }

    #[test]
    fn test_same_seed_same_order() {
        let a = VictimRing::new(NodeId(0), &neighbors(6), 7);
        let b = VictimRing::new(NodeId(0), &neighbors(6), 7);

        let order_a = (0..12).map(|_| a.next()).collect::<Vec<_>>();
        let order_b = (0..12).map(|_| b.next()).collect::<Vec<_>>();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn test_empty_ring() {
        let ring = VictimRing::new(NodeId(0), &[], 1);

        assert_eq!(ring.next(), None);
        assert_eq!(ring.cursor(), 0);
        assert_eq!(ring.len(), 0);
    }
}
