//! Creation Order Module
//!
//! Min-heap of entry creation stamps used to pick eviction victims.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

// == Creation Stamp ==
/// Identifies one insertion of a key.
///
/// `seq` is strictly increasing per store, so it both breaks ties between
/// equal instants and tells a live insertion apart from a superseded one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CreationStamp {
    pub created_at: Instant,
    pub seq: u64,
    pub key: String,
}

// == Creation Order ==
/// Tracks insertions ordered by creation time, oldest first.
///
/// Overwrites and deletions do not touch the heap. Their stale stamps stay
/// behind and are skipped when popped, because the caller reports them as
/// no longer live. `compact` drops them in bulk.
#[derive(Debug, Default)]
pub struct CreationOrder {
    heap: BinaryHeap<Reverse<CreationStamp>>,
}

impl CreationOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    // == Push ==
    /// Records a new insertion.
    pub fn push(&mut self, key: &str, created_at: Instant, seq: u64) {
        self.heap.push(Reverse(CreationStamp {
            created_at,
            seq,
            key: key.to_string(),
        }));
    }

    // == Pop Oldest ==
    /// Removes and returns the oldest stamp for which `is_live` holds.
    ///
    /// Stamps rejected by `is_live` are discarded on the way.
    pub fn pop_oldest<F>(&mut self, is_live: F) -> Option<CreationStamp>
    where
        F: Fn(&CreationStamp) -> bool,
    {
        while let Some(Reverse(stamp)) = self.heap.pop() {
            if is_live(&stamp) {
                return Some(stamp);
            }
        }
        None
    }

    // == Peek Oldest ==
    /// Returns the oldest stamp without removing it, live or not.
    #[allow(dead_code)]
    pub fn peek_oldest(&self) -> Option<&CreationStamp> {
        self.heap.peek().map(|Reverse(stamp)| stamp)
    }

    // == Compact ==
    /// Drops every stamp rejected by `is_live`.
    pub fn compact<F>(&mut self, is_live: F)
    where
        F: Fn(&CreationStamp) -> bool,
    {
        self.heap.retain(|Reverse(stamp)| is_live(stamp));
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    // == Length ==
    /// Returns the number of stamps, including superseded ones.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn always_live(_: &CreationStamp) -> bool {
        true
    }

    #[test]
    fn test_order_new() {
        let order = CreationOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
    }

    #[test]
    fn test_pop_oldest_by_instant() {
        let t0 = Instant::now();
        let mut order = CreationOrder::new();

        order.push("c", t0 + Duration::from_millis(2), 0);
        order.push("a", t0, 1);
        order.push("b", t0 + Duration::from_millis(1), 2);

        assert_eq!(order.pop_oldest(always_live).unwrap().key, "a");
        assert_eq!(order.pop_oldest(always_live).unwrap().key, "b");
        assert_eq!(order.pop_oldest(always_live).unwrap().key, "c");
        assert!(order.pop_oldest(always_live).is_none());
    }

    #[test]
    fn test_equal_instants_break_ties_by_sequence() {
        let t0 = Instant::now();
        let mut order = CreationOrder::new();

        order.push("second", t0, 8);
        order.push("first", t0, 7);
        order.push("third", t0, 9);

        assert_eq!(order.peek_oldest().unwrap().key, "first");
        assert_eq!(order.pop_oldest(always_live).unwrap().key, "first");
        assert_eq!(order.pop_oldest(always_live).unwrap().key, "second");
    }

    #[test]
    fn test_pop_skips_superseded_stamps() {
        let t0 = Instant::now();
        let mut order = CreationOrder::new();
        // "a" was inserted at seq 0 and overwritten at seq 2
        let live: HashMap<&str, u64> = [("a", 2), ("b", 1)].into_iter().collect();

        order.push("a", t0, 0);
        order.push("b", t0 + Duration::from_millis(1), 1);
        order.push("a", t0 + Duration::from_millis(2), 2);

        let is_live = |s: &CreationStamp| live.get(s.key.as_str()) == Some(&s.seq);

        assert_eq!(order.pop_oldest(is_live).unwrap().key, "b");
        let next = order.pop_oldest(is_live).unwrap();
        assert_eq!((next.key.as_str(), next.seq), ("a", 2));
        assert!(order.is_empty());
    }

    #[test]
    fn test_compact_removes_dead_stamps() {
        let t0 = Instant::now();
        let mut order = CreationOrder::new();

        for seq in 0..10 {
            order.push("k", t0, seq);
        }
        assert_eq!(order.len(), 10);

        order.compact(|s| s.seq == 9);
        assert_eq!(order.len(), 1);
        assert_eq!(order.peek_oldest().unwrap().seq, 9);
    }

    #[test]
    fn test_clear() {
        let mut order = CreationOrder::new();
        order.push("a", Instant::now(), 0);
        order.clear();
        assert!(order.pop_oldest(always_live).is_none());
    }
}
