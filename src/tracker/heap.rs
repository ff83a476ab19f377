//! Expiration min-heap with lazy deletion.
//!
//! Binary heaps don't support decreasing or removing an arbitrary element in
//! `O(log n)`, so completing or reissuing a work item does not touch the
//! heap directly — it only updates `issued`. A heap entry becomes **stale**
//! the moment its `work_id` is no longer in `issued`, or is in `issued` with
//! a different `expires_at` (because it was reissued in the meantime, which
//! pushes a fresh entry rather than mutating the old one). [`ExpiryHeap::pop_live`]
//! is the single place that filters staleness out: every other piece of the
//! tracker only ever sees live entries.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use rustc_hash::FxHashMap;

/// One outstanding issuance: when it expires, and the content to hand back
/// out on reissue (kept here so reissue never has to re-read the input file).
#[derive(Debug, Clone)]
pub struct Issued {
    pub expires_at: Instant,
    pub content: Vec<u8>,
}

/// Min-heap over `(expires_at, work_id)`, tolerant of stale entries.
#[derive(Default)]
pub struct ExpiryHeap {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
}

impl ExpiryHeap {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, expires_at: Instant, work_id: u64) {
        self.heap.push(Reverse((expires_at, work_id)));
    }

    /// Pops and returns the earliest-expiring entry that is still live
    /// according to `issued`, discarding any stale entries encountered
    /// along the way. Returns `None` once no live entries remain.
    pub fn pop_live(&mut self, issued: &FxHashMap<u64, Issued>) -> Option<(Instant, u64)> {
        while let Some(Reverse((expires_at, work_id))) = self.heap.pop() {
            if let Some(entry) = issued.get(&work_id) {
                if entry.expires_at == expires_at {
                    return Some((expires_at, work_id));
                }
            }
            // else: stale, keep popping.
        }
        None
    }

    /// Peeks the earliest-expiring *live* entry without removing it,
    /// discarding stale entries it passes over in the process.
    pub fn peek_live(&mut self, issued: &FxHashMap<u64, Issued>) -> Option<(Instant, u64)> {
        let live = self.pop_live(issued)?;
        self.heap.push(Reverse(live));
        Some(live)
    }

    #[cfg(test)]
    pub fn raw_len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn t(offset_ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(offset_ms)
    }

    #[test]
    fn pop_live_skips_entries_absent_from_issued() {
        let mut heap = ExpiryHeap::new();
        let issued: FxHashMap<u64, Issued> = FxHashMap::default();
        heap.push(t(0), 1);
        heap.push(t(1), 2);
        assert_eq!(heap.pop_live(&issued), None);
    }

    #[test]
    fn pop_live_skips_entries_with_mismatched_expiry() {
        let mut heap = ExpiryHeap::new();
        let stale_time = t(0);
        let fresh_time = t(10);
        heap.push(stale_time, 1);
        heap.push(fresh_time, 1);

        let mut issued = FxHashMap::default();
        issued.insert(
            1,
            Issued {
                expires_at: fresh_time,
                content: b"x".to_vec(),
            },
        );

        // stale_time entry is popped and discarded first (it's earlier),
        // fresh_time entry matches issued and is returned.
        assert_eq!(heap.pop_live(&issued), Some((fresh_time, 1)));
        assert_eq!(heap.pop_live(&issued), None);
    }

    #[test]
    fn tie_break_orders_by_work_id() {
        let mut heap = ExpiryHeap::new();
        let same = t(5);
        heap.push(same, 9);
        heap.push(same, 3);

        let mut issued = FxHashMap::default();
        for id in [9u64, 3u64] {
            issued.insert(
                id,
                Issued {
                    expires_at: same,
                    content: vec![],
                },
            );
        }
        assert_eq!(heap.pop_live(&issued), Some((same, 3)));
        assert_eq!(heap.pop_live(&issued), Some((same, 9)));
    }
}
