//! Time-ordered schedule of pending termination checks.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use super::tracked::TrackedProcess;

/// Delays longer than this are treated as never firing.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The instant `delay` after `now`, saturating instead of overflowing.
///
/// `Duration::MAX` is a valid "never" timeout; it lands about a century out.
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    let mut delay = delay.min(FAR_FUTURE);
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
        delay /= 2;
    }
}

/// A scheduled check. Ordered by deadline, then by insertion order.
struct Entry {
    deadline: Instant,
    seq: u64,
    tracked: TrackedProcess,
}

impl Entry {
    fn key(&self) -> (Instant, u64) {
        (self.deadline, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-heap of tracked processes keyed by `(deadline, sequence number)`.
///
/// The sequence number always increments, so entries sharing a deadline
/// never collide and fire in the order they were scheduled.
#[derive(Default)]
pub struct Schedule {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Schedule the next check of a process.
    pub fn insert(&mut self, deadline: Instant, tracked: TrackedProcess) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            deadline,
            seq,
            tracked,
        }));
    }

    /// The earliest deadline, if anything is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.deadline)
    }

    /// Remove and return the earliest entry if its deadline has passed.
    pub fn pop_due(&mut self, now: Instant) -> Option<TrackedProcess> {
        match self.heap.peek() {
            Some(Reverse(entry)) if entry.deadline <= now => {
                self.heap.pop().map(|Reverse(entry)| entry.tracked)
            }
            _ => None,
        }
    }

    /// Remove every entry matching the predicate, in deadline order.
    pub fn take_where<F>(&mut self, mut predicate: F) -> Vec<TrackedProcess>
    where
        F: FnMut(&TrackedProcess) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.heap.len());
        for entry in self.sorted_entries() {
            if predicate(&entry.tracked) {
                taken.push(entry.tracked);
            } else {
                kept.push(Reverse(entry));
            }
        }
        self.heap = BinaryHeap::from(kept);
        taken
    }

    /// Remove every entry along with its deadline, in deadline order.
    pub fn take_all(&mut self) -> Vec<(Instant, TrackedProcess)> {
        self.sorted_entries()
            .into_iter()
            .map(|entry| (entry.deadline, entry.tracked))
            .collect()
    }

    fn sorted_entries(&mut self) -> Vec<Entry> {
        let entries = std::mem::take(&mut self.heap).into_sorted_vec();
        // into_sorted_vec of Reverse<_> is latest deadline first
        entries.into_iter().rev().map(|Reverse(entry)| entry).collect()
    }
}
