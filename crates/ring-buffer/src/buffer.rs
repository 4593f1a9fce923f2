//! Ring Buffer Implementation

use std::collections::VecDeque;

use crate::Timestamped;

/// Fixed-capacity buffer that overwrites its oldest entry when full.
///
/// Owned by a single engine instance and mutated only from its tick sequence.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Storage, oldest at the front
    storage: VecDeque<T>,
    /// Capacity of the buffer
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an item into the buffer (evicts oldest if full)
    pub fn push(&mut self, item: T) {
        if self.storage.len() >= self.capacity {
            self.storage.pop_front();
        }
        self.storage.push_back(item);
    }

    /// Get the number of items currently in the buffer
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent item
    pub fn latest(&self) -> Option<&T> {
        self.storage.back()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.storage.iter()
    }

    /// The last `count` items in chronological order (oldest first)
    pub fn last_n(&self, count: usize) -> impl Iterator<Item = &T> {
        let skip = self.storage.len().saturating_sub(count);
        self.storage.iter().skip(skip)
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

impl<T: Timestamped> RingBuffer<T> {
    /// Drop every item captured `window_ms` or more before `now_ms`
    pub fn evict_older_than(&mut self, now_ms: u64, window_ms: u64) {
        while let Some(front) = self.storage.front() {
            if now_ms.saturating_sub(front.timestamp_ms()) >= window_ms {
                self.storage.pop_front();
            } else {
                break;
            }
        }
    }

    /// Items captured less than `window_ms` before `now_ms`, oldest first
    pub fn window(&self, now_ms: u64, window_ms: u64) -> impl Iterator<Item = &T> {
        self.storage
            .iter()
            .filter(move |item| now_ms.saturating_sub(item.timestamp_ms()) < window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        timestamp_ms: u64,
        value: u32,
    }

    impl Timestamped for Sample {
        fn timestamp_ms(&self) -> u64 {
            self.timestamp_ms
        }
    }

    fn sample(timestamp_ms: u64, value: u32) -> Sample {
        Sample { timestamp_ms, value }
    }

    #[test]
    fn test_push_and_read() {
        let mut buffer = RingBuffer::new(10);

        for i in 0..5 {
            buffer.push(sample(i * 1000, (i * 100) as u32));
        }

        assert_eq!(buffer.len(), 5);

        let items: Vec<u32> = buffer.last_n(3).map(|s| s.value).collect();
        assert_eq!(items, vec![200, 300, 400]);
        assert_eq!(buffer.latest().map(|s| s.value), Some(400));
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut buffer = RingBuffer::new(5);

        for i in 0..10 {
            buffer.push(sample(0, i * 100));
        }

        assert_eq!(buffer.len(), buffer.capacity());
        assert_eq!(buffer.iter().next().map(|s| s.value), Some(500));
        assert_eq!(buffer.latest().map(|s| s.value), Some(900));
    }

    #[test]
    fn test_last_n_chronological() {
        let mut buffer = RingBuffer::new(8);
        for i in 0..6 {
            buffer.push(i);
        }
        let tail: Vec<_> = buffer.last_n(3).copied().collect();
        assert_eq!(tail, vec![3, 4, 5]);
        assert_eq!(buffer.last_n(50).count(), 6);
    }

    #[test]
    fn test_time_window_is_strict() {
        let mut buffer = RingBuffer::new(16);
        for t in [0, 500, 1000, 1500, 2000] {
            buffer.push(sample(t, t as u32));
        }

        // Entries exactly `window` old fall out of the window
        let in_window: Vec<_> = buffer.window(2000, 2000).map(|s| s.timestamp_ms).collect();
        assert_eq!(in_window, vec![500, 1000, 1500, 2000]);

        buffer.evict_older_than(2000, 2000);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.iter().next().map(|s| s.timestamp_ms), Some(500));
    }

    #[test]
    fn test_clear() {
        let mut buffer = RingBuffer::new(4);
        buffer.push(1);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(capacity in 1usize..64, pushes in 0usize..256) {
            let mut buffer = RingBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(i);
                prop_assert!(buffer.len() <= capacity);
            }
            prop_assert_eq!(buffer.len(), pushes.min(capacity));
        }
    }
}
