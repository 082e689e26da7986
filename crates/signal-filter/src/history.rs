//! Fixed-capacity FIFO history

use std::collections::VecDeque;

/// Ordered history that keeps only the newest `capacity` items.
///
/// Pushing into a full history evicts the oldest item first.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty history. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item if the history was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.data.len() >= self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(item);
        evicted
    }

    /// Oldest retained item
    pub fn front(&self) -> Option<&T> {
        self.data.front()
    }

    /// Newest retained item
    pub fn back(&self) -> Option<&T> {
        self.data.back()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = BoundedHistory::new(3);

        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert_eq!(history.push(3), None);
        assert!(history.is_full());

        assert_eq!(history.push(4), Some(1));
        assert_eq!(history.len(), 3);
        assert_eq!(history.front(), Some(&2));
        assert_eq!(history.back(), Some(&4));
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut history = BoundedHistory::new(0);
        history.push("a");
        history.push("b");

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.back(), Some(&"b"));
    }
}
