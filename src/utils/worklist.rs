use indexmap::IndexSet;
use std::hash::Hash;

/// A set-backed queue with deterministic iteration order.
///
/// Elements are popped in insertion order and inserting an element
/// already present is a no-op, so re-scheduling work is idempotent.
#[derive(Clone, Debug)]
pub struct Worklist<T: Hash + Eq> {
    items: IndexSet<T>,
}

impl<T: Hash + Eq> Default for Worklist<T> {
    fn default() -> Self {
        Worklist {
            items: IndexSet::new(),
        }
    }
}

impl<T: Hash + Eq> Worklist<T> {
    /// Creates an empty worklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an element, ignoring duplicates.
    pub fn push(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    /// Removes and returns the oldest scheduled element.
    pub fn pop(&mut self) -> Option<T> {
        self.items.shift_remove_index(0)
    }

    /// Unschedules an element if it is present.
    pub fn remove(&mut self, item: &T) -> bool {
        self.items.shift_remove(item)
    }

    /// Is this worklist empty?
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The number of scheduled elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Schedules every element of an iterator.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.extend(items)
    }
}

#[cfg(test)]
mod test {
    use super::Worklist;

    #[test]
    fn fifo_and_idempotent() {
        let mut wl = Worklist::new();
        assert!(wl.push(1));
        assert!(wl.push(2));
        assert!(!wl.push(1));
        assert_eq!(wl.pop(), Some(1));
        assert!(wl.push(3));
        assert_eq!(wl.pop(), Some(2));
        assert_eq!(wl.pop(), Some(3));
        assert_eq!(wl.pop(), None);
        assert!(wl.is_empty());
    }
}
