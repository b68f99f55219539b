use crate::error::{Error, Result};

/// Fixed-capacity circular buffer. Once full, each append overwrites the
/// oldest slot.
///
/// No internal locking: callers serialize mutation (see
/// [`MessageCache`](super::MessageCache) for a locked wrapper).
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    /// Next slot to write, always in `0..capacity`.
    cursor: usize,
    /// Set once the cursor has wrapped at least once.
    wrapped: bool,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid("ring buffer capacity must be positive"));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            cursor: 0,
            wrapped: false,
        })
    }

    /// Build a full buffer from existing items. Capacity is `items.len()` and
    /// the next write lands on `start`, or on slot 0 when `start` is `None`.
    pub fn from_seed(items: Vec<T>, start: Option<usize>) -> Result<Self> {
        let start = start.unwrap_or(0);
        if items.is_empty() {
            return Err(Error::invalid("cannot seed a ring buffer from an empty collection"));
        }
        if start >= items.len() {
            return Err(Error::invalid(format!(
                "start index {start} out of bounds for capacity {}",
                items.len()
            )));
        }
        Ok(Self {
            slots: items.into_iter().map(Some).collect(),
            cursor: start,
            wrapped: true,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Items written so far, saturating at capacity. Removals don't shrink it.
    pub fn len(&self) -> usize {
        if self.wrapped {
            self.capacity()
        } else {
            self.cursor
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.wrapped
    }

    /// Append an item, returning whatever it overwrote.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = self.slots[self.cursor].replace(item);
        self.cursor += 1;
        if self.cursor == self.capacity() {
            self.cursor = 0;
            self.wrapped = true;
        }
        evicted
    }

    /// First item matching `pred`, in scan order.
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.scan_order()
            .find_map(|i| self.slots[i].as_ref().filter(|item| pred(*item)))
    }

    pub fn contains_where(&self, pred: impl FnMut(&T) -> bool) -> bool {
        self.find(pred).is_some()
    }

    /// Clear the first slot matching `pred`. The slot stays in place, empty,
    /// and `len()` is unchanged.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> bool {
        let hit = self
            .scan_order()
            .find(|&i| self.slots[i].as_ref().is_some_and(&mut pred));
        match hit {
            Some(i) => {
                self.slots[i] = None;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.cursor = 0;
        self.wrapped = false;
    }

    /// Live items from oldest to newest. Cleared slots are skipped.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (older, newer) = if self.wrapped {
            (self.cursor..self.capacity(), 0..self.cursor)
        } else {
            (0..self.cursor, 0..0)
        };
        older
            .chain(newer)
            .filter_map(move |i| self.slots[i].as_ref())
    }

    /// Lookup order: from the cursor to the end of storage, then from the
    /// start up to the cursor. Visits every slot exactly once.
    fn scan_order(&self) -> impl Iterator<Item = usize> + use<T> {
        let (cursor, capacity) = (self.cursor, self.capacity());
        (cursor..capacity).chain(0..cursor)
    }
}

impl<T: PartialEq> RingBuffer<T> {
    /// Whether an equal item is live in the buffer.
    pub fn contains(&self, item: &T) -> bool {
        self.contains_where(|x| x == item)
    }
}
