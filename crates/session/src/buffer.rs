//! Bounded display buffer for received records
//!
//! `RecordBuffer` keeps records in arrival order. It is append-only apart
//! from a bulk clear, and once full it evicts the oldest record for every
//! new one so a long-running session cannot grow without limit.

use std::collections::VecDeque;
use std::sync::Arc;

use livedebug_config::{DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};

/// One opaque line of streamed text
pub type Record = Arc<str>;

/// Arrival-ordered record buffer with drop-oldest eviction
#[derive(Debug)]
pub struct RecordBuffer {
    /// Records, oldest first
    records: VecDeque<Record>,
    /// Maximum number of records kept
    capacity: usize,
    /// Records ever appended (not reset by clear)
    total_appended: u64,
    /// Records dropped to make room (not reset by clear)
    evicted: u64,
}

impl RecordBuffer {
    /// Create a buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a buffer with the given capacity, clamped to `1..=MAX_BUFFER_CAPACITY`
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BUFFER_CAPACITY);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total_appended: 0,
            evicted: 0,
        }
    }

    /// Append a record at the end
    ///
    /// Returns the evicted record when the buffer was full.
    pub fn append(&mut self, record: Record) -> Option<Record> {
        let evicted = if self.records.len() == self.capacity {
            self.evicted += 1;
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        self.total_appended += 1;
        evicted
    }

    /// Drop every buffered record, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let cleared = self.records.len();
        self.records.clear();
        cleared
    }

    /// Copy of the current contents, oldest first
    ///
    /// Records are reference counted so this clones pointers, not text. The
    /// returned vector is independent of later appends or clears.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.iter().cloned().collect()
    }

    /// Iterate over the buffered records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records ever appended
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Records dropped because the buffer was full
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl Default for RecordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
