//! In-memory FIFO buffer of records pending delivery.
//!
//! Records enqueue at the tail and leave from the head, so delivery order
//! matches logging order. The buffer is unbounded during normal operation;
//! the `max_buffer` cap is applied only when a failed batch is reinserted at
//! the front, at which point the newest overflow is dropped and the oldest
//! records survive.

use std::collections::VecDeque;

use crate::record::EventRecord;

/// Ordered queue of records awaiting a flush, oldest first.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    records: VecDeque<EventRecord>,
}

impl BatchBuffer {
    #[must_use]
    pub fn new() -> Self {
        BatchBuffer::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record at the tail.
    pub fn push(&mut self, record: EventRecord) {
        self.records.push_back(record);
    }

    /// Removes and returns up to `max` records from the head — one flush's
    /// worth. Remaining records keep their order.
    pub fn take_batch(&mut self, max: usize) -> Vec<EventRecord> {
        let take = max.min(self.records.len());
        self.records.drain(..take).collect()
    }

    /// Removes and returns everything, in order. Used for the final flush at
    /// shutdown.
    pub fn drain_all(&mut self) -> Vec<EventRecord> {
        self.records.drain(..).collect()
    }

    /// Puts records back at the head, preserving their order ahead of
    /// everything currently buffered.
    pub fn prepend(&mut self, records: Vec<EventRecord>) {
        for record in records.into_iter().rev() {
            self.records.push_front(record);
        }
    }

    /// Reinserts a failed batch at the head, then truncates the buffer to
    /// `cap` records. Truncation drops from the tail, so the oldest records
    /// survive and the newest overflow is discarded.
    pub fn reinsert_front(&mut self, records: Vec<EventRecord>, cap: usize) {
        self.prepend(records);
        self.records.truncate(cap);
    }

    /// Messages of the buffered records, in order. Test helper.
    #[cfg(test)]
    pub(crate) fn messages(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.message.as_str()).collect()
    }
}
