//! In-memory batch under construction

use std::mem;

use tracebatch_domain::TelemetryEvent;

/// Upper bound on the capacity reserved up front.
const PREALLOCATED_EVENTS: usize = 1024;

/// Ordered buffer that hands out a batch once it reaches `max_batch_size`
///
/// Owned exclusively by the flush loop.
#[derive(Debug)]
pub struct Accumulator {
    events: Vec<TelemetryEvent>,
    max_batch_size: usize,
}

impl Accumulator {
    pub fn new(max_batch_size: usize) -> Self {
        let max_batch_size = max_batch_size.max(1);
        Self { events: Vec::with_capacity(preallocation(max_batch_size)), max_batch_size }
    }

    /// Append an event, returning the full batch when the size limit is hit.
    pub fn push(&mut self, event: TelemetryEvent) -> Option<Vec<TelemetryEvent>> {
        self.events.push(event);
        if self.events.len() >= self.max_batch_size {
            return Some(self.swap_out());
        }
        None
    }

    /// Take whatever is buffered, or `None` when empty.
    pub fn take(&mut self) -> Option<Vec<TelemetryEvent>> {
        if self.events.is_empty() {
            return None;
        }
        Some(self.swap_out())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn swap_out(&mut self) -> Vec<TelemetryEvent> {
        mem::replace(&mut self.events, Vec::with_capacity(preallocation(self.max_batch_size)))
    }
}

fn preallocation(max_batch_size: usize) -> usize {
    max_batch_size.min(PREALLOCATED_EVENTS)
}
