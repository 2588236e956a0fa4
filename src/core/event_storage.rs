//! Bounded storage for serialized diagnostic events
//!
//! Subsystems append complete, already-serialized events (trace events,
//! heartbeats, reboot records) as they occur; the transport collaborator
//! drains them later as a single payload. Events are stored back-to-back
//! with a small length prefix; the prefix is storage bookkeeping only and
//! is stripped on drain, where the batched-events header takes over the job
//! of delimiting events for the reader.

use crate::core::batched_events::build_header;
use crate::core::error::{BlackboxError, Result};
use tracing::{debug, warn};

const EVENT_LEN_PREFIX: usize = 2;

/// Fixed-capacity event accumulator
#[derive(Debug, Clone)]
pub struct EventStorage {
    buf: Vec<u8>,
    num_events: u32,
    capacity: usize,
}

impl EventStorage {
    /// Create storage bounded to `capacity` bytes (prefix overhead included)
    pub fn new(capacity: usize) -> Self {
        EventStorage {
            buf: Vec::with_capacity(capacity),
            num_events: 0,
            capacity,
        }
    }

    /// Append one serialized event
    ///
    /// Fails without touching prior contents when the event does not fit;
    /// dropping the newest event under pressure keeps the oldest ones,
    /// which usually explain what went wrong first.
    pub fn store(&mut self, event: &[u8]) -> Result<()> {
        if event.is_empty() {
            return Err(BlackboxError::EmptyEvent);
        }

        let needed = EVENT_LEN_PREFIX + event.len();
        let free = self.bytes_free();
        if needed > free || event.len() > usize::from(u16::MAX) {
            warn!(
                "Event storage full: dropping {}-byte event ({} bytes free)",
                event.len(),
                free
            );
            return Err(BlackboxError::OutOfSpace { needed, free });
        }

        self.buf
            .extend_from_slice(&(event.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(event);
        self.num_events += 1;
        Ok(())
    }

    /// Number of buffered events
    pub fn event_count(&self) -> u32 {
        self.num_events
    }

    pub fn bytes_used(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes_free(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Drain all buffered events as one transmission payload
    ///
    /// A single event is returned bare; multiple events are prefixed with
    /// the CBOR batched-events header counting them. Returns `None` when
    /// nothing is buffered.
    pub fn drain_batch(&mut self) -> Option<Vec<u8>> {
        if self.num_events == 0 {
            return None;
        }

        let header = build_header(self.num_events);
        let mut out = Vec::with_capacity(header.length + self.buf.len());
        out.extend_from_slice(header.as_bytes());

        let mut offset = 0;
        while offset < self.buf.len() {
            let len = u16::from_le_bytes([self.buf[offset], self.buf[offset + 1]]) as usize;
            offset += EVENT_LEN_PREFIX;
            out.extend_from_slice(&self.buf[offset..offset + len]);
            offset += len;
        }

        debug!(
            "Draining {} event(s), {} payload bytes",
            self.num_events,
            out.len()
        );
        self.buf.clear();
        self.num_events = 0;
        Some(out)
    }
}
