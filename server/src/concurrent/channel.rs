// zone_engine_core/server/src/concurrent/channel.rs
use crate::core::types::{ZoneEvent, ZoneId};
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Broadcast endpoint of a zone. Producers publish without blocking; the
/// simulation loop drains it once per tick and forwards to the sessions that
/// can see the zone.
pub struct Channel {
    zone: ZoneId,
    events: SegQueue<ZoneEvent>,
    published: AtomicU64,
}

impl Channel {
    pub fn new(zone: ZoneId) -> Self {
        Channel {
            zone,
            events: SegQueue::new(),
            published: AtomicU64::new(0),
        }
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn publish(&self, event: ZoneEvent) {
        self.events.push(event);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pop(&self) -> Option<ZoneEvent> {
        self.events.pop()
    }

    pub fn drain_batch(&self, max_count: usize) -> Vec<ZoneEvent> {
        let mut batch = Vec::with_capacity(max_count.min(self.events.len()));
        while batch.len() < max_count {
            match self.events.pop() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Total events ever published on this channel.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("zone", &self.zone)
            .field("pending", &self.events.len())
            .finish()
    }
}
