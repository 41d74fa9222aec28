//! Per-connection traffic counters: a read-only snapshot plus an explicit reset,
//! threaded through every connection regardless of `sync`/`async` feature selection.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A point-in-time snapshot of one connection's traffic counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStatistics {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// How many times this connection has been (re)established, including the
    /// initial connect.
    pub connects: u32,
}

/// The mutable counters backing a [`ConnectionStatistics`] snapshot. Atomic so a
/// connection shared across tasks (the async pool's `SharedConnection`, read and
/// written from both the sender and the reader task) needs no extra lock; a
/// single-owner [`crate::sync::Connection`] pays the same small cost for one shared
/// implementation rather than keeping two counter types in sync.
#[derive(Debug, Default)]
pub struct StatisticsCounters {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    connects: AtomicU32,
}

impl StatisticsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, bytes: usize) {
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionStatistics {
        ConnectionStatistics {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.connects.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_traffic() {
        let counters = StatisticsCounters::new();
        counters.record_connect();
        counters.record_sent(12);
        counters.record_received(34);
        let snap = counters.snapshot();
        assert_eq!(snap.connects, 1);
        assert_eq!(snap.bytes_sent, 12);
        assert_eq!(snap.bytes_received, 34);
    }

    #[test]
    fn reset_zeroes_every_counter() {
        let counters = StatisticsCounters::new();
        counters.record_connect();
        counters.record_sent(12);
        counters.reset();
        assert_eq!(counters.snapshot(), ConnectionStatistics::default());
    }
}
