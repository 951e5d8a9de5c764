// Shared utility helpers for timestamps and sequencing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub fn monotonic_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub fn monotonic_secs(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

pub fn next_sequence(sequence: &AtomicU64) -> u64 {
    sequence.fetch_add(1, Ordering::Relaxed) + 1
}
