use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique numeric identifiers.
pub trait IdProvider: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Time-derived ids: milliseconds since the epoch, bumped past the last
/// issued value so that rapid creation never repeats an id.
#[derive(Debug, Default)]
pub struct ClockIds {
    last: AtomicU64,
}

impl ClockIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdProvider for ClockIds {
    fn next_id(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Plain counter, handy for deterministic tests.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdProvider for SequentialIds {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn work_order_code(id: u64) -> String {
    format!("OT-{}", id)
}

pub fn quotation_code(id: u64) -> String {
    format!("COT-{}", id)
}
