// src/ids.rs

//! Monotonic id sources shared by concurrent callers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free monotonically increasing counter.
///
/// Every call to [`IdSource::next`] returns a value no other caller has
/// observed, regardless of how threads interleave.
#[derive(Debug)]
pub struct IdSource {
    next: AtomicU64,
}

impl IdSource {
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The value the next call to `next` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
