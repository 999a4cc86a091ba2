//! Tail publish: make a finished reservation visible to the other side.
//!
//! Reservations can finish copying in any order, but tails only move in
//! reservation order. A thread publishing `[old, new)` waits until the tail
//! reaches `old`, i.e. until every earlier reservation has published.

use crate::backoff::Backoff;
use crate::sync::{AtomicU32, Ordering};

/// Spin until `cell == expected`.
#[inline]
pub(crate) fn wait_until_equal<B: Backoff>(cell: &AtomicU32, expected: u32, backoff: &mut B) {
    // Acquire: the predecessor's slot writes must happen-before our release
    // below, or a consumer acquiring our tail would not see them.
    while cell.load(Ordering::Acquire) != expected {
        backoff.snooze();
    }
    backoff.reset();
}

/// Publish `[old, new)` on `tail` once all earlier reservations have.
#[inline]
pub(crate) fn update_tail<B: Backoff>(tail: &AtomicU32, old: u32, new: u32, backoff: &mut B) {
    wait_until_equal(tail, old, backoff);
    tail.store(new, Ordering::Release);
}
