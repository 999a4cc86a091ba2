//! Head reservation: claim a contiguous counter range with one CAS.
//!
//! The same protocol runs on both sides of the ring:
//!
//! | side     | head (moved)    | limit (observed) | headroom   |
//! |----------|-----------------|------------------|------------|
//! | producer | `producer_head` | `consumer_tail`  | `capacity` |
//! | consumer | `consumer_head` | `producer_tail`  | `0`        |
//!
//! `available = headroom + limit - head` in wrapping 32-bit arithmetic:
//! free slots for a producer, published entries for a consumer.
//!
//! The decision step is the pure [`plan_head_move`]. [`cas_retry`] applies a
//! step function to an atomic until its CAS lands or the step aborts.

use crate::backoff::Backoff;
use crate::sync::{AtomicU32, Ordering};

/// What to do when fewer slots are available than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// All or nothing.
    Fixed,
    /// As many as currently available.
    Variable,
}

/// Counter values observed at the start of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    pub head: u32,
    pub limit: u32,
}

/// Outcome of one planning step.
///
/// `count == 0` means nothing is reserved and no CAS must be attempted.
/// Otherwise the caller owns `[old_head, new_head)` once the CAS lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadMove {
    pub old_head: u32,
    pub new_head: u32,
    pub count: u32,
    /// Free slots (producer) or entries (consumer) seen before the move.
    pub available: u32,
}

impl HeadMove {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Availability left for others after this move.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.available - self.count
    }
}

/// Decide how far to move the head. Pure: no atomics, no side effects.
#[inline]
pub fn plan_head_move(
    observed: Observed,
    headroom: u32,
    requested: u32,
    behavior: Behavior,
) -> HeadMove {
    let available = headroom
        .wrapping_add(observed.limit)
        .wrapping_sub(observed.head);

    let count = if requested > available {
        match behavior {
            Behavior::Fixed => 0,
            Behavior::Variable => available,
        }
    } else {
        requested
    };

    HeadMove {
        old_head: observed.head,
        new_head: observed.head.wrapping_add(count),
        count,
        available,
    }
}

/// One step of a CAS retry loop.
pub(crate) enum Transition<R> {
    /// Try to swap the cell from the observed value to `new`.
    Swap { new: u32, result: R },
    /// Stop without touching the cell.
    Abort(R),
}

/// Run `step` against fresh observations of `cell` until its CAS lands or
/// it aborts. A failed CAS re-runs `step` from scratch.
#[inline]
pub(crate) fn cas_retry<B, R, F>(cell: &AtomicU32, backoff: &mut B, mut step: F) -> R
where
    B: Backoff,
    F: FnMut(u32) -> Transition<R>,
{
    loop {
        let current = cell.load(Ordering::Acquire);
        match step(current) {
            Transition::Abort(result) => return result,
            Transition::Swap { new, result } => {
                match cell.compare_exchange_weak(current, new, Ordering::Acquire, Ordering::Relaxed)
                {
                    Ok(_) => {
                        backoff.reset();
                        return result;
                    }
                    Err(_) => backoff.snooze(),
                }
            }
        }
    }
}

/// Claim up to `requested` slots by moving `head` against `limit`.
#[inline]
pub(crate) fn move_head<B: Backoff>(
    head: &AtomicU32,
    limit: &AtomicU32,
    headroom: u32,
    requested: u32,
    behavior: Behavior,
    backoff: &mut B,
) -> HeadMove {
    cas_retry(head, backoff, |current| {
        // Acquire pairs with the opposite side's release in update_tail:
        // slots below `limit` are fully written (or fully read) by now.
        let observed = Observed {
            head: current,
            limit: limit.load(Ordering::Acquire),
        };
        let plan = plan_head_move(observed, headroom, requested, behavior);
        if plan.is_empty() {
            Transition::Abort(plan)
        } else {
            Transition::Swap {
                new: plan.new_head,
                result: plan,
            }
        }
    })
}
