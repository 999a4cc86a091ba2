//! Spin-wait policies for CAS retries and the publish wait.
//!
//! Nothing here sleeps. A policy decides how hard to spin between two
//! attempts, and may give up the time slice once spinning stops paying off.
//!
//! ```rust,ignore
//! use kaos_ring::backoff::{Backoff, ExponentialBackoff};
//!
//! let mut backoff = ExponentialBackoff::new();
//! while !ready() {
//!     backoff.snooze();
//! }
//! ```

use crate::sync::spin_hint;

/// Hook invoked between two attempts of a contended retry loop.
pub trait Backoff {
    /// Wait a little before the next attempt.
    fn snooze(&mut self);

    /// Forget accumulated contention, e.g. after an attempt succeeded.
    fn reset(&mut self);
}

/// One CPU spin hint per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinBackoff;

impl Backoff for SpinBackoff {
    #[inline(always)]
    fn snooze(&mut self) {
        spin_hint();
    }

    #[inline(always)]
    fn reset(&mut self) {}
}

/// Exponential spinning, then yielding the time slice (crossbeam `Backoff`).
#[derive(Debug, Default)]
pub struct ExponentialBackoff {
    #[cfg(not(loom))]
    inner: crossbeam_utils::Backoff,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backoff for ExponentialBackoff {
    #[inline]
    fn snooze(&mut self) {
        #[cfg(not(loom))]
        self.inner.snooze();
        #[cfg(loom)]
        spin_hint();
    }

    #[inline]
    fn reset(&mut self) {
        #[cfg(not(loom))]
        self.inner.reset();
    }
}

/// Backoff policy selected per ring in `RingConfig`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    #[default]
    Spin,
    Exponential,
}

/// Runtime-selected policy used inside ring operations.
#[derive(Debug)]
pub(crate) enum RingBackoff {
    Spin(SpinBackoff),
    Exponential(ExponentialBackoff),
}

impl RingBackoff {
    pub(crate) fn new(kind: BackoffKind) -> Self {
        match kind {
            BackoffKind::Spin => Self::Spin(SpinBackoff),
            BackoffKind::Exponential => Self::Exponential(ExponentialBackoff::new()),
        }
    }
}

impl Backoff for RingBackoff {
    #[inline]
    fn snooze(&mut self) {
        match self {
            Self::Spin(b) => b.snooze(),
            Self::Exponential(b) => b.snooze(),
        }
    }

    #[inline]
    fn reset(&mut self) {
        match self {
            Self::Spin(b) => b.reset(),
            Self::Exponential(b) => b.reset(),
        }
    }
}
