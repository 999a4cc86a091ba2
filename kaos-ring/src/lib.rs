//! # kaos-ring
//!
//! Lock-free multi-producer/multi-consumer ring for fixed-stride elements.
//!
//! - Fixed capacity (`size - 1` slots, `size` a power of 2), no growth
//! - Storage is caller-supplied bytes; payloads are copied, never interpreted
//! - Reserve by CAS on the head, copy, publish by advancing the tail in order
//! - `Fixed` (all-or-nothing) and `Variable` (as many as possible) on both sides
//! - No locks, no sleeping: contention is resolved by retry loops
//!
//! ```rust,ignore
//! use kaos_ring::{Behavior, Ring};
//!
//! let mut storage = vec![0u8; 4096];
//! let ring = Ring::new(&mut storage, 4)?;
//! ring.enqueue_slice(&[1u32, 2, 3], Behavior::Fixed)?;
//!
//! let mut out = [0u32; 3];
//! assert_eq!(ring.dequeue_slice(&mut out, Behavior::Fixed)?, 3);
//! ```
//!
//! ## Counters
//!
//! `producer_head`, `producer_tail`, `consumer_head` and `consumer_tail` are
//! free-running `u32`s. Differences are taken modulo 2^32 and only slot
//! addressing masks them with `size - 1`, so counter overflow is harmless.

// Tracing macros - no-op when feature disabled
#[cfg(feature = "tracing")]
macro_rules! trace_debug { ($($arg:tt)*) => { tracing::debug!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug { ($($arg:tt)*) => {} }

#[cfg(feature = "tracing")]
macro_rules! trace_warn { ($($arg:tt)*) => { tracing::warn!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn { ($($arg:tt)*) => {} }

#[cfg(feature = "tracing")]
macro_rules! trace_trace { ($($arg:tt)*) => { tracing::trace!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_trace { ($($arg:tt)*) => {} }

pub mod backoff;
pub mod config;
pub mod error;
mod publish;
pub mod reserve;
mod ring;
mod slots;
mod sync;

pub use backoff::{Backoff, BackoffKind, ExponentialBackoff, SpinBackoff};
pub use config::RingConfig;
pub use error::{Result, RingError};
pub use reserve::{plan_head_move, Behavior, HeadMove, Observed};
pub use ring::{Ring, RingStats, Transfer};
