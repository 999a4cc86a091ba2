//! `Ring` - lock-free MPMC queue of fixed-stride elements.
//!
//! Every transfer runs the same three phases:
//!
//! 1. reserve a counter range by CAS on the head (`reserve`)
//! 2. copy bytes into or out of the reserved slots, unsynchronized
//! 3. publish by advancing the tail in reservation order (`publish`)
//!
//! The counters are free-running `u32`s; only slot addressing masks them.

use std::fmt;
use std::mem::size_of;

use bytemuck::Pod;
use crossbeam_utils::CachePadded;

use crate::backoff::{BackoffKind, RingBackoff};
use crate::config::RingConfig;
use crate::error::{RingError, Result};
use crate::publish::update_tail;
use crate::reserve::{move_head, Behavior, HeadMove};
use crate::slots::SlotArray;
use crate::sync::{AtomicU32, Ordering};

/// Result of a bulk transfer with status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transfer {
    /// Elements moved
    pub count: usize,
    /// Free slots left after an enqueue, or entries left after a dequeue,
    /// as seen by this call's reservation.
    pub remaining: usize,
}

pub struct Ring<'a> {
    producer_head: CachePadded<AtomicU32>,
    producer_tail: CachePadded<AtomicU32>,
    consumer_head: CachePadded<AtomicU32>,
    consumer_tail: CachePadded<AtomicU32>,
    size: u32,
    capacity: u32,
    elem_size: usize,
    backoff: BackoffKind,
    slots: SlotArray<'a>,
}

// SAFETY: slot bytes are only touched by the thread holding the matching
// reservation, and reservations are handed out by CAS on the heads.
unsafe impl Send for Ring<'_> {}
unsafe impl Sync for Ring<'_> {}

impl<'a> Ring<'a> {
    /// Create a ring over caller storage, deriving the slot count from its length.
    pub fn new(storage: &'a mut [u8], elem_size: usize) -> Result<Self> {
        Self::with_config(storage, RingConfig::new(elem_size)?)
    }

    /// Create a ring over caller storage.
    ///
    /// The storage stays owned by the caller and is borrowed for the ring's
    /// lifetime. The used region is zeroed.
    pub fn with_config(storage: &'a mut [u8], config: RingConfig) -> Result<Self> {
        let size = config.for_storage(storage.len())?;
        let slots = SlotArray::borrowed(storage, size, config.elem_size);
        Ok(Self::from_parts(slots, &config))
    }

    fn from_parts(slots: SlotArray<'a>, config: &RingConfig) -> Self {
        let size = slots.slots() as u32;
        let start = config.start_index;
        trace_debug!(
            size,
            capacity = size - 1,
            elem_size = config.elem_size,
            start_index = start,
            "ring created"
        );
        Self {
            producer_head: CachePadded::new(AtomicU32::new(start)),
            producer_tail: CachePadded::new(AtomicU32::new(start)),
            consumer_head: CachePadded::new(AtomicU32::new(start)),
            consumer_tail: CachePadded::new(AtomicU32::new(start)),
            size,
            capacity: size - 1,
            elem_size: config.elem_size,
            backoff: config.backoff,
            slots,
        }
    }

    /// Tear the ring down, releasing its bookkeeping.
    ///
    /// Borrowed storage goes back to the caller untouched; a block from
    /// [`Ring::allocate`] is freed. All producers and consumers must be done.
    pub fn destroy(self) {
        let stats = self.stats();
        if !stats.is_quiescent() {
            trace_warn!(
                producer_in_flight = stats.producer_in_flight,
                consumer_in_flight = stats.consumer_in_flight,
                "ring destroyed with reservations in flight"
            );
        }
        trace_debug!(used = stats.used, "ring destroyed");
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    /// Total slot count (power of 2)
    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Usable slots: `size - 1`
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    // ------------------------------------------------------------------------
    // Enqueue
    // ------------------------------------------------------------------------

    /// Enqueue the whole elements in `src`. Returns how many went in.
    ///
    /// `src.len() / elem_size` elements are requested; trailing bytes short
    /// of a full element are ignored. Under `Fixed` the result is 0 or all.
    #[inline]
    pub fn enqueue_bulk(&self, src: &[u8], behavior: Behavior) -> usize {
        self.do_enqueue(src, behavior).count
    }

    /// `enqueue_bulk`, also reporting the free space left.
    #[inline]
    pub fn enqueue_bulk_with_status(&self, src: &[u8], behavior: Behavior) -> Transfer {
        self.do_enqueue(src, behavior)
    }

    /// Enqueue as many elements of `src` as fit.
    #[inline]
    pub fn enqueue_burst(&self, src: &[u8]) -> usize {
        self.do_enqueue(src, Behavior::Variable).count
    }

    /// Enqueue exactly one element.
    pub fn enqueue(&self, elem: &[u8]) -> Result<()> {
        self.check_len(elem.len())?;
        if self.do_enqueue(elem, Behavior::Fixed).count == 1 {
            Ok(())
        } else {
            Err(RingError::Full)
        }
    }

    fn do_enqueue(&self, src: &[u8], behavior: Behavior) -> Transfer {
        let requested = self.whole_elements(src.len());
        let mut backoff = RingBackoff::new(self.backoff);
        let claim = move_head(
            &self.producer_head,
            &self.consumer_tail,
            self.capacity,
            requested,
            behavior,
            &mut backoff,
        );
        if claim.is_empty() {
            self.trace_oversized(requested, behavior);
            return Self::transfer(&claim);
        }

        let bytes = claim.count as usize * self.elem_size;
        // SAFETY: [old_head, new_head) is ours until update_tail below
        unsafe { self.slots.write(claim.old_head, &src[..bytes]) };
        update_tail(
            &self.producer_tail,
            claim.old_head,
            claim.new_head,
            &mut backoff,
        );
        Self::transfer(&claim)
    }

    // ------------------------------------------------------------------------
    // Dequeue
    // ------------------------------------------------------------------------

    /// Dequeue into `dst`, up to `dst.len() / elem_size` elements.
    /// Returns how many came out. Under `Fixed` the result is 0 or all.
    #[inline]
    pub fn dequeue_bulk(&self, dst: &mut [u8], behavior: Behavior) -> usize {
        self.do_dequeue(dst, behavior).count
    }

    /// `dequeue_bulk`, also reporting the entries left.
    #[inline]
    pub fn dequeue_bulk_with_status(&self, dst: &mut [u8], behavior: Behavior) -> Transfer {
        self.do_dequeue(dst, behavior)
    }

    /// Dequeue as many elements as are available, up to what fits in `dst`.
    #[inline]
    pub fn dequeue_burst(&self, dst: &mut [u8]) -> usize {
        self.do_dequeue(dst, Behavior::Variable).count
    }

    /// Dequeue exactly one element into `dst`.
    pub fn dequeue(&self, dst: &mut [u8]) -> Result<()> {
        self.check_len(dst.len())?;
        if self.do_dequeue(dst, Behavior::Fixed).count == 1 {
            Ok(())
        } else {
            Err(RingError::Empty)
        }
    }

    fn do_dequeue(&self, dst: &mut [u8], behavior: Behavior) -> Transfer {
        let requested = self.whole_elements(dst.len());
        let mut backoff = RingBackoff::new(self.backoff);
        let claim = move_head(
            &self.consumer_head,
            &self.producer_tail,
            0,
            requested,
            behavior,
            &mut backoff,
        );
        if claim.is_empty() {
            self.trace_oversized(requested, behavior);
            return Self::transfer(&claim);
        }

        let bytes = claim.count as usize * self.elem_size;
        // SAFETY: [old_head, new_head) is ours and published by producers
        unsafe { self.slots.read(claim.old_head, &mut dst[..bytes]) };
        update_tail(
            &self.consumer_tail,
            claim.old_head,
            claim.new_head,
            &mut backoff,
        );
        Self::transfer(&claim)
    }

    // ------------------------------------------------------------------------
    // Typed views (byte copies of Pod values, no interpretation)
    // ------------------------------------------------------------------------

    pub fn enqueue_slice<T: Pod>(&self, items: &[T], behavior: Behavior) -> Result<usize> {
        self.check_len(size_of::<T>())?;
        Ok(self.enqueue_bulk(bytemuck::cast_slice(items), behavior))
    }

    pub fn dequeue_slice<T: Pod>(&self, out: &mut [T], behavior: Behavior) -> Result<usize> {
        self.check_len(size_of::<T>())?;
        Ok(self.dequeue_bulk(bytemuck::cast_slice_mut(out), behavior))
    }

    pub fn enqueue_value<T: Pod>(&self, value: &T) -> Result<()> {
        self.enqueue(bytemuck::bytes_of(value))
    }

    pub fn dequeue_value<T: Pod>(&self) -> Result<T> {
        let mut value = T::zeroed();
        self.dequeue(bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Inspection (approximate under concurrency, never blocks)
    // ------------------------------------------------------------------------

    /// Published entries not yet claimed by a consumer.
    pub fn len(&self) -> usize {
        // consumer side first: it never passes the producer tail
        let consumer_head = self.consumer_head.load(Ordering::Acquire);
        let producer_tail = self.producer_tail.load(Ordering::Acquire);
        producer_tail.wrapping_sub(consumer_head).min(self.capacity) as usize
    }

    /// Slots a producer could reserve right now.
    pub fn free_count(&self) -> usize {
        let consumer_tail = self.consumer_tail.load(Ordering::Acquire);
        let producer_head = self.producer_head.load(Ordering::Acquire);
        self.capacity
            .saturating_sub(producer_head.wrapping_sub(consumer_tail)) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    pub fn stats(&self) -> RingStats {
        let consumer_tail = self.consumer_tail.load(Ordering::Acquire);
        let consumer_head = self.consumer_head.load(Ordering::Acquire);
        let producer_tail = self.producer_tail.load(Ordering::Acquire);
        let producer_head = self.producer_head.load(Ordering::Acquire);
        RingStats {
            size: self.size(),
            capacity: self.capacity(),
            elem_size: self.elem_size,
            used: producer_tail.wrapping_sub(consumer_head).min(self.capacity) as usize,
            free: self
                .capacity
                .saturating_sub(producer_head.wrapping_sub(consumer_tail)) as usize,
            producer_head,
            producer_tail,
            consumer_head,
            consumer_tail,
            producer_in_flight: producer_head.wrapping_sub(producer_tail),
            consumer_in_flight: consumer_head.wrapping_sub(consumer_tail),
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    #[inline]
    fn whole_elements(&self, bytes: usize) -> u32 {
        u32::try_from(bytes / self.elem_size).unwrap_or(u32::MAX)
    }

    #[inline]
    fn check_len(&self, actual: usize) -> Result<()> {
        if actual == self.elem_size {
            Ok(())
        } else {
            Err(RingError::ElementSize {
                expected: self.elem_size,
                actual,
            })
        }
    }

    #[inline]
    fn transfer(claim: &HeadMove) -> Transfer {
        Transfer {
            count: claim.count as usize,
            remaining: claim.remaining() as usize,
        }
    }

    #[inline(always)]
    fn trace_oversized(&self, requested: u32, behavior: Behavior) {
        if behavior == Behavior::Fixed && requested > self.capacity {
            trace_trace!(
                requested,
                capacity = self.capacity,
                "fixed request exceeds ring capacity"
            );
        }
    }
}

impl Ring<'static> {
    /// Create a ring over a freshly allocated, zeroed heap block.
    ///
    /// The slot count must be pinned with `RingConfig::with_slots`.
    pub fn allocate(config: RingConfig) -> Result<Self> {
        config.validate()?;
        let size = config
            .slots
            .ok_or_else(|| RingError::config("Slot count required to allocate storage"))?;
        let slots = SlotArray::allocate(size, config.elem_size);
        Ok(Self::from_parts(slots, &config))
    }
}

impl fmt::Debug for Ring<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("stats", &self.stats())
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Point-in-time view of a ring's counters. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingStats {
    pub size: usize,
    pub capacity: usize,
    pub elem_size: usize,
    /// Published, unconsumed entries
    pub used: usize,
    /// Slots available to producers
    pub free: usize,
    pub producer_head: u32,
    pub producer_tail: u32,
    pub consumer_head: u32,
    pub consumer_tail: u32,
    /// Reserved but unpublished enqueue slots
    pub producer_in_flight: u32,
    /// Reserved but unreleased dequeue slots
    pub consumer_in_flight: u32,
}

impl RingStats {
    /// No reservation in flight on either side.
    pub fn is_quiescent(&self) -> bool {
        self.producer_in_flight == 0 && self.consumer_in_flight == 0
    }
}

impl fmt::Display for RingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ring size:{}", self.size)?;
        writeln!(f, "ring capacity:{}", self.capacity)?;
        writeln!(f, "ring usage:{}", self.used)?;
        write!(
            f,
            "prod_head:{}, prod_tail:{}, cons_head:{}, cons_tail:{}",
            self.producer_head, self.producer_tail, self.consumer_head, self.consumer_tail
        )
    }
}
