//! Fixed-stride slot array over a byte block.
//!
//! Slot `i` lives at `(i & mask) * stride`. Payload bytes are copied in and
//! out verbatim; nothing here interprets them. Copies go through a raw base
//! pointer so threads owning disjoint reservations never materialize
//! overlapping `&mut [u8]` borrows of the block.

use std::marker::PhantomData;
use std::ptr::{self, NonNull};

#[derive(Debug)]
pub(crate) struct SlotArray<'a> {
    base: NonNull<u8>,
    /// Bytes reachable through `base` (whole caller block, or our allocation)
    len: usize,
    slots: usize,
    mask: u32,
    stride: usize,
    /// Set when the block came from `Box<[u8]>` and must be freed on drop
    owned: bool,
    _storage: PhantomData<&'a mut [u8]>,
}

impl<'a> SlotArray<'a> {
    /// Borrow `storage` as `slots` slots of `stride` bytes, zeroing them.
    pub(crate) fn borrowed(storage: &'a mut [u8], slots: usize, stride: usize) -> Self {
        debug_assert!(slots.is_power_of_two());
        debug_assert!(slots * stride <= storage.len());
        storage[..slots * stride].fill(0);
        let len = storage.len();
        // A slice pointer is never null, even for an empty slice
        let base = NonNull::from(storage).cast::<u8>();
        Self {
            base,
            len,
            slots,
            mask: (slots - 1) as u32,
            stride,
            owned: false,
            _storage: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn slots(&self) -> usize {
        self.slots
    }

    /// Byte range of `count` slots starting at counter `start`, split at the wrap.
    #[inline]
    fn spans(&self, start: u32, count: usize) -> [(usize, usize); 2] {
        debug_assert!(count <= self.slots, "slot range larger than ring");
        let idx = (start & self.mask) as usize;
        let first = count.min(self.slots - idx);
        let head = (idx * self.stride, first * self.stride);
        let tail = (0, (count - first) * self.stride);
        debug_assert!(head.0 + head.1 <= self.len && tail.1 <= self.len);
        [head, tail]
    }

    /// Copy whole elements from `src` into slots `[start, start + n)`.
    ///
    /// # Safety
    ///
    /// - The calling thread must own the slot range via a successful reservation.
    /// - The range must not be published until this returns.
    #[inline]
    pub(crate) unsafe fn write(&self, start: u32, src: &[u8]) {
        debug_assert_eq!(src.len() % self.stride, 0);
        let mut offset = 0;
        for (at, bytes) in self.spans(start, src.len() / self.stride) {
            if bytes == 0 {
                continue;
            }
            ptr::copy_nonoverlapping(src.as_ptr().add(offset), self.base.as_ptr().add(at), bytes);
            offset += bytes;
        }
    }

    /// Copy slots `[start, start + n)` out into `dst`.
    ///
    /// # Safety
    ///
    /// - The calling thread must own the slot range via a successful reservation.
    /// - The slots must have been published by the producer side.
    #[inline]
    pub(crate) unsafe fn read(&self, start: u32, dst: &mut [u8]) {
        debug_assert_eq!(dst.len() % self.stride, 0);
        let mut offset = 0;
        for (at, bytes) in self.spans(start, dst.len() / self.stride) {
            if bytes == 0 {
                continue;
            }
            ptr::copy_nonoverlapping(
                self.base.as_ptr().add(at),
                dst.as_mut_ptr().add(offset),
                bytes,
            );
            offset += bytes;
        }
    }
}

impl SlotArray<'static> {
    /// Heap-allocate a zeroed block for `slots` slots of `stride` bytes.
    pub(crate) fn allocate(slots: usize, stride: usize) -> Self {
        debug_assert!(slots.is_power_of_two());
        let block: Box<[u8]> = vec![0u8; slots * stride].into_boxed_slice();
        let len = block.len();
        // SAFETY: Box::into_raw never returns null
        let base = unsafe { NonNull::new_unchecked(Box::into_raw(block) as *mut u8) };
        Self {
            base,
            len,
            slots,
            mask: (slots - 1) as u32,
            stride,
            owned: true,
            _storage: PhantomData,
        }
    }
}

impl Drop for SlotArray<'_> {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: base/len came from Box::into_raw in `allocate`
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.base.as_ptr(),
                    self.len,
                )));
            }
        }
    }
}
