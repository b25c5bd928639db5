//! Fixed-size object pool with O(1), lock-free acquire/release.
//!
//! A single contiguous slab is carved into `object_size`-rounded slots
//! (rounded up to 16 bytes, then to a 64-byte cache line), threaded into a
//! singly-linked intrusive free list. `alloc` pops the free-list head via
//! a CAS loop; when the free list is empty it falls back to the global
//! allocator and hands back a pointer outside the slab's address range, a
//! distinction callers never need to make (`free` re-derives it from the
//! pointer's address).
//!
//! # Safety invariants
//! - `free(ptr)` must only ever be called once per pointer returned by
//!   `alloc()`, and only on the allocator it came from.
//! - A slot's bytes are reinterpreted as a `FreeNode` only while the slot
//!   is on the free list; once popped, the caller owns the bytes as `T`.
//! - ABA on the free-list head is tolerated: a node is never logically
//!   reused for anything other than its own slot, so swapping the head
//!   back to a stale-but-still-valid pointer cannot corrupt the list.

use std::alloc::{alloc, dealloc, Layout};
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::error::{Error, Result};

const CACHE_LINE: usize = 64;

/// Rounds `size` up to 16 bytes, then up to a 64-byte cache line.
fn rounded_object_size(size: usize) -> usize {
    let to16 = (size.max(1) + 15) & !15;
    (to16 + CACHE_LINE - 1) & !(CACHE_LINE - 1)
}

#[repr(C)]
struct FreeNode {
    next: AtomicPtr<FreeNode>,
}

/// A fixed-size object pool for `T`.
pub struct SlabAllocator<T> {
    base: NonNull<u8>,
    slab_bytes: usize,
    object_size: usize,
    free_head: AtomicPtr<FreeNode>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for SlabAllocator<T> {}
unsafe impl<T: Send> Sync for SlabAllocator<T> {}

impl<T> SlabAllocator<T> {
    /// Allocates one slab sized to cover `initial_objects`, threads the
    /// free list through it, and returns the allocator. Fails with
    /// `Error::OutOfMemory` if the requested layout is invalid or the
    /// global allocator cannot satisfy it.
    pub fn create(initial_objects: usize) -> Result<Self> {
        let object_size = rounded_object_size(size_of::<T>().max(size_of::<FreeNode>()));
        let objects = initial_objects.max(1);
        let slab_bytes = object_size * objects;
        let layout = Layout::from_size_align(slab_bytes, CACHE_LINE)
            .map_err(|e| Error::OutOfMemory(format!("invalid slab layout: {e}")))?;
        let base = NonNull::new(unsafe { alloc(layout) })
            .ok_or_else(|| Error::OutOfMemory(format!("failed to allocate {slab_bytes} bytes")))?;

        // Thread the free list through the slab: each slot's first bytes
        // become a `FreeNode` pointing at the next slot, terminating in
        // null at the last slot.
        let mut head: *mut FreeNode = ptr::null_mut();
        for i in (0..objects).rev() {
            let slot = unsafe { base.as_ptr().add(i * object_size) } as *mut FreeNode;
            unsafe {
                slot.write(FreeNode {
                    next: AtomicPtr::new(head),
                });
            }
            head = slot;
        }

        Ok(SlabAllocator {
            base,
            slab_bytes,
            object_size,
            free_head: AtomicPtr::new(head),
            _marker: PhantomData,
        })
    }

    /// Pops the head of the free list via a CAS loop. Falls back to the
    /// global allocator when the list is empty; the returned pointer lies
    /// outside the slab's range in that case, and `free` handles both
    /// transparently.
    pub fn alloc(&self) -> NonNull<T> {
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            if head.is_null() {
                return Self::alloc_from_global();
            }
            let next = unsafe { (*head).next.load(Ordering::Relaxed) };
            if self
                .free_head
                .compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return unsafe { NonNull::new_unchecked(head as *mut T) };
            }
        }
    }

    fn alloc_from_global() -> NonNull<T> {
        let layout = Layout::new::<T>();
        let ptr = unsafe { alloc(layout) } as *mut T;
        NonNull::new(ptr).expect("global allocator out of memory")
    }

    /// Returns whether `ptr` lies inside this slab's backing memory.
    fn owns(&self, ptr: NonNull<T>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        addr >= base && addr < base + self.slab_bytes
    }

    /// Pushes `ptr` back onto the free list via CAS if it came from this
    /// slab; otherwise deallocates it with the global allocator.
    ///
    /// # Safety
    /// `ptr` must have been returned by a prior call to `self.alloc()` and
    /// must not be freed more than once.
    pub unsafe fn free(&self, ptr: NonNull<T>) {
        if !self.owns(ptr) {
            dealloc(ptr.as_ptr() as *mut u8, Layout::new::<T>());
            return;
        }
        let node = ptr.as_ptr() as *mut FreeNode;
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            (*node).next = AtomicPtr::new(head);
            if self
                .free_head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    pub fn object_size(&self) -> usize {
        self.object_size
    }
}

impl<T> Drop for SlabAllocator<T> {
    fn drop(&mut self) {
        let layout = Layout::from_size_align(self.slab_bytes, CACHE_LINE)
            .expect("layout computed at create() must still be valid");
        unsafe { dealloc(self.base.as_ptr(), layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_16_then_cache_line() {
        assert_eq!(rounded_object_size(1), 64);
        assert_eq!(rounded_object_size(20), 64);
        assert_eq!(rounded_object_size(100), 128);
    }

    #[test]
    fn alloc_then_free_reuses_slot() {
        let slab = SlabAllocator::<u64>::create(4).unwrap();
        let p1 = slab.alloc();
        unsafe {
            p1.as_ptr().write(42);
            slab.free(p1);
        }
        let p2 = slab.alloc();
        assert_eq!(p1, p2, "freed slot should be reused by the next alloc");
        unsafe { slab.free(p2) };
    }

    #[test]
    fn exhausting_the_slab_falls_back_to_global() {
        let slab = SlabAllocator::<u64>::create(2).unwrap();
        let mut ptrs = vec![slab.alloc(), slab.alloc(), slab.alloc(), slab.alloc()];
        // At least the first two came from the slab; regardless of order,
        // the allocator must never hand out the same address twice.
        ptrs.sort();
        let mut dedup = ptrs.clone();
        dedup.dedup();
        assert_eq!(ptrs.len(), dedup.len());
        for p in ptrs {
            unsafe { slab.free(p) };
        }
    }

    #[test]
    fn concurrent_alloc_free_never_double_hands_out_a_slot() {
        use std::sync::Arc;
        use std::thread;

        let slab = Arc::new(SlabAllocator::<[u8; 32]>::create(64).unwrap());
        let mut handles = vec![];
        for _ in 0..8 {
            let slab = slab.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let p = slab.alloc();
                    unsafe { slab.free(p) };
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
