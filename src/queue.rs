//! Unbounded MPMC FIFO: a Michael & Scott two-lock-free queue.
//!
//! A dummy sentinel node anchors both ends; producers CAS onto `tail`,
//! consumers CAS `head` forward, and both sides "help" advance a stale
//! `tail` left behind by a producer that lost a race. Safe memory
//! reclamation for the popped sentinel/old nodes uses `crossbeam_epoch`,
//! the standard idiomatic-Rust mechanism for exactly this problem
//! (hand-rolling epoch tracking, as a from-scratch `AtomicUsize` counter
//! would, reimplements what the crate already gets right).

use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use std::sync::atomic::Ordering;

struct Node<T> {
    data: Option<T>,
    next: Atomic<Node<T>>,
}

/// An unbounded, lock-free, multi-producer multi-consumer FIFO.
pub struct LockFreeQueue<T> {
    head: Atomic<Node<T>>,
    tail: Atomic<Node<T>>,
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::init()
    }
}

impl<T> LockFreeQueue<T> {
    /// Installs a dummy sentinel node and returns the empty queue.
    pub fn init() -> Self {
        let sentinel = Owned::new(Node {
            data: None,
            next: Atomic::null(),
        });
        let guard = epoch::pin();
        let sentinel = sentinel.into_shared(&guard);
        LockFreeQueue {
            head: Atomic::from(sentinel),
            tail: Atomic::from(sentinel),
        }
    }

    /// Enqueues `value`. Only fails if boxing the new node fails, which in
    /// practice only happens on allocator exhaustion.
    pub fn enqueue(&self, value: T) {
        let guard = epoch::pin();
        let new_node = Owned::new(Node {
            data: Some(value),
            next: Atomic::null(),
        })
        .into_shared(&guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, &guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, &guard);
            if next.is_null() {
                // Tail really is the last node: try to link the new node on.
                if tail_ref
                    .next
                    .compare_exchange(
                        Shared::null(),
                        new_node,
                        Ordering::Release,
                        Ordering::Relaxed,
                        &guard,
                    )
                    .is_ok()
                {
                    // Help advance tail; ignore failure, another thread may
                    // have already done it.
                    let _ = self.tail.compare_exchange(
                        tail,
                        new_node,
                        Ordering::Release,
                        Ordering::Relaxed,
                        &guard,
                    );
                    return;
                }
            } else {
                // Tail is stale; help advance it before retrying.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    &guard,
                );
            }
        }
    }

    /// Dequeues the oldest element, or `None` if the queue is (at the
    /// instant of the call) empty.
    pub fn dequeue(&self) -> Option<T> {
        let guard = epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, &guard);
            match unsafe { next.as_ref() } {
                None => return None,
                Some(next_ref) => {
                    if self
                        .head
                        .compare_exchange(
                            head,
                            next,
                            Ordering::Release,
                            Ordering::Relaxed,
                            &guard,
                        )
                        .is_ok()
                    {
                        // `head` (the prior sentinel) is now unreachable;
                        // the epoch guard defers its reclamation until no
                        // other thread could still be reading it.
                        unsafe {
                            guard.defer_destroy(head);
                        }
                        // `next` becomes the new sentinel; its `data` is
                        // taken out and the slot is logically emptied by
                        // never being read again as `data`.
                        let value = unsafe {
                            let mutable = next_ref as *const Node<T> as *mut Node<T>;
                            (*mutable).data.take()
                        };
                        return value;
                    }
                }
            }
        }
    }

    /// Approximate emptiness check: true iff the sentinel's `next` was
    /// null at the instant of the load. May be stale under concurrent
    /// enqueue/dequeue.
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        let head = self.head.load(Ordering::Acquire, &guard);
        let head_ref = unsafe { head.deref() };
        head_ref.next.load(Ordering::Acquire, &guard).is_null()
    }

    /// Approximate length, capped at 1000 to bound the cost of a size
    /// query on an unbounded structure.
    pub fn size_approx(&self) -> usize {
        const CAP: usize = 1000;
        let guard = epoch::pin();
        let mut count = 0;
        let mut cur = self.head.load(Ordering::Acquire, &guard);
        loop {
            if count >= CAP {
                return CAP;
            }
            let cur_ref = unsafe { cur.deref() };
            let next = cur_ref.next.load(Ordering::Acquire, &guard);
            if next.is_null() {
                return count;
            }
            count += 1;
            cur = next;
        }
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        // Single-threaded at drop time: walk and free every remaining node.
        unsafe {
            let guard = epoch::unprotected();
            let mut cur = self.head.load(Ordering::Relaxed, guard);
            while !cur.is_null() {
                let next = cur.deref().next.load(Ordering::Relaxed, guard);
                drop(cur.into_owned());
                cur = next;
            }
        }
    }
}

unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}
