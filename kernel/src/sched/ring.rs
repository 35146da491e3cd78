//! Intrusive ordered ring.
//!
//! A doubly linked circular list headed by a sentinel node. The sentinel's
//! `next` neighbour is the head end, its `prev` neighbour the tail end; an
//! empty ring is the sentinel linked to itself, so the empty test is a
//! single pointer compare.

use core::ptr;

/// One link in an ordered ring, embedded in its owner.
///
/// While the node is linked, `data` points back at the owner.
#[derive(Debug)]
pub struct RingNode {
    prev: *mut RingNode,
    next: *mut RingNode,
    pub data: *mut (),
}

impl RingNode {
    pub const fn new() -> Self {
        RingNode {
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
            data: ptr::null_mut(),
        }
    }
}

impl Default for RingNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Sentinel-headed ring. Must not move after [`Ring::init`]: the sentinel
/// links are self-referential.
pub struct Ring {
    head: RingNode,
}

impl Ring {
    pub const fn new() -> Self {
        Ring {
            head: RingNode::new(),
        }
    }

    /// Link the sentinel to itself. Call once the ring sits at its final
    /// address, before any insert.
    pub fn init(&mut self) {
        let sentinel: *mut RingNode = &mut self.head;
        self.head.prev = sentinel;
        self.head.next = sentinel;
    }

    pub fn is_empty(&self) -> bool {
        ptr::eq(self.head.next, &self.head)
    }

    /// Insert `node` at the head end.
    ///
    /// # Safety
    ///
    /// The ring must be initialised. `node` must point to a live, unlinked
    /// node that stays valid and in place until it is removed again.
    pub unsafe fn insert_head(&mut self, node: *mut RingNode) {
        let sentinel: *mut RingNode = &mut self.head;
        unsafe {
            (*node).prev = sentinel;
            (*node).next = self.head.next;
            (*self.head.next).prev = node;
        }
        self.head.next = node;
    }

    /// Unlink and return the node at the tail end.
    ///
    /// # Safety
    ///
    /// The ring must be initialised and non-empty.
    pub unsafe fn remove_tail(&mut self) -> *mut RingNode {
        let node = self.head.prev;
        unsafe { unlink(node) };
        node
    }
}

/// Unlink `node` from the ring it is on, leaving it self-linked.
///
/// # Safety
///
/// `node` must be linked on an initialised ring.
pub unsafe fn unlink(node: *mut RingNode) {
    unsafe {
        (*(*node).prev).next = (*node).next;
        (*(*node).next).prev = (*node).prev;
        (*node).prev = node;
        (*node).next = node;
    }
}
