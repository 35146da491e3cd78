//! Typed object pools.
//!
//! Long-lived kernel objects come from named pools. A pool either refills
//! itself from the heap on demand (`AUTO_REFILL`), or serves a critical
//! reserve that is topped up explicitly and fails cleanly once drained, so
//! the allocation machinery never recurses into the allocator it backs.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bitflags::bitflags;
use spin::Mutex;

bitflags! {
    /// Pool behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ZoneFlags: u32 {
        /// Fall back to the heap when the free list is empty.
        const AUTO_REFILL = 1 << 0;
    }
}

/// A pool of `T` instances with a spin-locked free list.
pub struct Zone<T> {
    name: &'static str,
    flags: ZoneFlags,
    free: Mutex<Vec<Box<T>>>,
}

impl<T: Default> Zone<T> {
    pub fn new(flags: ZoneFlags, name: &'static str) -> Self {
        Zone {
            name,
            flags,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Take an object from the pool.
    ///
    /// Recycled objects keep their previous contents; callers reinitialise
    /// the fields they use. Returns `None` once a non-refilling reserve is
    /// dry.
    pub fn alloc(&self) -> Option<Box<T>> {
        if let Some(obj) = self.free.lock().pop() {
            return Some(obj);
        }
        if self.flags.contains(ZoneFlags::AUTO_REFILL) {
            Some(Box::default())
        } else {
            None
        }
    }

    /// Return an object to the pool.
    pub fn free(&self, obj: Box<T>) {
        self.free.lock().push(obj);
    }

    /// Top the free list up to `max` objects if it has dropped below `min`.
    pub fn refill(&self, min: usize, max: usize) {
        let mut free = self.free.lock();
        if free.len() >= min {
            return;
        }
        while free.len() < max {
            free.push(Box::default());
        }
    }

    /// Objects currently sitting in the free list.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
