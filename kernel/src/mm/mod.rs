//! Kernel virtual memory.
//!
//! An address space is a keyed tree of non-overlapping segments under one
//! hardware page map. The critical allocation path hands out page-aligned
//! kernel ranges backed by physical frames and mapped read+write.

mod pmap;
mod seg;
mod vas;
mod vmm;

pub use pmap::{FramePool, KernSlice, PageMap};
pub use seg::{SegTree, Segment, VmMem, VmRange, VM_RANGE_NUM};
pub use vas::AddressSpace;
pub use vmm::VmManager;

use bitflags::bitflags;

/// Size of one page / physical frame.
pub const PAGE_SIZE: u64 = 4096;

/// A physical frame address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VirtAddr(pub u64);

impl VirtAddr {
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn add(&self, offset: u64) -> Self {
        Self(self.0 + offset)
    }
}

bitflags! {
    /// Mapping protection bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Protection: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
        /// Plain kernel memory.
        const KERNEL = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Round `size` up to a whole number of pages. `None` on overflow.
pub fn page_round_up(size: u64) -> Option<u64> {
    Some(size.checked_add(PAGE_SIZE - 1)? & !(PAGE_SIZE - 1))
}
