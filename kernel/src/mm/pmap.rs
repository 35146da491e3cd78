//! External contracts of the physical allocator and the hardware page map.
//!
//! Architecture ports implement these; the VM core only allocates frames,
//! installs whole mappings and tears them down again.

use alloc::sync::Arc;

use super::{PhysAddr, Protection, VirtAddr};

/// A pool of physical frames: single-frame allocate and release.
pub trait FramePool: Send + Sync {
    /// Allocate one physical frame.
    fn alloc(&self) -> Option<PhysAddr>;

    /// Release one physical frame.
    fn free(&self, page: PhysAddr);
}

/// The slice of the machine a page map draws its frames from.
pub struct KernSlice {
    memory: Arc<dyn FramePool>,
}

impl KernSlice {
    pub fn new(memory: Arc<dyn FramePool>) -> Self {
        KernSlice { memory }
    }

    /// The frame pool serving this slice.
    pub fn allocator(&self) -> &dyn FramePool {
        &*self.memory
    }
}

/// A hardware page map.
pub trait PageMap: Send + Sync {
    /// Inclusive virtual-address bounds this map serves.
    fn address_range(&self) -> (VirtAddr, VirtAddr);

    /// Install a mapping for one page.
    fn enter(&self, va: VirtAddr, pa: PhysAddr, prot: Protection, flags: u32);

    /// Tear down every mapping in `[begin, end]`.
    fn remove(&self, begin: VirtAddr, end: VirtAddr);

    /// The slice whose frame pool backs kernel memory under this map.
    fn kernslice(&self) -> &KernSlice;
}
