//! Shared stubs for the integration tests: a frame pool with injectable
//! failure and a page map that records what was mapped and unmapped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use argon_kernel::mm::{FramePool, KernSlice, PageMap, PhysAddr, Protection, VirtAddr, PAGE_SIZE};

/// Frame pool handing out ascending frame addresses; can be told to fail
/// after a fixed number of grants.
pub struct StubPool {
    attempts: AtomicUsize,
    freed: AtomicUsize,
    fail_after: usize,
}

impl StubPool {
    pub fn new() -> Arc<Self> {
        Self::failing_after(usize::MAX)
    }

    pub fn failing_after(fail_after: usize) -> Arc<Self> {
        Arc::new(StubPool {
            attempts: AtomicUsize::new(0),
            freed: AtomicUsize::new(0),
            fail_after,
        })
    }

    pub fn granted(&self) -> usize {
        self.attempts.load(Ordering::Relaxed).min(self.fail_after)
    }

    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::Relaxed)
    }
}

impl FramePool for StubPool {
    fn alloc(&self) -> Option<PhysAddr> {
        let n = self.attempts.fetch_add(1, Ordering::Relaxed);
        if n >= self.fail_after {
            return None;
        }
        Some(PhysAddr::new(0x4000_0000 + n as u64 * PAGE_SIZE))
    }

    fn free(&self, _page: PhysAddr) {
        self.freed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Page map stub over a fixed virtual range.
pub struct StubPmap {
    range: (VirtAddr, VirtAddr),
    slice: KernSlice,
    entered: Mutex<Vec<(u64, u64)>>,
    removed: Mutex<Vec<(u64, u64)>>,
}

impl StubPmap {
    pub fn new(begin: u64, end: u64, pool: Arc<StubPool>) -> Arc<Self> {
        Arc::new(StubPmap {
            range: (VirtAddr::new(begin), VirtAddr::new(end)),
            slice: KernSlice::new(pool),
            entered: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        })
    }

    pub fn entered(&self) -> Vec<(u64, u64)> {
        self.entered.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(u64, u64)> {
        self.removed.lock().unwrap().clone()
    }
}

impl PageMap for StubPmap {
    fn address_range(&self) -> (VirtAddr, VirtAddr) {
        self.range
    }

    fn enter(&self, va: VirtAddr, pa: PhysAddr, _prot: Protection, _flags: u32) {
        self.entered.lock().unwrap().push((va.as_u64(), pa.as_u64()));
    }

    fn remove(&self, begin: VirtAddr, end: VirtAddr) {
        self.removed.lock().unwrap().push((begin.as_u64(), end.as_u64()));
    }

    fn kernslice(&self) -> &KernSlice {
        &self.slice
    }
}
