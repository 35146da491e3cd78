//! The kernel VM root: object pools, the kernel address space, and the
//! critical allocation path.
//!
//! Critical allocations back the VM machinery itself, so every object they
//! need comes from reserves that fail cleanly instead of recursing into
//! the allocator being built.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::error::KernelError;
use crate::platform::{self, CapStage};
use crate::zone::{Zone, ZoneFlags};

use super::pmap::{FramePool, KernSlice, PageMap};
use super::seg::{Segment, VmMem, VmRange, VM_RANGE_NUM};
use super::vas::AddressSpace;
use super::{page_round_up, Protection, VirtAddr, PAGE_SIZE};

/// Watermarks for the critical reserves.
const RESERVE_MIN: usize = 64;
const RESERVE_MAX: usize = 64;

/// Kernel virtual-memory root. Owns the kernel address space and the pools
/// the allocation paths draw from.
pub struct VmManager {
    kernel_as: AddressSpace,
    seg_zone: Zone<Segment>,
    seg_reserve: Zone<Segment>,
    range_reserve: Zone<VmRange>,
}

impl VmManager {
    /// Bring up kernel VM on `pmap`. Requires working MMU support.
    pub fn new(pmap: Arc<dyn PageMap>) -> Self {
        assert!(
            platform::cap_stage() >= CapStage::Mmu,
            "kernel VM requires the MMU platform stage"
        );

        let vm = VmManager {
            kernel_as: AddressSpace::new(pmap),
            seg_zone: Zone::new(ZoneFlags::AUTO_REFILL, "vm segments"),
            seg_reserve: Zone::new(ZoneFlags::empty(), "vm segment reserve"),
            range_reserve: Zone::new(ZoneFlags::empty(), "vm range reserve"),
        };
        vm.refill();

        log::debug!(
            "vm: kernel address space {:#x}..={:#x}",
            vm.kernel_as.begin().as_u64(),
            vm.kernel_as.end().as_u64()
        );
        vm
    }

    /// Top up the critical reserves. Call from housekeeping wherever
    /// ordinary allocation is legal.
    pub fn refill(&self) {
        self.seg_reserve.refill(RESERVE_MIN, RESERVE_MAX);
        self.range_reserve.refill(RESERVE_MIN, RESERVE_MAX);
    }

    pub fn kernel_as(&self) -> &AddressSpace {
        &self.kernel_as
    }

    /// Carve a fresh unbacked segment out of the kernel address space,
    /// from the ordinary segment pool.
    pub fn create_entry(&self, size: u64) -> Result<VirtAddr, KernelError> {
        let mut segs = self.kernel_as.segs().lock();
        self.kernel_as.create_entry(&mut segs, &self.seg_zone, size)
    }

    /// Like [`Self::create_entry`], but drawing from the critical reserve
    /// so the segment can be had without any ordinary allocation.
    pub fn create_entry_critical(&self, size: u64) -> Result<VirtAddr, KernelError> {
        let mut segs = self.kernel_as.segs().lock();
        self.kernel_as
            .create_entry(&mut segs, &self.seg_reserve, size)
    }

    /// Allocate a page-aligned kernel virtual range, back every page with
    /// a physical frame and map it read+write.
    ///
    /// Returns the granted base address and the rounded size. On failure
    /// nothing is left behind: frames, mappings and the segment are all
    /// rolled back.
    pub fn alloc_critical(&self, size: u64) -> Result<(VirtAddr, u64), KernelError> {
        log::trace!("vm: alloc_critical({})", size);

        let lsiz = page_round_up(size).ok_or(KernelError::InvalidArgument)?;

        let kernel_as = &self.kernel_as;
        let mut segs = kernel_as.segs().lock();

        let begin = kernel_as.create_entry(&mut segs, &self.seg_reserve, lsiz)?;

        let seg = segs.get_mut(begin).expect("created segment vanished");
        let (seg_begin, seg_end) = (seg.begin, seg.end);
        if !Self::seg_kcfill(seg, kernel_as.pmap(), &self.range_reserve) {
            // The backing failed and its mappings are already torn down.
            // Take the segment back out so the address space does not
            // accumulate unusable holes.
            let seg = segs.remove(begin).expect("created segment vanished");
            self.seg_reserve.free(seg);
            return Err(KernelError::OutOfMemory);
        }

        Ok((seg_begin, seg_end.as_u64() - seg_begin.as_u64() + 1))
    }

    /// Release the allocation based at `addr`: tear down its mappings,
    /// hand its frames back to the pool and drop the segment.
    pub fn free_critical(&self, addr: VirtAddr) -> Result<(), KernelError> {
        let kernel_as = &self.kernel_as;
        let mut segs = kernel_as.segs().lock();

        let mut seg = segs.remove(addr).ok_or(KernelError::InvalidArgument)?;

        let pmap = kernel_as.pmap();
        pmap.remove(seg.begin, seg.end);

        let pool = pmap.kernslice().allocator();
        match core::mem::take(&mut seg.mem) {
            VmMem::Empty => {}
            VmMem::PgAddr(page) => pool.free(page),
            VmMem::PmRange(head) => Self::release_chain(head, pool, &self.range_reserve),
        }

        self.seg_reserve.free(seg);
        log::trace!("vm: free_critical({:#x})", addr.as_u64());
        Ok(())
    }

    /// Give `seg` kernel read+write backing under `pmap`. On failure the
    /// partially installed mapping range is removed again.
    fn seg_kcfill(seg: &mut Segment, pmap: &dyn PageMap, ranges: &Zone<VmRange>) -> bool {
        let size = seg.end.as_u64() - seg.begin.as_u64() + 1;
        seg.prot = Protection::KERNEL;

        match Self::mem_kcfilled(pmap, seg.begin, size, pmap.kernslice(), ranges) {
            Some(mem) => {
                seg.mem = mem;
                true
            }
            None => {
                pmap.remove(seg.begin, seg.end);
                false
            }
        }
    }

    /// Build the physical backing for `size` bytes at `begin`, installing
    /// a mapping for every frame as it is acquired.
    ///
    /// A single page is recorded directly; anything larger becomes a chain
    /// of range nodes filled in groups of up to [`VM_RANGE_NUM`]. If a
    /// frame or a range node cannot be had, everything acquired so far is
    /// released and `None` comes back; the caller tears down the mappings.
    fn mem_kcfilled(
        pmap: &dyn PageMap,
        begin: VirtAddr,
        size: u64,
        slice: &KernSlice,
        ranges: &Zone<VmRange>,
    ) -> Option<VmMem> {
        let pages = (size / PAGE_SIZE) as usize;
        if pages < 1 {
            return None;
        }

        let pool = slice.allocator();

        if pages == 1 {
            let page = pool.alloc()?;
            pmap.enter(begin, page, Protection::KERNEL, 0);
            return Some(VmMem::PgAddr(page));
        }

        let mut head = ranges.alloc()?;
        head.reset();

        if Self::fill_chain(&mut head, pmap, pool, ranges, begin, pages).is_err() {
            log::warn!("vm: backing fill failed, rolling back {} pages", pages);
            Self::release_chain(head, pool, ranges);
            return None;
        }
        Some(VmMem::PmRange(head))
    }

    /// Fill `head` and as many chained ranges as needed with `pages`
    /// freshly mapped frames. On `Err` the chain holds exactly the frames
    /// acquired so far, bitmap-recorded for the unwind.
    fn fill_chain(
        head: &mut VmRange,
        pmap: &dyn PageMap,
        pool: &dyn FramePool,
        ranges: &Zone<VmRange>,
        begin: VirtAddr,
        pages: usize,
    ) -> Result<(), ()> {
        let mut range: &mut VmRange = head;
        let mut remaining = pages;
        let mut va = begin;

        loop {
            let group = remaining.min(VM_RANGE_NUM);
            for slot in 0..group {
                let page = pool.alloc().ok_or(())?;
                range.set_slot(slot, page);
                pmap.enter(va, page, Protection::KERNEL, 0);
                va = va.add(PAGE_SIZE);
            }

            remaining -= group;
            if remaining == 0 {
                return Ok(());
            }

            let mut next = ranges.alloc().ok_or(())?;
            next.reset();
            range = range.next.insert(next).as_mut();
        }
    }

    /// Walk a whole range chain, returning every recorded frame to the
    /// pool and every node to its reserve.
    fn release_chain(head: Box<VmRange>, pool: &dyn FramePool, ranges: &Zone<VmRange>) {
        let mut cursor = Some(head);
        while let Some(mut range) = cursor {
            for slot in 0..VM_RANGE_NUM {
                if let Some(page) = range.slot(slot) {
                    pool.free(page);
                }
            }
            cursor = range.next.take();
            range.reset();
            ranges.free(range);
        }
    }
}
