//! Address spaces and the free-range search.

use alloc::sync::Arc;

use spin::Mutex;

use crate::error::KernelError;
use crate::zone::Zone;

use super::pmap::PageMap;
use super::seg::{SegTree, Segment, VmMem};
use super::{Protection, VirtAddr};

/// A collection of non-overlapping segments under one page map.
pub struct AddressSpace {
    begin: VirtAddr,
    end: VirtAddr,
    pmap: Arc<dyn PageMap>,
    segs: Mutex<SegTree>,
}

impl AddressSpace {
    /// Build an address space covering the bounds its page map reports.
    pub fn new(pmap: Arc<dyn PageMap>) -> Self {
        let (begin, end) = pmap.address_range();
        AddressSpace {
            begin,
            end,
            pmap,
            segs: Mutex::new(SegTree::new()),
        }
    }

    pub fn begin(&self) -> VirtAddr {
        self.begin
    }

    pub fn end(&self) -> VirtAddr {
        self.end
    }

    pub fn pmap(&self) -> &dyn PageMap {
        &*self.pmap
    }

    pub(super) fn segs(&self) -> &Mutex<SegTree> {
        &self.segs
    }

    /// Run `f` over the segment tree. Inspection only; the tree lock is
    /// held for the duration.
    pub fn with_segments<R>(&self, f: impl FnOnce(&SegTree) -> R) -> R {
        f(&self.segs.lock())
    }

    /// Find the lowest free range of `lrp + 1` bytes, sweeping past
    /// occupied segments from the low end.
    ///
    /// First fit: a candidate starts at the space's base (or one past the
    /// segment that displaced it) and must end strictly before the next
    /// segment begins.
    fn find_free(&self, segs: &SegTree, lrp: u64) -> Option<(VirtAddr, VirtAddr)> {
        let mut begin = self.begin.as_u64();
        let mut end = begin.checked_add(lrp)?;

        while end <= self.end.as_u64() {
            if let Some(seg) = segs.ceiling(VirtAddr::new(begin)) {
                if end >= seg.begin.as_u64() {
                    begin = seg.end.as_u64().checked_add(1)?;
                    end = begin.checked_add(lrp)?;
                    continue;
                }
            }
            return Some((VirtAddr::new(begin), VirtAddr::new(end)));
        }
        None
    }

    /// Carve a fresh `size`-byte segment out of this address space,
    /// drawing the segment object from `zone`. The caller holds the tree
    /// lock.
    ///
    /// The new segment starts with empty protection and no backing. On any
    /// failure the candidate goes back to its pool and the tree is left
    /// unchanged.
    pub(super) fn create_entry(
        &self,
        segs: &mut SegTree,
        zone: &Zone<Segment>,
        size: u64,
    ) -> Result<VirtAddr, KernelError> {
        let lrp = size.checked_sub(1).ok_or(KernelError::InvalidArgument)?;

        let mut seg = zone.alloc().ok_or(KernelError::OutOfMemory)?;

        let Some((begin, end)) = self.find_free(segs, lrp) else {
            zone.free(seg);
            return Err(KernelError::AddressSpaceExhausted);
        };

        seg.begin = begin;
        seg.end = end;
        seg.prot = Protection::empty();
        seg.mem = VmMem::Empty;

        match segs.insert(seg) {
            Ok(()) => Ok(begin),
            Err(seg) => {
                zone.free(seg);
                Err(KernelError::AlreadyExists)
            }
        }
    }
}
