//! Segments, their physical backing, and the keyed segment tree.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use super::{PhysAddr, Protection, VirtAddr};

/// Page records per range node.
pub const VM_RANGE_NUM: usize = 16;

/// A fixed-capacity block of physical page records, chained in ascending
/// virtual-offset order. The bitmap marks occupied slots.
#[derive(Debug, Default)]
pub struct VmRange {
    pages: [PhysAddr; VM_RANGE_NUM],
    bitmap: u32,
    pub(super) next: Option<Box<VmRange>>,
}

impl VmRange {
    /// Clear all slots and detach any chain tail. Pool-recycled nodes carry
    /// stale contents.
    pub(super) fn reset(&mut self) {
        self.bitmap = 0;
        self.next = None;
    }

    pub(super) fn set_slot(&mut self, slot: usize, page: PhysAddr) {
        self.pages[slot] = page;
        self.bitmap |= 1 << slot;
    }

    /// The recorded page in `slot`, if the slot is occupied.
    pub fn slot(&self, slot: usize) -> Option<PhysAddr> {
        if self.bitmap & (1 << slot) != 0 {
            Some(self.pages[slot])
        } else {
            None
        }
    }

    pub fn bitmap(&self) -> u32 {
        self.bitmap
    }

    pub fn next(&self) -> Option<&VmRange> {
        self.next.as_deref()
    }
}

/// Physical backing of a segment.
#[derive(Debug, Default)]
pub enum VmMem {
    /// No backing attached yet.
    #[default]
    Empty,
    /// A single page, recorded directly.
    PgAddr(PhysAddr),
    /// A chain of range nodes.
    PmRange(Box<VmRange>),
}

/// One virtual-address segment: an inclusive range, its protection, and
/// its physical backing.
#[derive(Debug, Default)]
pub struct Segment {
    pub begin: VirtAddr,
    pub end: VirtAddr,
    pub prot: Protection,
    pub mem: VmMem,
}

/// Segments keyed by their base address.
///
/// Insertion refuses key collisions and hands the segment back; the
/// ceiling query drives the first-fit sweep.
#[derive(Debug, Default)]
pub struct SegTree {
    map: BTreeMap<u64, Box<Segment>>,
}

impl SegTree {
    pub fn new() -> Self {
        SegTree {
            map: BTreeMap::new(),
        }
    }

    /// Insert `seg` keyed on its base address. On a collision the tree is
    /// left untouched and the segment comes back.
    pub fn insert(&mut self, seg: Box<Segment>) -> Result<(), Box<Segment>> {
        use alloc::collections::btree_map::Entry;
        match self.map.entry(seg.begin.as_u64()) {
            Entry::Occupied(_) => Err(seg),
            Entry::Vacant(slot) => {
                slot.insert(seg);
                Ok(())
            }
        }
    }

    /// The segment with the smallest base address `>= addr`.
    pub fn ceiling(&self, addr: VirtAddr) -> Option<&Segment> {
        self.map.range(addr.as_u64()..).next().map(|(_, seg)| &**seg)
    }

    pub fn get(&self, begin: VirtAddr) -> Option<&Segment> {
        self.map.get(&begin.as_u64()).map(|seg| &**seg)
    }

    pub fn get_mut(&mut self, begin: VirtAddr) -> Option<&mut Segment> {
        self.map.get_mut(&begin.as_u64()).map(|seg| &mut **seg)
    }

    pub fn remove(&mut self, begin: VirtAddr) -> Option<Box<Segment>> {
        self.map.remove(&begin.as_u64())
    }

    /// In-order traversal by base address.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.map.values().map(|seg| &**seg)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
