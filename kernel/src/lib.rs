//! Argon kernel core: per-CPU scheduling and kernel virtual memory.
//!
//! The crate is `no_std`. Host builds (unit tests, coverage) link `std` and
//! delegate to the system allocator so the standard `#[test]` harness runs;
//! bare-metal builds bring their own heap.

#![no_std]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]

extern crate alloc;

// Host target: use the system allocator so test code can allocate normally.
#[cfg(not(target_os = "none"))]
extern crate std;

#[cfg(not(target_os = "none"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

#[cfg(target_os = "none")]
use linked_list_allocator::LockedHeap;

#[cfg(target_os = "none")]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

pub mod error;
pub mod mm;
pub mod platform;
pub mod sched;
pub mod zone;

#[cfg(target_os = "none")]
#[alloc_error_handler]
fn alloc_error(layout: core::alloc::Layout) -> ! {
    panic!("kernel heap exhausted: {:?}", layout);
}

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
