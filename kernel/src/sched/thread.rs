//! Thread attributes observed by the scheduler.

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use bitflags::bitflags;

use super::cpu::Cpu;
use super::ring::RingNode;

bitflags! {
    /// Thread state bits consulted across scheduler code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadFlags: u32 {
        /// The thread is mutating a scheduler; preemption events must not
        /// touch scheduler state from under it.
        const LOCK_SCHED = 1 << 0;
        /// The thread has just been displaced by a preemption.
        const PREEMPT = 1 << 1;
    }
}

/// A kernel thread, reduced to what scheduling observes: a priority, the
/// CPU the thread is bound to, state flags, and one embedded run-ring link.
pub struct Thread {
    /// Scheduling priority; `priority % SCHED_BANDS` places the thread.
    pub priority: u32,
    state_flags: AtomicU32,
    current_cpu: AtomicPtr<Cpu>,
    queue_entry: UnsafeCell<RingNode>,
}

// The embedded ring node is only touched while the owning scheduler's lock
// is held.
unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

impl Thread {
    pub const fn new(priority: u32) -> Self {
        Thread {
            priority,
            state_flags: AtomicU32::new(0),
            current_cpu: AtomicPtr::new(core::ptr::null_mut()),
            queue_entry: UnsafeCell::new(RingNode::new()),
        }
    }

    pub fn state_flags(&self) -> ThreadFlags {
        ThreadFlags::from_bits_truncate(self.state_flags.load(Ordering::Acquire))
    }

    pub fn set_state_flag(&self, flags: ThreadFlags) {
        self.state_flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub fn clear_state_flag(&self, flags: ThreadFlags) {
        self.state_flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// The CPU this thread is bound to, if any.
    pub fn current_cpu(&self) -> Option<NonNull<Cpu>> {
        NonNull::new(self.current_cpu.load(Ordering::Acquire))
    }

    pub(super) fn set_current_cpu(&self, cpu: Option<&Cpu>) {
        let ptr = cpu.map_or(core::ptr::null_mut(), |c| c as *const Cpu as *mut Cpu);
        self.current_cpu.store(ptr, Ordering::Release);
    }

    pub(super) fn queue_entry(&self) -> *mut RingNode {
        self.queue_entry.get()
    }
}

/// A wrapper around `NonNull<Thread>` that implements `Send` and `Sync`.
///
/// # Safety
///
/// This is sound because:
/// 1. Thread queue state is only mutated with the owning scheduler's lock
///    held.
/// 2. Thread memory is managed by the kernel and outlives any scheduler
///    residency that references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPtr(NonNull<Thread>);

impl ThreadPtr {
    pub fn new(ptr: NonNull<Thread>) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> NonNull<Thread> {
        self.0
    }

    pub fn as_raw(&self) -> *mut Thread {
        self.0.as_ptr()
    }

    /// # Safety
    ///
    /// The thread must still be alive.
    pub unsafe fn as_ref<'a>(&self) -> &'a Thread {
        unsafe { self.0.as_ref() }
    }
}

unsafe impl Send for ThreadPtr {}
unsafe impl Sync for ThreadPtr {}

impl From<NonNull<Thread>> for ThreadPtr {
    fn from(ptr: NonNull<Thread>) -> Self {
        Self::new(ptr)
    }
}

impl From<&'static Thread> for ThreadPtr {
    fn from(thread: &'static Thread) -> Self {
        Self(NonNull::from(thread))
    }
}
