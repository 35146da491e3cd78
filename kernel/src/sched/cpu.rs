//! Per-CPU state the scheduler hangs off.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicPtr, Ordering};

use alloc::boxed::Box;
use spin::Once;

use super::scheduler::Scheduler;
use super::thread::{Thread, ThreadPtr};

/// One processor: its scheduler and the thread it is executing.
pub struct Cpu {
    id: u32,
    scheduler: Once<Box<Scheduler>>,
    current: AtomicPtr<Thread>,
}

impl Cpu {
    pub const fn new(id: u32) -> Self {
        Cpu {
            id,
            scheduler: Once::new(),
            current: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The scheduler bound to this CPU.
    ///
    /// Panics if called before the scheduler was instantiated.
    pub fn scheduler(&self) -> &Scheduler {
        self.scheduler.get().expect("cpu has no scheduler")
    }

    /// Install the scheduler. At most one installation per CPU sticks.
    pub(super) fn install_scheduler(&self, scheduler: Box<Scheduler>) {
        self.scheduler.call_once(|| scheduler);
    }

    /// The thread currently executing on this CPU.
    pub fn current_thread(&self) -> Option<ThreadPtr> {
        NonNull::new(self.current.load(Ordering::Acquire)).map(ThreadPtr::new)
    }

    pub fn set_current_thread(&self, thread: ThreadPtr) {
        self.current.store(thread.as_raw(), Ordering::Release);
    }
}
