//! Scheduler state: run-rings and decay bands.
//!
//! A scheduler keeps one ring and one signed decay counter per priority
//! band. Every selection pass resets the counter of each empty band to its
//! table value and decrements the counter of each runnable band; among the
//! runnable bands, the lowest counter wins and is reset. Low table values
//! therefore come up often, high values rarely, and a runnable band that
//! waits drives its counter arbitrarily negative until it must win.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicPtr, Ordering};

use spin::Mutex;

use super::ring::Ring;
use super::thread::{Thread, ThreadPtr};
use super::{SCHED_BANDS, SCHED_PRIOS};

/// Per-CPU scheduler: the banded run queue and the idle thread returned
/// when nothing is runnable.
pub struct Scheduler {
    pub(super) run: Mutex<RunQueue>,
    idle: AtomicPtr<Thread>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler {
            run: Mutex::new(RunQueue::new()),
            idle: AtomicPtr::new(core::ptr::null_mut()),
        }
    }
}

impl Scheduler {
    /// Reinitialise a (possibly pool-recycled) scheduler in place.
    ///
    /// Must run after the instance has reached its final address: the ring
    /// sentinels are self-referential.
    pub(super) fn reset(&mut self, idle: ThreadPtr) {
        self.run.get_mut().init();
        self.idle.store(idle.as_raw(), Ordering::Release);
    }

    /// The idle thread, once installed.
    pub fn idle(&self) -> Option<ThreadPtr> {
        NonNull::new(self.idle.load(Ordering::Acquire)).map(ThreadPtr::new)
    }

    /// Pick the next runnable thread, if any, advancing the decay pass.
    pub fn schedule_next(&self) -> Option<ThreadPtr> {
        self.run.lock().schedule_next()
    }

    /// Threads currently bound to this scheduler, the running one included.
    pub fn thread_count(&self) -> usize {
        self.run.lock().thread_count
    }

    /// Decay counter of `band`. Debug introspection.
    pub fn decay(&self, band: usize) -> i32 {
        self.run.lock().decay[band]
    }

    /// Whether `band` has queued threads.
    pub fn band_runnable(&self, band: usize) -> bool {
        !self.run.lock().rings[band].is_empty()
    }
}

/// The lock-protected part of a scheduler.
pub(super) struct RunQueue {
    rings: [Ring; SCHED_BANDS],
    decay: [i32; SCHED_BANDS],
    pub(super) thread_count: usize,
}

// Ring nodes are only touched while the scheduler lock is held.
unsafe impl Send for RunQueue {}

impl RunQueue {
    pub(super) const fn new() -> Self {
        RunQueue {
            rings: [const { Ring::new() }; SCHED_BANDS],
            decay: [0; SCHED_BANDS],
            thread_count: 0,
        }
    }

    /// Link the ring sentinels and preset every decay counter to its table
    /// value. In-place; see [`Scheduler::reset`].
    pub(super) fn init(&mut self) {
        for band in 0..SCHED_BANDS {
            self.rings[band].init();
            self.decay[band] = SCHED_PRIOS[band];
        }
        self.thread_count = 0;
    }

    /// One selection pass over all bands.
    ///
    /// Empty bands get their decay counter reset; runnable bands get it
    /// decremented, and the first band holding the minimum wins. The
    /// winner's counter is reset and its oldest thread is unlinked from the
    /// tail of the ring.
    pub(super) fn schedule_next(&mut self) -> Option<ThreadPtr> {
        let mut found: Option<(usize, i32)> = None;

        for band in 0..SCHED_BANDS {
            if self.rings[band].is_empty() {
                self.decay[band] = SCHED_PRIOS[band];
                continue;
            }

            self.decay[band] -= 1;

            if found.map_or(true, |(_, lowest)| self.decay[band] < lowest) {
                found = Some((band, self.decay[band]));
            }
        }

        let (band, _) = found?;
        self.decay[band] = SCHED_PRIOS[band];

        let node = unsafe { self.rings[band].remove_tail() };
        let thread = unsafe { (*node).data } as *mut Thread;
        let thread = NonNull::new(thread).expect("enqueued ring node lacks its back-pointer");
        Some(ThreadPtr::new(thread))
    }

    /// Queue `thread` at the head end of its band. The idle thread is never
    /// enqueued. A band that was empty gets its decay counter reset so it
    /// cannot inherit a stale value from a previous emptying.
    pub(super) fn reenqueue(&mut self, idle: Option<ThreadPtr>, thread: ThreadPtr) {
        if Some(thread) == idle {
            return;
        }

        let band = (unsafe { thread.as_ref() }.priority % SCHED_BANDS as u32) as usize;

        if self.rings[band].is_empty() {
            self.decay[band] = SCHED_PRIOS[band];
        }

        let node = unsafe { thread.as_ref() }.queue_entry();
        unsafe {
            (*node).data = thread.as_raw().cast();
            self.rings[band].insert_head(node);
        }
    }
}
