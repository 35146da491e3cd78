//! Per-CPU thread scheduling.
//!
//! Runnable threads live in 32 priority bands per CPU, each band a FIFO
//! ring with a decaying selection counter (see [`scheduler`]). Threads
//! enter a CPU through [`insert`], leave through [`remove`], and are
//! rotated by the platform timer through [`preempt`].
//!
//! The [`ThreadFlags::LOCK_SCHED`] bit is the preemption gate: a thread
//! sets it on itself before taking any scheduler lock and clears it after
//! release. The preemption path consults the flag on the interrupted
//! thread and backs off instead of recursing into a held lock.

mod cpu;
mod ring;
mod scheduler;
mod thread;

pub use cpu::Cpu;
pub use ring::{Ring, RingNode};
pub use scheduler::Scheduler;
pub use thread::{Thread, ThreadFlags, ThreadPtr};

use crate::platform::{self, CapStage};
use crate::zone::{Zone, ZoneFlags};

/// Number of priority bands per scheduler.
pub const SCHED_BANDS: usize = 32;

/// Reset values for the per-band decay counters, indexed by band.
///
/// A band's counter restarts here whenever the band is selected or found
/// empty. Smaller values reach the selection minimum after fewer passes,
/// so band 0 comes up far more often than band 31.
pub const SCHED_PRIOS: [i32; SCHED_BANDS] = [
    1, 5, 11, 19, 28, 38, 49, 60, 72, 84, 97, 110, 123, 137, 151, 165, 180, 195, 210, 225, 240,
    256, 272, 288, 304, 320, 337, 354, 371, 388, 405, 422,
];

/// Scheduler subsystem root. Owns the pool scheduler instances come from.
pub struct Sched {
    zone: Zone<Scheduler>,
}

impl Sched {
    /// Bring up the scheduler subsystem. Requires a working CPU pointer.
    pub fn new() -> Self {
        assert!(
            platform::cap_stage() >= CapStage::CpuPtr,
            "scheduler requires the CPU_PTR platform stage"
        );
        log::debug!("sched: subsystem up");
        Sched {
            zone: Zone::new(ZoneFlags::AUTO_REFILL, "scheduler core"),
        }
    }

    /// Create a scheduler for `cpu` and install it, with `idle` as the
    /// thread handed out when no band is runnable. `idle` is never
    /// enqueued.
    pub fn instantiate(&self, cpu: &Cpu, idle: ThreadPtr) {
        let mut scheduler = self
            .zone
            .alloc()
            .expect("can't allocate the scheduler core");
        scheduler.reset(idle);
        cpu.install_scheduler(scheduler);
        log::debug!("sched: cpu{} scheduler online", cpu.id());
    }
}

impl Default for Sched {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert `thread` into the scheduler of `cpu`, binding the thread to it.
///
/// Runs on `cpu`: the thread currently installed there is marked
/// `LOCK_SCHED` for the duration of the queue update so a preemption event
/// arriving meanwhile backs off (see [`preempt`]).
pub fn insert(cpu: &Cpu, thread: ThreadPtr) {
    let scheduler = cpu.scheduler();

    unsafe { thread.as_ref() }.set_current_cpu(Some(cpu));

    let myself = cpu.current_thread();
    if let Some(me) = myself {
        unsafe { me.as_ref() }.set_state_flag(ThreadFlags::LOCK_SCHED);
    }

    {
        let mut run = scheduler.run.lock();
        run.reenqueue(scheduler.idle(), thread);
        run.thread_count += 1;
    }

    if let Some(me) = myself {
        unsafe { me.as_ref() }.clear_state_flag(ThreadFlags::LOCK_SCHED);
    }
}

/// Remove the next runnable thread from the scheduler of `cpu` and unbind
/// it.
///
/// The thread count is decremented even when nothing was runnable; callers
/// are expected to know the scheduler is non-empty.
pub fn remove(cpu: &Cpu) -> Option<ThreadPtr> {
    let scheduler = cpu.scheduler();

    let myself = cpu.current_thread();
    if let Some(me) = myself {
        unsafe { me.as_ref() }.set_state_flag(ThreadFlags::LOCK_SCHED);
    }

    let thread;
    {
        let mut run = scheduler.run.lock();
        thread = run.schedule_next();
        run.thread_count = run.thread_count.wrapping_sub(1);
    }

    if let Some(me) = myself {
        unsafe { me.as_ref() }.clear_state_flag(ThreadFlags::LOCK_SCHED);
    }

    if let Some(t) = thread {
        unsafe { t.as_ref() }.set_current_cpu(None);
    }
    thread
}

/// Preemption event entry point for `cpu`.
///
/// Called from the platform timer with interrupts off on the local CPU.
/// Picks the next thread (idle if none), installs it as current, marks the
/// displaced thread `PREEMPT` and queues it again. The current-thread
/// switch happens under the scheduler lock, so observers taking the lock
/// see current thread and `PREEMPT` bits change together.
pub fn preempt(cpu: &Cpu) {
    let scheduler = cpu.scheduler();

    let Some(old) = cpu.current_thread() else {
        return;
    };

    // The interrupted thread is mid-mutation of a scheduler (this one or
    // another); it cannot be preempted away from under itself.
    if unsafe { old.as_ref() }
        .state_flags()
        .contains(ThreadFlags::LOCK_SCHED)
    {
        return;
    }

    let mut run = scheduler.run.lock();

    let new = run
        .schedule_next()
        .unwrap_or_else(|| scheduler.idle().expect("idle thread not installed"));

    unsafe { new.as_ref() }.clear_state_flag(ThreadFlags::PREEMPT);
    cpu.set_current_thread(new);
    unsafe { old.as_ref() }.set_state_flag(ThreadFlags::PREEMPT);

    run.reenqueue(scheduler.idle(), old);
    drop(run);
}
