//! Scheduler integration tests: boot a CPU, drive threads through the
//! public scheduling API.

use std::ptr::NonNull;

use argon_kernel::platform::{self, CapStage};
use argon_kernel::sched::{self, Cpu, Sched, Thread, ThreadFlags, ThreadPtr, SCHED_PRIOS};

fn leak_cpu(id: u32) -> &'static Cpu {
    Box::leak(Box::new(Cpu::new(id)))
}

fn thread(priority: u32) -> ThreadPtr {
    ThreadPtr::new(NonNull::from(Box::leak(Box::new(Thread::new(priority)))))
}

fn boot_cpu() -> (&'static Cpu, ThreadPtr) {
    platform::raise_cap_stage(CapStage::Interrupts);
    let sched = Sched::new();
    let cpu = leak_cpu(0);
    let idle = thread(0);
    sched.instantiate(cpu, idle);
    (cpu, idle)
}

#[test]
fn boot_insert_and_drain() {
    // With prios[0] = 1 and prios[1] = 5, band 0 wins the first two passes
    // (its counter hits 0 each time) before band 1 decays far enough, so
    // a, c drain ahead of b.
    let (cpu, _) = boot_cpu();
    let a = thread(0);
    let b = thread(1);
    let c = thread(0);

    sched::insert(cpu, a);
    sched::insert(cpu, b);
    sched::insert(cpu, c);
    assert_eq!(cpu.scheduler().thread_count(), 3);

    let s = cpu.scheduler();
    assert_eq!(s.schedule_next(), Some(a));
    assert_eq!(s.schedule_next(), Some(c));
    assert_eq!(s.schedule_next(), Some(b));
    assert_eq!(s.schedule_next(), None);
}

#[test]
fn priority_reset_table_is_exact() {
    assert_eq!(SCHED_PRIOS.len(), 32);
    assert_eq!(SCHED_PRIOS[0], 1);
    assert_eq!(SCHED_PRIOS[1], 5);
    assert_eq!(SCHED_PRIOS[31], 422);
    // Monotonic non-decreasing.
    assert!(SCHED_PRIOS.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn timer_preemption_respects_the_lock_gate() {
    // A timer fires while the current thread is mid-insert (LOCK_SCHED
    // set): the preemption must not touch the scheduler. Once the flag is
    // gone the next timer tick switches threads.
    let (cpu, _) = boot_cpu();
    let t1 = thread(0);
    let t2 = thread(0);
    cpu.set_current_thread(t1);
    sched::insert(cpu, t2);

    unsafe { t1.as_ref() }.set_state_flag(ThreadFlags::LOCK_SCHED);
    sched::preempt(cpu);
    assert_eq!(cpu.current_thread(), Some(t1));
    assert!(!unsafe { t1.as_ref() }
        .state_flags()
        .contains(ThreadFlags::PREEMPT));

    unsafe { t1.as_ref() }.clear_state_flag(ThreadFlags::LOCK_SCHED);
    sched::preempt(cpu);
    assert_eq!(cpu.current_thread(), Some(t2));
    assert!(unsafe { t1.as_ref() }
        .state_flags()
        .contains(ThreadFlags::PREEMPT));
}

#[test]
fn preemption_round_robins_a_band() {
    let (cpu, idle) = boot_cpu();
    let t1 = thread(4);
    let t2 = thread(4);
    let t3 = thread(4);
    cpu.set_current_thread(idle);
    sched::insert(cpu, t1);
    sched::insert(cpu, t2);
    sched::insert(cpu, t3);

    // Each tick displaces the runner and picks the oldest waiter.
    let mut seen = Vec::new();
    for _ in 0..6 {
        sched::preempt(cpu);
        seen.push(cpu.current_thread().unwrap());
    }
    assert_eq!(seen[0], t1);
    assert_eq!(seen[1], t2);
    assert_eq!(seen[2], t3);
    // The rotation repeats.
    assert_eq!(seen[3], t1);
    assert_eq!(seen[4], t2);
    assert_eq!(seen[5], t3);
}

#[test]
fn idle_runs_when_the_cpu_drains() {
    let (cpu, idle) = boot_cpu();
    let t = thread(0);
    cpu.set_current_thread(idle);
    sched::insert(cpu, t);

    sched::preempt(cpu);
    assert_eq!(cpu.current_thread(), Some(t));

    // With nothing else runnable the next tick falls back to idle and the
    // displaced thread goes back on its ring.
    sched::preempt(cpu);
    assert_eq!(cpu.current_thread(), Some(idle));
    assert_eq!(sched::remove(cpu), Some(t));
    assert_eq!(cpu.scheduler().thread_count(), 0);
}
