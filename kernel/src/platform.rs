//! Platform capability staging.
//!
//! Ports come up in stages, each implying all lower ones. Subsystems gate
//! their bring-up on the stage the platform has reached.

use core::sync::atomic::{AtomicU32, Ordering};

/// Bring-up stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum CapStage {
    /// The port boots.
    Alive = 0,
    /// The kernel runs as a higher-half kernel.
    HigherHalf = 1,
    /// A working per-CPU structure pointer exists.
    CpuPtr = 2,
    /// The MMU is usable.
    Mmu = 3,
    /// Interrupts are wired up.
    Interrupts = 4,
}

impl CapStage {
    fn from_raw(raw: u32) -> CapStage {
        match raw {
            0 => CapStage::Alive,
            1 => CapStage::HigherHalf,
            2 => CapStage::CpuPtr,
            3 => CapStage::Mmu,
            _ => CapStage::Interrupts,
        }
    }
}

static CAP_STAGE: AtomicU32 = AtomicU32::new(CapStage::Alive as u32);

/// The stage the platform has reached.
pub fn cap_stage() -> CapStage {
    CapStage::from_raw(CAP_STAGE.load(Ordering::Acquire))
}

/// Record that the platform reached `stage`. The stage never lowers.
pub fn raise_cap_stage(stage: CapStage) {
    CAP_STAGE.fetch_max(stage as u32, Ordering::AcqRel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        assert!(CapStage::Alive < CapStage::HigherHalf);
        assert!(CapStage::HigherHalf < CapStage::CpuPtr);
        assert!(CapStage::CpuPtr < CapStage::Mmu);
        assert!(CapStage::Mmu < CapStage::Interrupts);
    }

    #[test]
    fn raising_is_monotonic() {
        raise_cap_stage(CapStage::Mmu);
        assert!(cap_stage() >= CapStage::Mmu);
        // A lower stage does not regress a higher one.
        raise_cap_stage(CapStage::HigherHalf);
        assert!(cap_stage() >= CapStage::Mmu);
    }
}
