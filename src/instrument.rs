//! Cycle and instruction counters around a GEMM call.
//!
//! Purely observational: sampling never changes what the product computes.

/// A snapshot of two free-running 64-bit counters.
///
/// | target  | `cycles`                         | `instructions` |
/// |---------|----------------------------------|----------------|
/// | x86_64  | time-stamp counter (`rdtsc`)     | 0              |
/// | riscv64 | `rdcycle`                        | `rdinstret`    |
/// | other   | nanoseconds since first sample   | 0              |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfCounters {
    pub cycles: u64,
    pub instructions: u64,
}

impl PerfCounters {
    #[cfg(target_arch = "x86_64")]
    pub fn now() -> Self {
        // SAFETY: rdtsc has no preconditions on x86_64.
        let cycles = unsafe { std::arch::x86_64::_rdtsc() };
        Self {
            cycles,
            instructions: 0,
        }
    }

    #[cfg(target_arch = "riscv64")]
    pub fn now() -> Self {
        let cycles: u64;
        let instructions: u64;
        // SAFETY: both CSRs are readable from user mode.
        unsafe {
            std::arch::asm!("rdcycle {}", out(reg) cycles, options(nomem, nostack));
            std::arch::asm!("rdinstret {}", out(reg) instructions, options(nomem, nostack));
        }
        Self {
            cycles,
            instructions,
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "riscv64")))]
    pub fn now() -> Self {
        use std::sync::OnceLock;
        use std::time::Instant;

        static EPOCH: OnceLock<Instant> = OnceLock::new();
        let nanos = EPOCH.get_or_init(Instant::now).elapsed().as_nanos();
        Self {
            cycles: u64::try_from(nanos).unwrap_or(u64::MAX),
            instructions: 0,
        }
    }

    /// `self - earlier`, counter by counter, clamped at zero.
    pub fn delta(&self, earlier: &Self) -> Self {
        Self {
            cycles: self.cycles.saturating_sub(earlier.cycles),
            instructions: self.instructions.saturating_sub(earlier.instructions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_saturates() {
        let before = PerfCounters {
            cycles: 100,
            instructions: 50,
        };
        let after = PerfCounters {
            cycles: 250,
            instructions: 40,
        };
        let d = after.delta(&before);
        assert_eq!(d.cycles, 150);
        assert_eq!(d.instructions, 0);
    }

    #[test]
    fn test_delta_of_live_samples_is_bounded() {
        let before = PerfCounters::now();
        let mut x = 0u64;
        for i in 0..10_000u64 {
            x = x.wrapping_add(std::hint::black_box(i));
        }
        std::hint::black_box(x);
        let after = PerfCounters::now();
        assert!(after.delta(&before).cycles <= after.cycles);
    }
}
