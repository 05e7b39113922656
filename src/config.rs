//! Fixed block sizes and per-call knobs.
//!
//! Block sizes are compile-time constants tuned per micro-kernel; nothing
//! here is autotuned at runtime. `GemmConfig` only picks between them and
//! controls threading and what happens when scratch memory runs out.

use crate::error::{GemmError, Result};

/// Cache-blocking sizes for the three outer loops.
///
/// The register-blocking sizes (MR, NR) belong to the micro-kernel, not to
/// this struct. MC and NC need not be multiples of MR and NR: the last
/// micro-tile of every block simply goes through the ragged-tile path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizes {
    /// Rows of A packed at once (L2).
    pub mc: usize,
    /// Columns of B packed at once (L3).
    pub nc: usize,
    /// Reduction depth of one packed panel (L1).
    pub kc: usize,
}

impl BlockSizes {
    /// Portable 4×4 kernel.
    pub const SCALAR: Self = Self::new(64, 256, 256);

    /// AVX2 6×16 kernel: 96×256 floats of A stay in a 256 KiB L2.
    pub const AVX2: Self = Self::new(96, 512, 256);

    /// AVX-512 8×16 kernel.
    pub const AVX512: Self = Self::new(128, 512, 256);

    /// NEON 8×8 kernel.
    pub const NEON: Self = Self::new(64, 256, 256);

    pub const fn new(mc: usize, nc: usize, kc: usize) -> Self {
        Self { mc, nc, kc }
    }

    /// Reject block sizes the driver cannot loop over.
    pub fn validate(&self) -> Result<()> {
        if self.mc == 0 || self.nc == 0 || self.kc == 0 {
            return Err(GemmError::InvalidConfig("mc, nc and kc must be non-zero"));
        }
        Ok(())
    }

    /// Every size halved (never below 1). Used for the one retry after a
    /// failed scratch allocation.
    pub fn halved(&self) -> Self {
        Self {
            mc: (self.mc / 2).max(1),
            nc: (self.nc / 2).max(1),
            kc: (self.kc / 2).max(1),
        }
    }

    /// Shrunk to the problem, so a small product doesn't allocate scratch
    /// for a full block.
    pub fn clamped(&self, m: usize, n: usize, k: usize) -> Self {
        Self {
            mc: self.mc.min(m).max(1),
            nc: self.nc.min(n).max(1),
            kc: self.kc.min(k).max(1),
        }
    }
}

impl Default for BlockSizes {
    fn default() -> Self {
        Self::SCALAR
    }
}

/// Which micro-kernel the driver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelChoice {
    /// Best kernel for the running CPU.
    Auto,
    /// Portable 4×4 scalar kernel; the reference every SIMD kernel must match.
    Scalar,
    /// 6×16 AVX2 + FMA kernel (x86_64).
    Avx2,
    /// 8×16 AVX-512F kernel (x86_64).
    Avx512,
    /// 8×8 NEON kernel (aarch64).
    Neon,
}

impl KernelChoice {
    /// Default block sizes for this kernel. `Auto` resolves first.
    pub fn default_blocks(self) -> BlockSizes {
        match self.resolve() {
            KernelChoice::Avx2 => BlockSizes::AVX2,
            KernelChoice::Avx512 => BlockSizes::AVX512,
            KernelChoice::Neon => BlockSizes::NEON,
            _ => BlockSizes::SCALAR,
        }
    }

    /// Replace `Auto` with the detected kernel.
    pub fn resolve(self) -> Self {
        match self {
            KernelChoice::Auto => crate::kernels::detect(),
            other => other,
        }
    }
}

/// How tiles of C are handed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Tiles pre-split into one contiguous range per worker.
    Static,
    /// Workers claim one tile at a time.
    Dynamic,
}

/// What a worker does when its packing scratch cannot be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocPolicy {
    /// Retry once with halved block sizes, then compute unpacked.
    Fallback,
    /// Return `GemmError::Allocation` before C is touched.
    Fail,
}

/// Per-call configuration.
///
/// ```
/// use sgemm::{GemmConfig, KernelChoice, Schedule};
///
/// let config = GemmConfig::new()
///     .kernel(KernelChoice::Scalar)
///     .threads(4)
///     .schedule(Schedule::Static);
/// assert_eq!(config.threads, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmConfig {
    pub kernel: KernelChoice,
    /// `None` uses the kernel's own constants.
    pub blocks: Option<BlockSizes>,
    /// Workers; 1 runs on the calling thread. 0 picks a count from the
    /// problem size, up to every rayon worker. Never more than there are
    /// tiles of C.
    pub threads: usize,
    pub schedule: Schedule,
    pub alloc: AllocPolicy,
    /// Maximum elements per scratch buffer; larger requests count as
    /// allocation failures.
    pub scratch_limit: Option<usize>,
}

impl GemmConfig {
    pub const fn new() -> Self {
        Self {
            kernel: KernelChoice::Auto,
            blocks: None,
            threads: 1,
            schedule: Schedule::Dynamic,
            alloc: AllocPolicy::Fallback,
            scratch_limit: None,
        }
    }

    pub fn kernel(mut self, kernel: KernelChoice) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn blocks(mut self, blocks: BlockSizes) -> Self {
        self.blocks = Some(blocks);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn alloc_policy(mut self, alloc: AllocPolicy) -> Self {
        self.alloc = alloc;
        self
    }

    pub fn scratch_limit(mut self, elements: usize) -> Self {
        self.scratch_limit = Some(elements);
        self
    }

    /// Block sizes the driver will start from.
    pub fn block_sizes(&self) -> BlockSizes {
        self.blocks.unwrap_or_else(|| self.kernel.default_blocks())
    }
}

impl Default for GemmConfig {
    fn default() -> Self {
        Self::new()
    }
}
