//! Offload to an external device, with the CPU as mandatory fallback.
//!
//! A device sees the same row-major contract as [`crate::gemm`]. Its output
//! lands in a staging buffer first and is copied into C only when the
//! device reports success, so a device that fails halfway never leaves C
//! partially written.

use crate::config::GemmConfig;
use crate::error::{GemmError, Result};
use crate::matrix::view::validate;

/// An execution engine for `out = A·B`.
pub trait Device: Sync {
    fn name(&self) -> &str;

    /// Overwrite `out` (m × n) with A (m × k) · B (k × n).
    ///
    /// On error the contents of `out` are unspecified.
    fn matmul(
        &self,
        a: &[f32],
        b: &[f32],
        out: &mut [f32],
        m: usize,
        n: usize,
        k: usize,
    ) -> Result<()>;
}

/// Which engine produced C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Device,
    Cpu,
}

/// In-process device that computes one dot product per output element,
/// the way a simple accelerator kernel would.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDevice;

impl Device for HostDevice {
    fn name(&self) -> &str {
        "host"
    }

    fn matmul(
        &self,
        a: &[f32],
        b: &[f32],
        out: &mut [f32],
        m: usize,
        n: usize,
        k: usize,
    ) -> Result<()> {
        let (a, b, mut out) = validate(a, b, out, m, n, k)?;
        let out = out.as_mut_slice();
        for i in 0..m {
            let a_row = a.row(i);
            for j in 0..n {
                let mut acc = 0.0f32;
                for (p, &a_ip) in a_row.iter().enumerate() {
                    acc += a_ip * b.at(p, j);
                }
                out[i * n + j] = acc;
            }
        }
        Ok(())
    }
}

/// C := A·B on `device`, or on the CPU if the device fails.
///
/// Shape errors are returned as usual. Any device error, or failure to
/// allocate the staging buffer, is logged and answered by running
/// [`crate::gemm_with`] with `config`.
#[allow(clippy::too_many_arguments)]
pub fn gemm_on_device(
    device: &dyn Device,
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    config: &GemmConfig,
) -> Result<Backend> {
    validate(a, b, c, m, n, k)?;

    match run_staged(device, a, b, c, m, n, k) {
        Ok(()) => {
            log::debug!("sgemm {}x{}x{} ran on device {}", m, n, k, device.name());
            Ok(Backend::Device)
        }
        Err(err) => {
            log::warn!("device {} failed: {}; falling back to CPU", device.name(), err);
            crate::gemm_with(a, b, c, m, n, k, config)?;
            Ok(Backend::Cpu)
        }
    }
}

fn run_staged(
    device: &dyn Device,
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
) -> Result<()> {
    let mut staging = Vec::new();
    staging
        .try_reserve_exact(c.len())
        .map_err(|_| GemmError::Allocation { elements: c.len() })?;
    staging.resize(c.len(), 0.0);

    device.matmul(a, b, &mut staging, m, n, k)?;
    c.copy_from_slice(&staging);
    Ok(())
}
