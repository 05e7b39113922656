//! Parallel-for over work units, and the runner every entry point uses.

use super::partition::{plan_units, static_ranges, worker_count};
use crate::blocked::Region;
use crate::blocked::driver::gemm_region;
use crate::blocked::scratch::Workspace;
use crate::config::{BlockSizes, GemmConfig, Schedule};
use crate::error::Result;
use crate::kernels::MicroKernel;
use crate::matrix::view::{MatMut, MatRef};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Mutex, PoisonError};

/// Run `f(worker, unit)` for every unit on `pool`.
///
/// `worker` is in `0..workers` and identifies the scratch slot the call may
/// use. Under `Static` worker `w` handles exactly `static_ranges(..)[w]`;
/// under `Dynamic` units are claimed one at a time and `worker` is the
/// pool thread that claimed it.
pub fn for_each_unit<F>(
    pool: &ThreadPool,
    units: &[Region],
    workers: usize,
    schedule: Schedule,
    f: F,
) where
    F: Fn(usize, Region) + Sync,
{
    pool.install(|| match schedule {
        Schedule::Static => {
            let ranges = static_ranges(units.len(), workers);
            ranges.into_par_iter().enumerate().for_each(|(worker, range)| {
                for &unit in &units[range] {
                    f(worker, unit);
                }
            });
        }
        Schedule::Dynamic => {
            units.par_iter().with_max_len(1).for_each(|&unit| {
                let worker = rayon::current_thread_index().unwrap_or(0) % workers.max(1);
                f(worker, unit);
            });
        }
    });
}

/// C (+)= A·B with `kernel` at `blocks`.
///
/// Every worker's scratch and the pool are obtained before C is touched,
/// so an allocation error leaves C exactly as the caller passed it. With
/// `overwrite` C is zeroed first; otherwise the product accumulates onto
/// its current contents.
pub(crate) fn run<K: MicroKernel>(
    kernel: K,
    a: &MatRef<'_>,
    b: &MatRef<'_>,
    c: &mut MatMut<'_>,
    config: &GemmConfig,
    blocks: BlockSizes,
    overwrite: bool,
) -> Result<()> {
    let (m, n, k) = (a.rows(), b.cols(), a.cols());
    let blocks = blocks.clamped(m, n, k);
    let units = plan_units(m, n, blocks);
    let workers = worker_count(config.threads, m, n, k, units.len());

    let mut workspaces = (0..workers)
        .map(|_| Workspace::acquire(blocks, K::MR, K::NR, config.scratch_limit, config.alloc))
        .collect::<Result<Vec<_>>>()?;

    let pool = if workers > 1 {
        Some(ThreadPoolBuilder::new().num_threads(workers).build()?)
    } else {
        None
    };

    log::debug!(
        "sgemm {}x{}x{}: kernel={} blocks={:?} workers={} schedule={:?} units={}",
        m,
        n,
        k,
        K::NAME,
        blocks,
        workers,
        config.schedule,
        units.len()
    );

    if overwrite {
        c.fill_zero();
    }
    let c_ptr = c.as_ptr();

    match pool {
        None => {
            if let Some(workspace) = workspaces.first_mut() {
                // SAFETY: one worker owns all of C.
                unsafe { gemm_region(&kernel, a, b, c_ptr, Region::whole(m, n), workspace) };
            }
        }
        Some(pool) => {
            let slots: Vec<Mutex<Workspace>> = workspaces.into_iter().map(Mutex::new).collect();
            for_each_unit(&pool, &units, workers, config.schedule, |worker, unit| {
                let mut workspace = slots[worker]
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                // SAFETY: units are disjoint and each is handed out once.
                unsafe { gemm_region(&kernel, a, b, c_ptr, unit, &mut workspace) };
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocPolicy, KernelChoice};
    use crate::kernels::kernel_4x4::Scalar4x4;
    use crate::matrix::naive_ijk::matmul_naive_ijk;
    use crate::matrix::view::validate;

    fn pool(workers: usize) -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(workers).build().unwrap()
    }

    /// Every unit writes its worker id into an ownership map through the
    /// same raw handle the kernels use; any element written twice, or by
    /// two workers, fails the test.
    fn assert_writes_disjoint(schedule: Schedule) {
        let (m, n, workers) = (129, 97, 4);
        let units = plan_units(m, n, BlockSizes::new(16, 24, 8));
        let mut owner = vec![0.0f32; m * n];
        let mut view = MatMut::new(&mut owner, m, n, "owner").unwrap();
        let ptr = view.as_ptr();
        let seen = Mutex::new(Vec::new());

        for_each_unit(&pool(workers), &units, workers, schedule, |worker, unit| {
            assert!(worker < workers);
            for i in unit.rows.start..unit.rows.end() {
                for j in unit.cols.start..unit.cols.end() {
                    unsafe {
                        let slot = ptr.at(i, j);
                        assert_eq!(*slot, 0.0, "({}, {}) written twice", i, j);
                        *slot = (worker + 1) as f32;
                    }
                }
            }
            seen.lock().unwrap().push(unit);
        });

        assert!(owner.iter().all(|&w| w >= 1.0));
        assert_eq!(seen.into_inner().unwrap().len(), units.len());
    }

    #[test]
    fn test_static_writes_disjoint() {
        assert_writes_disjoint(Schedule::Static);
    }

    #[test]
    fn test_dynamic_writes_disjoint() {
        assert_writes_disjoint(Schedule::Dynamic);
    }

    #[test]
    fn test_static_worker_owns_its_range() {
        let units = plan_units(64, 64, BlockSizes::new(8, 64, 8));
        let workers = 3;
        let log = Mutex::new(Vec::new());
        for_each_unit(&pool(workers), &units, workers, Schedule::Static, |worker, unit| {
            log.lock().unwrap().push((worker, unit));
        });

        let ranges = static_ranges(units.len(), workers);
        for (worker, unit) in log.into_inner().unwrap() {
            let index = units.iter().position(|&u| u == unit).unwrap();
            assert!(ranges[worker].contains(&index));
        }
    }

    fn run_scalar(config: GemmConfig, m: usize, n: usize, k: usize) -> (Vec<f32>, Vec<f32>) {
        let a: Vec<f32> = (0..m * k).map(|i| ((i * 7) % 13) as f32 - 6.0).collect();
        let b: Vec<f32> = (0..k * n).map(|i| ((i * 5) % 11) as f32 - 5.0).collect();
        let mut c = vec![f32::NAN; m * n];
        {
            let (a_ref, b_ref, mut c_mut) = validate(&a, &b, &mut c, m, n, k).unwrap();
            let blocks = config.block_sizes();
            run(Scalar4x4, &a_ref, &b_ref, &mut c_mut, &config, blocks, true).unwrap();
        }
        let mut expected = vec![0.0; m * n];
        matmul_naive_ijk(&a, &b, &mut expected, m, n, k);
        (c, expected)
    }

    #[test]
    fn test_run_parallel_matches_reference() {
        for schedule in [Schedule::Static, Schedule::Dynamic] {
            let config = GemmConfig::new()
                .kernel(KernelChoice::Scalar)
                .blocks(BlockSizes::new(32, 64, 32))
                .threads(4)
                .schedule(schedule);
            let (c, expected) = run_scalar(config, 129, 129, 129);
            assert_eq!(c, expected, "{:?}", schedule);
        }
    }

    #[test]
    fn test_run_parallel_direct_fallback() {
        let config = GemmConfig::new()
            .kernel(KernelChoice::Scalar)
            .blocks(BlockSizes::new(16, 16, 16))
            .threads(3)
            .scratch_limit(8)
            .alloc_policy(AllocPolicy::Fallback);
        let (c, expected) = run_scalar(config, 40, 33, 21);
        assert_eq!(c, expected);
    }

    #[test]
    fn test_run_fail_policy_leaves_c_untouched() {
        let (m, n, k) = (8, 8, 8);
        let a = vec![1.0; m * k];
        let b = vec![1.0; k * n];
        let mut c = vec![3.0; m * n];
        let config = GemmConfig::new()
            .kernel(KernelChoice::Scalar)
            .threads(2)
            .scratch_limit(1)
            .alloc_policy(AllocPolicy::Fail);

        let (a_ref, b_ref, mut c_mut) = validate(&a, &b, &mut c, m, n, k).unwrap();
        let result = run(
            Scalar4x4,
            &a_ref,
            &b_ref,
            &mut c_mut,
            &config,
            BlockSizes::new(4, 4, 4),
            true,
        );
        assert!(result.is_err());
        assert!(c.iter().all(|&x| x == 3.0));
    }
}
