//! Splitting C into work units and units into worker ranges.

use crate::blocked::{BlockIter, Region};
use crate::config::BlockSizes;
use std::ops::Range;

/// Every (MC × NC) tile of an `m × n` C, N-block major.
///
/// Consecutive units share an N-block, so a worker walking a contiguous
/// range keeps hitting the B panel it already packed.
pub fn plan_units(m: usize, n: usize, blocks: BlockSizes) -> Vec<Region> {
    BlockIter::new(n, blocks.nc)
        .flat_map(|cols| BlockIter::new(m, blocks.mc).map(move |rows| Region::new(rows, cols)))
        .collect()
}

/// `units` split into `workers` contiguous ranges whose lengths differ by
/// at most one. Empty ranges appear only when there are more workers than
/// units.
pub fn static_ranges(units: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = units / workers;
    let extra = units % workers;

    let mut start = 0;
    (0..workers)
        .map(|w| {
            let len = base + usize::from(w < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Threads worth using for an `m × n × k` product, at most `max_threads`.
///
/// Thresholds come from benchmarking: below ~100 MFLOP a second thread
/// costs more than it saves, and below ~300 MFLOP two threads beat four.
pub fn choose_thread_count(m: usize, n: usize, k: usize, max_threads: usize) -> usize {
    let flops = 2.0 * m as f64 * n as f64 * k as f64;

    const SINGLE_THREAD_THRESHOLD: f64 = 100_000_000.0;
    const TWO_THREAD_THRESHOLD: f64 = 300_000_000.0;

    let optimal_threads = if flops < SINGLE_THREAD_THRESHOLD {
        1
    } else if flops < TWO_THREAD_THRESHOLD {
        2
    } else {
        max_threads
    };

    optimal_threads.min(max_threads).max(1)
}

/// Workers for one call.
///
/// `threads == 0` picks adaptively among all rayon workers; an explicit
/// count is honored. Either way there are never more workers than units.
pub fn worker_count(threads: usize, m: usize, n: usize, k: usize, units: usize) -> usize {
    let wanted = match threads {
        0 => choose_thread_count(m, n, k, rayon::current_num_threads()),
        t => t,
    };
    wanted.min(units).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_cover_c_exactly_once() {
        let (m, n) = (129, 129);
        let units = plan_units(m, n, BlockSizes::new(32, 64, 32));
        assert_eq!(units.len(), 5 * 3);

        let mut hits = vec![0u8; m * n];
        for unit in &units {
            for i in unit.rows.start..unit.rows.end() {
                for j in unit.cols.start..unit.cols.end() {
                    hits[i * n + j] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn test_units_are_n_block_major() {
        let units = plan_units(10, 10, BlockSizes::new(4, 5, 1));
        let cols: Vec<usize> = units.iter().map(|u| u.cols.start).collect();
        assert_eq!(cols, vec![0, 0, 0, 5, 5, 5]);
    }

    #[test]
    fn test_static_ranges_partition() {
        let ranges = static_ranges(10, 4);
        assert_eq!(ranges, vec![0..3, 3..6, 6..8, 8..10]);

        let ranges = static_ranges(2, 4);
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2]);

        assert_eq!(static_ranges(0, 3).iter().map(|r| r.len()).sum::<usize>(), 0);
    }

    #[test]
    fn test_adaptive_threading() {
        // Small matrix should use 1 thread (256×256×256 = 33M FLOPs)
        assert_eq!(choose_thread_count(256, 256, 256, 4), 1);

        // Medium matrix should use 2 threads (450×450×450 = 182M FLOPs)
        assert_eq!(choose_thread_count(450, 450, 450, 4), 2);

        // Large matrix should use all threads (1024×1024×1024 = 2.1B FLOPs)
        assert_eq!(choose_thread_count(1024, 1024, 1024, 4), 4);

        // Medium matrix but only one thread allowed
        assert_eq!(choose_thread_count(450, 450, 450, 1), 1);
    }

    #[test]
    fn test_worker_count_capped_by_units() {
        assert_eq!(worker_count(8, 64, 64, 64, 3), 3);
        assert_eq!(worker_count(2, 64, 64, 64, 3), 2);
        assert_eq!(worker_count(4, 0, 0, 0, 0), 1);
        // Too small to parallelize adaptively.
        assert_eq!(worker_count(0, 32, 32, 32, 1), 1);
    }
}
