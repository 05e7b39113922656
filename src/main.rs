//! Benchmark runner for the sgemm variants.

use sgemm::kernels::detect;
use sgemm::matrix::compare::max_rel_error;
use sgemm::{
    GemmConfig, KernelChoice, Result, Schedule, gemm_with, matmul_naive_ijk, matmul_naive_ikj,
};
use std::time::Instant;

type Measurement = (f64, f64, f32);

fn main() -> Result<()> {
    println!("=== SGEMM Benchmark ===\n");

    let sizes = [256, 512, 1024];
    let iterations = 3;
    let threads = std::thread::available_parallelism().map_or(4, |n| n.get());
    let mut all_results = Vec::new();

    let simd = detect();
    println!("Detected kernel: {:?}, threads: {}\n", simd, threads);

    let scalar = GemmConfig::new().kernel(KernelChoice::Scalar);
    let fastest = GemmConfig::new().kernel(simd);
    let static_mt = fastest.threads(threads).schedule(Schedule::Static);
    let dynamic_mt = fastest.threads(threads).schedule(Schedule::Dynamic);

    for &size in &sizes {
        println!("Matrix: {}×{}", size, size);
        println!("{}", "-".repeat(60));

        let (m, n, k) = (size, size, size);
        let a: Vec<f32> = (0..m * k).map(|i| (i % 100) as f32 / 100.0).collect();
        let b: Vec<f32> = (0..k * n).map(|i| (i % 100) as f32 / 100.0).collect();

        let mut reference = vec![0.0; m * n];
        matmul_naive_ijk(&a, &b, &mut reference, m, n, k);

        let naive = |a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize| -> Result<()> {
            matmul_naive_ijk(a, b, c, m, n, k);
            Ok(())
        };
        let ikj = |a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize| -> Result<()> {
            matmul_naive_ikj(a, b, c, m, n, k);
            Ok(())
        };

        let mut results: Vec<(&str, Measurement)> = vec![
            ("Naive (i-j-k)", bench_fn(&a, &b, &reference, m, n, k, iterations, naive)?),
            ("Scalar (i-k-j)", bench_fn(&a, &b, &reference, m, n, k, iterations, ikj)?),
            (
                "Blocked 4×4",
                bench_config(&a, &b, &reference, m, n, k, iterations, &scalar)?,
            ),
        ];

        if simd != KernelChoice::Scalar {
            results.push((
                "Blocked SIMD",
                bench_config(&a, &b, &reference, m, n, k, iterations, &fastest)?,
            ));
        }
        results.push((
            "MT static",
            bench_config(&a, &b, &reference, m, n, k, iterations, &static_mt)?,
        ));
        results.push((
            "MT dynamic",
            bench_config(&a, &b, &reference, m, n, k, iterations, &dynamic_mt)?,
        ));

        let baseline_time = results[0].1.0;
        for (i, (name, (time_ms, gflops, err))) in results.iter().enumerate() {
            let speedup = baseline_time / time_ms;
            println!(
                "{}. {:16} {:8.2} ms  {:6.2} GFLOPS  ({:.1}×)  max rel err {:.2e}",
                i + 1,
                name,
                time_ms,
                gflops,
                speedup,
                err
            );
        }
        println!();

        all_results.push((size, results));
    }

    print_summary_table(&all_results);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn bench_config(
    a: &[f32],
    b: &[f32],
    reference: &[f32],
    m: usize,
    n: usize,
    k: usize,
    iterations: usize,
    config: &GemmConfig,
) -> Result<Measurement> {
    bench_fn(a, b, reference, m, n, k, iterations, |a, b, c, m, n, k| {
        gemm_with(a, b, c, m, n, k, config)
    })
}

/// Average time and GFLOPS over `iterations` runs after one warmup, plus
/// the error of the last result against `reference`.
#[allow(clippy::too_many_arguments)]
fn bench_fn<F>(
    a: &[f32],
    b: &[f32],
    reference: &[f32],
    m: usize,
    n: usize,
    k: usize,
    iterations: usize,
    f: F,
) -> Result<Measurement>
where
    F: Fn(&[f32], &[f32], &mut [f32], usize, usize, usize) -> Result<()>,
{
    // Warmup
    let mut c = vec![0.0; m * n];
    f(a, b, &mut c, m, n, k)?;

    let mut total = 0.0;
    for _ in 0..iterations {
        c.fill(0.0);
        let start = Instant::now();
        f(a, b, &mut c, m, n, k)?;
        total += start.elapsed().as_secs_f64();
    }

    let avg = total / iterations as f64;
    let gflops = 2.0 * (m * n * k) as f64 / avg / 1e9;
    Ok((avg * 1000.0, gflops, max_rel_error(reference, &c)))
}

#[allow(clippy::type_complexity)]
fn print_summary_table(all_results: &[(usize, Vec<(&str, Measurement)>)]) {
    println!("\n{}", "=".repeat(90));
    println!("SUMMARY");
    println!("{}", "=".repeat(90));

    print!("\n{:<18}", "Method");
    for (size, _) in all_results {
        print!(" {:>14}", format!("{}×{}", size, size));
    }
    println!(" {:>12}", "Speedup");
    println!("{}", "-".repeat(90));

    let num_methods = all_results[0].1.len();

    for method_idx in 0..num_methods {
        let method_name = all_results[0].1[method_idx].0;
        print!("{:<18}", method_name);

        let mut speedups = Vec::new();
        for (_, results) in all_results {
            let (time_ms, gflops, _) = results[method_idx].1;
            let baseline_time = results[0].1.0;
            print!(" {:>11.2} GF", gflops);
            speedups.push(baseline_time / time_ms);
        }

        let avg_speedup: f64 = speedups.iter().sum::<f64>() / speedups.len() as f64;
        println!(" {:>11.1}×", avg_speedup);
    }

    println!("{}", "=".repeat(90));
    println!("\nGF = GFLOPS (billion floating point operations per second)");
    println!("Speedup relative to Naive (i-j-k). Higher is better.\n");
}
