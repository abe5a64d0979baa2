//! Benchmark harness for the sgemm kernels.
//!
//! Generates seeded random n×n matrices, runs each kernel once on a freshly
//! zeroed C, and reports wall-clock seconds and GFLOPS. Matrix size comes
//! from the command line and defaults to 512.

use std::hint::black_box;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sgemm::{par_sgemm, sgemm, sgemm_blocked, sgemm_naive, Result};

/// Default matrix dimension when none is given on the command line.
const DEFAULT_SIZE: usize = 512;

/// Seed for the test matrices. Fixed so runs are reproducible; the generator
/// is passed explicitly rather than held in any global state.
const FILL_SEED: u64 = 42;

struct Config {
    n: usize,
    check: bool,
}

fn print_usage(program: &str) {
    println!("Usage: {} [options] [size]", program);
    println!("Options:");
    println!("  -c          Check each kernel against the naive reference");
    println!("  -h, --help  Show this help message");
    println!("  size        Matrix dimension (default: {})", DEFAULT_SIZE);
    println!();
    println!("Examples:");
    println!("  {} 1024      # 1024x1024 matrices", program);
    println!("  {} -c 256    # 256x256 with correctness check", program);
}

fn parse_args() -> std::result::Result<Option<Config>, String> {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "sgemm".to_string());

    let mut config = Config {
        n: DEFAULT_SIZE,
        check: false,
    };

    for arg in args {
        match arg.as_str() {
            "-c" => config.check = true,
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(None);
            }
            other => {
                config.n = other
                    .parse()
                    .map_err(|_| format!("invalid matrix size '{}'", other))?;
            }
        }
    }

    Ok(Some(config))
}

/// Fills a buffer with uniform values in [-1, 1) from the given generator.
fn fill(buf: &mut [f32], rng: &mut StdRng) {
    for slot in buf.iter_mut() {
        *slot = rng.random_range(-1.0..1.0);
    }
}

/// Touches a buffer larger than any reasonable last-level cache so each
/// kernel starts from cold matrices.
fn flush_cache() {
    let mut clr = vec![0.0f32; 10_000_000];
    for (i, slot) in clr.iter_mut().enumerate() {
        *slot = i as f32;
    }
    black_box(&clr);
}

/// Runs one kernel on a zeroed C and returns (elapsed seconds, result).
fn bench_kernel<F>(a: &[f32], b: &[f32], n: usize, f: F) -> Result<(f64, Vec<f32>)>
where
    F: Fn(&[f32], &[f32], &mut [f32], usize) -> Result<()>,
{
    flush_cache();
    let mut c = vec![0.0f32; n * n];

    let start = Instant::now();
    f(a, b, &mut c, n)?;
    let seconds = start.elapsed().as_secs_f64();

    black_box(&c);
    Ok((seconds, c))
}

/// Compares a kernel's output against the reference result.
fn check_against_reference(c: &[f32], c_ref: &[f32], n: usize) {
    let dif = c
        .iter()
        .zip(c_ref.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max);
    // Rounding differences (register accumulation, FMA fusion) grow with the
    // number of accumulated terms; a real kernel bug is orders of magnitude
    // above this.
    let max_error = 1e-5 * n as f32;
    if dif > max_error {
        println!("  -> BAD kernel, max element error: {}", dif);
    } else {
        println!("  -> kernel agrees with the reference (max error {:.6})", dif);
    }
}

fn run(config: &Config) -> Result<()> {
    let n = config.n;
    let mut rng = StdRng::seed_from_u64(FILL_SEED);

    let mut a = vec![0.0f32; n * n];
    let mut b = vec![0.0f32; n * n];
    fill(&mut a, &mut rng);
    fill(&mut b, &mut rng);

    let kernels: Vec<(
        &str,
        fn(&[f32], &[f32], &mut [f32], usize) -> Result<()>,
    )> = vec![
        ("naive (i-j-k reference)", sgemm_naive),
        ("cache blocked", sgemm_blocked),
        ("rayon row-parallel", par_sgemm),
        ("dispatch (best compiled)", sgemm),
    ];

    let flops = 2.0 * (n as f64).powi(3);
    let mut reference: Option<Vec<f32>> = None;

    for (desc, kernel) in kernels {
        let (seconds, c) = bench_kernel(&a, &b, n, kernel)?;
        let gflops = flops / seconds / 1e9;
        println!("{}, n = {}: {:.6} s ({:.2} GFLOPS)", desc, n, seconds, gflops);

        if config.check {
            match &reference {
                // First kernel is the reference itself.
                None => reference = Some(c),
                Some(c_ref) => check_against_reference(&c, c_ref, n),
            }
        }
    }

    Ok(())
}

fn main() {
    let config = match parse_args() {
        Ok(Some(config)) => config,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {}", message);
            print_usage("sgemm");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
