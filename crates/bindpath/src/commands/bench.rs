//! Bench command - time repeated rewrites of one file

use anyhow::{bail, Result};
use bindpath_transform::transform;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::{read_input, OptionArgs};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Input file, or `-` for standard input
    pub input: PathBuf,

    /// Number of timed runs
    #[arg(short = 'n', long, default_value_t = 100)]
    pub iterations: u32,

    /// Untimed runs before measuring
    #[arg(long, default_value_t = 3)]
    pub warmup: u32,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    file: String,
    bytes: usize,
    iterations: u32,
    mean_us: f64,
    min_us: f64,
    max_us: f64,
    /// Input megabytes rewritten per second at the mean time.
    throughput_mb_s: f64,
}

impl BenchReport {
    fn new(file: String, bytes: usize, samples: &[Duration]) -> Self {
        let micros = |d: &Duration| d.as_secs_f64() * 1e6;
        let total: f64 = samples.iter().map(micros).sum();
        let mean_us = total / samples.len() as f64;
        let min_us = samples.iter().map(micros).fold(f64::INFINITY, f64::min);
        let max_us = samples.iter().map(micros).fold(0.0, f64::max);
        let throughput_mb_s = if mean_us > 0.0 {
            bytes as f64 / mean_us
        } else {
            0.0
        };

        Self {
            file,
            bytes,
            iterations: samples.len() as u32,
            mean_us,
            min_us,
            max_us,
            throughput_mb_s,
        }
    }
}

pub fn run(args: BenchArgs, format: OutputFormat) -> Result<()> {
    if args.iterations == 0 {
        bail!("--iterations must be at least 1");
    }

    let (options, _) = args.options.load()?;
    let (name, source) = read_input(&args.input)?;

    // Fail early on input that does not transform at all
    transform(&source, &options)?;

    for _ in 0..args.warmup {
        transform(&source, &options)?;
    }

    let mut samples = Vec::with_capacity(args.iterations as usize);
    for _ in 0..args.iterations {
        let start = Instant::now();
        transform(&source, &options)?;
        samples.push(start.elapsed());
    }

    let report = BenchReport::new(name, source.len(), &samples);
    log::debug!("{:?}", report);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!(
                "{}: {} bytes, {} iteration(s)",
                report.file, report.bytes, report.iterations
            );
            println!(
                "  mean {:.1} us  min {:.1} us  max {:.1} us",
                report.mean_us, report.min_us, report.max_us
            );
            println!("  {:.2} MB/s", report.throughput_mb_s);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_statistics() {
        let samples = [
            Duration::from_micros(10),
            Duration::from_micros(20),
            Duration::from_micros(30),
        ];
        let report = BenchReport::new("a.js".to_string(), 2_000, &samples);
        assert_eq!(report.iterations, 3);
        assert!((report.mean_us - 20.0).abs() < 1e-6);
        assert!((report.min_us - 10.0).abs() < 1e-6);
        assert!((report.max_us - 30.0).abs() < 1e-6);
        assert!((report.throughput_mb_s - 100.0).abs() < 1e-6);
    }
}
