//! Timing log written after a sweep.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::Local;

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct TimingEntry {
    pub size: usize,
    /// Threads or workers the size was multiplied with.
    pub parallelism: usize,
    pub runs: usize,
    pub mean: Duration,
}

impl TimingEntry {
    /// Multiply-add operations of one N×N product.
    pub fn operations(&self) -> u128 {
        (self.size as u128).pow(3)
    }
}

/// Mean elapsed time per problem size.
#[derive(Debug, Clone)]
pub struct TimingReport {
    variant: String,
    entries: Vec<TimingEntry>,
}

impl TimingReport {
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            entries: Vec::new(),
        }
    }

    /// Records the mean of `samples`; an empty slice is ignored.
    pub fn record(&mut self, size: usize, parallelism: usize, samples: &[Duration]) {
        if samples.is_empty() {
            return;
        }
        let total: Duration = samples.iter().sum();
        self.entries.push(TimingEntry {
            size,
            parallelism,
            runs: samples.len(),
            mean: total / samples.len() as u32,
        });
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Timing (s): {}", self.variant);
        let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| {:>11} | {:>11} | {:>4} | {:>14} | {:>16} |",
            "Size", "Parallelism", "Runs", "Avg time (s)", "Operations"
        );
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "| {:>11} | {:>11} | {:>4} | {:>14.6} | {:>16} |",
                format!("{0}x{0}", entry.size),
                entry.parallelism,
                entry.runs,
                entry.mean.as_secs_f64(),
                entry.operations()
            );
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}
