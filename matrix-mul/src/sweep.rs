//! Problem-size sweeps for each variant of the benchmark.
//!
//! A sweep walks an ordered list of dimensions. For each size the inputs are
//! taken from `data_dir` when present and generated otherwise, the product is
//! timed, and the result is written next to the inputs. Each variant's
//! timing report lands in `data_dir/results_{variant}.txt`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use matmul_comm::{Communicator, LocalCommunicator};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::multiply::{multiply, multiply_threaded};
use crate::report::TimingReport;
use crate::worker::Worker;
use crate::{Error, Matrix, store};

/// Where a sweep reads and writes, and which sizes it covers.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub sizes: Vec<usize>,
    pub data_dir: PathBuf,
    /// Makes generated inputs reproducible.
    pub seed: Option<u64>,
}

impl SweepPlan {
    pub fn new(sizes: Vec<usize>, data_dir: impl Into<PathBuf>, seed: Option<u64>) -> Result<Self, Error> {
        if sizes.is_empty() {
            return Err(Error::Config("no matrix sizes given".to_string()));
        }
        if let Some(zero) = sizes.iter().position(|&n| n == 0) {
            return Err(Error::Config(format!(
                "matrix size #{} is zero",
                zero + 1
            )));
        }
        Ok(Self {
            sizes,
            data_dir: data_dir.into(),
            seed,
        })
    }

    pub fn input_paths(&self, n: usize) -> (PathBuf, PathBuf) {
        (
            self.data_dir.join(format!("mat1_{}.txt", n)),
            self.data_dir.join(format!("mat2_{}.txt", n)),
        )
    }

    pub fn result_path(&self, n: usize) -> PathBuf {
        self.data_dir.join(format!("res_{}.txt", n))
    }

    /// Each variant keeps its own timing log.
    pub fn report_path(&self, variant: &str) -> PathBuf {
        self.data_dir.join(format!("results_{}.txt", variant))
    }

    /// Loads both operands of size `n`, generating the files first if either
    /// is missing.
    pub fn prepare_inputs(&self, n: usize) -> Result<(Matrix, Matrix), Error> {
        std::fs::create_dir_all(&self.data_dir)?;
        let (path_a, path_b) = self.input_paths(n);

        if !path_a.exists() || !path_b.exists() {
            info!(n, dir = %self.data_dir.display(), "generating inputs");
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed ^ n as u64),
                None => StdRng::from_entropy(),
            };
            store::save_file(&store::generate(n, &mut rng), &path_a)?;
            store::save_file(&store::generate(n, &mut rng), &path_b)?;
        }

        let a = store::load_file(&path_a)?;
        let b = store::load_file(&path_b)?;
        if a.dim() != n || b.dim() != n {
            return Err(Error::Config(format!(
                "{} holds a {}x{} matrix, expected {}x{}",
                path_a.display(),
                a.dim(),
                a.dim(),
                n,
                n
            )));
        }
        Ok((a, b))
    }

    fn save_result(&self, result: &Matrix) -> Result<(), Error> {
        store::save_file(result, &self.result_path(result.dim()))
    }
}

/// Single-threaded sweep, averaging `runs` products per size.
pub fn run_sequential(plan: &SweepPlan, runs: usize) -> Result<TimingReport, Error> {
    check_runs(runs)?;
    let mut report = TimingReport::new("sequential");

    for &n in &plan.sizes {
        let (a, b) = plan.prepare_inputs(n)?;
        let (samples, result) = time_runs(runs, || multiply(&a, &b))?;
        plan.save_result(&result)?;
        info!(n, mean = ?mean(&samples), "sequential size done");
        report.record(n, 1, &samples);
    }

    report.write_to(&plan.report_path(report.variant()))?;
    Ok(report)
}

/// Shared-memory sweep over every size and thread count.
pub fn run_threaded(plan: &SweepPlan, threads: &[usize], runs: usize) -> Result<TimingReport, Error> {
    check_runs(runs)?;
    if threads.is_empty() || threads.contains(&0) {
        return Err(Error::Config("thread counts must be positive".to_string()));
    }
    let mut report = TimingReport::new("threaded");

    for &n in &plan.sizes {
        let (a, b) = plan.prepare_inputs(n)?;
        for &count in threads {
            let (samples, result) = time_runs(runs, || multiply_threaded(&a, &b, count))?;
            plan.save_result(&result)?;
            info!(n, threads = count, mean = ?mean(&samples), "threaded size done");
            report.record(n, count, &samples);
        }
    }

    report.write_to(&plan.report_path(report.variant()))?;
    Ok(report)
}

/// Distributed sweep for one worker.
///
/// Every worker walks the same sizes in the same order. Only the coordinator
/// touches the filesystem and gets a report back.
pub async fn run_distributed<C>(comm: &C, plan: &SweepPlan) -> Result<Option<TimingReport>, Error>
where
    C: Communicator + ?Sized,
{
    let identity = comm.identity();
    let worker = Worker::new(comm);
    let mut report = identity
        .is_coordinator()
        .then(|| TimingReport::new("distributed"));

    for &n in &plan.sizes {
        let inputs = if identity.is_coordinator() {
            Some(plan.prepare_inputs(n)?)
        } else {
            None
        };

        if let Some(outcome) = worker.run_round(inputs).await? {
            plan.save_result(&outcome.result)?;
            if let Some(report) = report.as_mut() {
                report.record(n, identity.total_workers(), &[outcome.elapsed]);
            }
        }
    }

    if let Some(report) = &report {
        report.write_to(&plan.report_path(report.variant()))?;
    }
    Ok(report)
}

/// Runs a distributed sweep with `workers` in-process workers.
///
/// The first worker to fail stops the whole world.
pub async fn run_local_world(workers: usize, plan: &SweepPlan) -> Result<TimingReport, Error> {
    let world = LocalCommunicator::world(workers)?;
    let plan = Arc::new(plan.clone());
    let mut tasks = JoinSet::new();

    for comm in world {
        let plan = Arc::clone(&plan);
        tasks.spawn(async move { run_distributed(&comm, &plan).await });
    }

    let mut report = None;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(Some(coordinator_report)) => report = Some(coordinator_report),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "worker failed, stopping the world");
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    report.ok_or_else(|| Error::Config("no coordinator in the world".to_string()))
}

/// Outcome of checking one persisted result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Missing,
}

/// Recomputes every size sequentially and compares with `res_{n}.txt`.
///
/// Sizes without a result file are reported as missing; the first mismatch
/// is an error.
pub fn verify(plan: &SweepPlan) -> Result<Vec<(usize, Verdict)>, Error> {
    let mut verdicts = Vec::with_capacity(plan.sizes.len());

    for &n in &plan.sizes {
        let path = plan.result_path(n);
        let (path_a, path_b) = plan.input_paths(n);
        if !path.exists() || !path_a.exists() || !path_b.exists() {
            warn!(n, "no result to verify");
            verdicts.push((n, Verdict::Missing));
            continue;
        }

        let a = store::load_file(&path_a)?;
        let b = store::load_file(&path_b)?;
        let stored = store::load_file(&path)?;
        let expected = multiply(&a, &b)?;
        check_same(&path, &expected, &stored)?;

        info!(n, "result verified");
        verdicts.push((n, Verdict::Match));
    }
    Ok(verdicts)
}

fn check_same(path: &Path, expected: &Matrix, stored: &Matrix) -> Result<(), Error> {
    if expected.dim() != stored.dim() {
        return Err(Error::DimensionMismatch(expected.dim(), stored.dim()));
    }
    let n = expected.dim();
    match expected
        .as_slice()
        .iter()
        .zip(stored.as_slice())
        .position(|(e, s)| e != s)
    {
        Some(index) => Err(Error::VerificationFailed {
            path: path.to_path_buf(),
            row: index / n,
            col: index % n,
        }),
        None => Ok(()),
    }
}

fn time_runs<F>(runs: usize, mut product: F) -> Result<(Vec<Duration>, Matrix), Error>
where
    F: FnMut() -> Result<Matrix, Error>,
{
    let mut samples = Vec::with_capacity(runs);
    let mut last = None;
    for _ in 0..runs {
        let started = Instant::now();
        let result = product()?;
        samples.push(started.elapsed());
        last = Some(result);
    }
    let result = last.ok_or_else(|| Error::Config("run count must be positive".to_string()))?;
    Ok((samples, result))
}

fn check_runs(runs: usize) -> Result<(), Error> {
    if runs == 0 {
        return Err(Error::Config("run count must be positive".to_string()));
    }
    Ok(())
}

fn mean(samples: &[Duration]) -> Duration {
    match samples.len() {
        0 => Duration::ZERO,
        len => samples.iter().sum::<Duration>() / len as u32,
    }
}
