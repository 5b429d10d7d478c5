//! One distributed round: distribute, multiply locally, reduce.

use std::time::{Duration, Instant};

use matmul_comm::{Communicator, WorkerIdentity};
use tracing::{debug, info};

use crate::distribute::distribute;
use crate::multiply::multiply_range;
use crate::partition::assign_rows;
use crate::reduce::reduce_sum;
use crate::{Error, Matrix};

/// What the coordinator holds after a round.
#[derive(Debug)]
pub struct RoundOutcome {
    pub result: Matrix,
    /// Local product plus reduction, as seen by the coordinator.
    pub elapsed: Duration,
}

/// Drives rounds for one worker. Every rank runs the same code.
pub struct Worker<'a, C: Communicator + ?Sized> {
    comm: &'a C,
}

impl<'a, C: Communicator + ?Sized> Worker<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self { comm }
    }

    pub fn identity(&self) -> WorkerIdentity {
        self.comm.identity()
    }

    /// Runs one problem size to completion.
    ///
    /// The coordinator passes the operands and gets `Some` outcome back; the
    /// other workers pass `None` and get `None`. Returns only after this
    /// worker's part of the reduction is done.
    pub async fn run_round(
        &self,
        inputs: Option<(Matrix, Matrix)>,
    ) -> Result<Option<RoundOutcome>, Error> {
        let identity = self.identity();
        let (a, b) = distribute(self.comm, inputs).await?;

        let n = a.dim();
        let range = assign_rows(n, identity.total_workers(), identity.rank());
        debug!(rank = identity.rank(), start = range.start, end = range.end, "computing rows");

        let started = Instant::now();
        let partial = tokio::task::spawn_blocking(move || multiply_range(&a, &b, range)).await??;
        let reduced = reduce_sum(self.comm, partial).await?;
        let elapsed = started.elapsed();

        Ok(reduced.map(|result| {
            info!(n, workers = identity.total_workers(), ?elapsed, "round complete");
            RoundOutcome { result, elapsed }
        }))
    }
}
