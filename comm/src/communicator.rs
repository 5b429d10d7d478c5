//! The message-passing contract shared by every transport.

use async_trait::async_trait;
use tracing::debug;

use crate::{Error, WorkerIdentity};

/// Label that keeps unrelated message streams apart.
pub type Tag = u32;

/// Tagged point-to-point messaging between the workers of a fixed world.
///
/// `send` returns once the payload is buffered at the destination; `recv`
/// blocks until a payload from `source` carrying `tag` is available. Payloads
/// from one sender with one tag are received in the order they were sent.
/// Any failure is fatal to the caller: nothing is retried.
#[async_trait]
pub trait Communicator: Send + Sync {
    fn identity(&self) -> WorkerIdentity;

    async fn send(&self, dest: usize, tag: Tag, payload: Vec<i64>) -> Result<(), Error>;

    async fn recv(&self, source: usize, tag: Tag) -> Result<Vec<i64>, Error>;

    /// Like `recv`, but ignores any receive deadline the transport applies.
    ///
    /// Meant for waits whose length depends on work the sender does first,
    /// such as a coordinator preparing the next inputs.
    async fn recv_unbounded(&self, source: usize, tag: Tag) -> Result<Vec<i64>, Error> {
        self.recv(source, tag).await
    }

    /// Sends `rows` as consecutive messages, first row first.
    async fn send_rows(&self, dest: usize, tag: Tag, rows: Vec<Vec<i64>>) -> Result<(), Error> {
        for row in rows {
            self.send(dest, tag, row).await?;
        }
        Ok(())
    }

    /// Receives exactly `count` consecutive messages.
    async fn recv_rows(&self, source: usize, tag: Tag, count: usize) -> Result<Vec<Vec<i64>>, Error> {
        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            rows.push(self.recv(source, tag).await?);
        }
        Ok(rows)
    }

    /// Element-wise sum of every worker's `rows`, delivered to `root` only.
    ///
    /// All workers must call this with the same `root`, `tag` and row shape.
    /// Contributions travel up a binomial tree rooted at `root`, so every
    /// non-root worker sends its rows exactly once and the root receives
    /// `ceil(log2(W))` batches. Returns `Some` on the root, `None` elsewhere.
    async fn reduce_sum_rows(
        &self,
        rows: Vec<Vec<i64>>,
        root: usize,
        tag: Tag,
    ) -> Result<Option<Vec<Vec<i64>>>, Error> {
        let identity = self.identity();
        identity.check_rank(root)?;

        let size = identity.total_workers();
        let relative = (identity.rank() + size - root) % size;
        let mut acc = rows;
        let mut mask = 1;

        while mask < size {
            if relative & mask != 0 {
                let parent = (relative - mask + root) % size;
                debug!(rank = identity.rank(), parent, tag, "forwarding partial sum");
                self.send_rows(parent, tag, acc).await?;
                return Ok(None);
            }

            let child = relative + mask;
            if child < size {
                let source = (child + root) % size;
                let incoming = self.recv_rows(source, tag, acc.len()).await?;
                debug!(rank = identity.rank(), source, tag, "folding partial sum");
                accumulate(&mut acc, &incoming, source)?;
            }
            mask <<= 1;
        }

        Ok(Some(acc))
    }
}

fn accumulate(acc: &mut [Vec<i64>], incoming: &[Vec<i64>], source: usize) -> Result<(), Error> {
    for (i, (row, other)) in acc.iter_mut().zip(incoming).enumerate() {
        if row.len() != other.len() {
            return Err(Error::Protocol(format!(
                "row {} from rank {} has {} values, expected {}",
                i,
                source,
                other.len(),
                row.len()
            )));
        }
        for (value, add) in row.iter_mut().zip(other) {
            *value = value.wrapping_add(*add);
        }
    }
    Ok(())
}
