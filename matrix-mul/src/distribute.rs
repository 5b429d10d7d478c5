//! Hands both operands from the coordinator to every other worker.

use matmul_comm::{COORDINATOR_RANK, Communicator, Tag};
use tracing::{debug, info};

use crate::{Error, Matrix};

/// Problem dimension, sent ahead of any matrix data.
pub const DIMENSION: Tag = 0;
/// Rows of the left operand.
pub const MATRIX_A: Tag = 1;
/// Rows of the right operand.
pub const MATRIX_B: Tag = 2;

/// Sends `n` to every other worker, in increasing rank order.
pub async fn broadcast_dimension<C>(comm: &C, n: usize) -> Result<(), Error>
where
    C: Communicator + ?Sized,
{
    for peer in comm.identity().peers() {
        comm.send(peer, DIMENSION, vec![n as i64]).await?;
    }
    Ok(())
}

/// Sends every row of `matrix`, in row order, to every other worker.
pub async fn broadcast_matrix<C>(comm: &C, matrix: &Matrix, tag: Tag) -> Result<(), Error>
where
    C: Communicator + ?Sized,
{
    for peer in comm.identity().peers() {
        comm.send_rows(peer, tag, matrix.to_rows()).await?;
        debug!(peer, tag, rows = matrix.dim(), "matrix sent");
    }
    Ok(())
}

/// Waits for the next round's dimension with no receive deadline, since the
/// coordinator may still be preparing its inputs.
pub async fn receive_dimension<C>(comm: &C) -> Result<usize, Error>
where
    C: Communicator + ?Sized,
{
    let payload = comm.recv_unbounded(COORDINATOR_RANK, DIMENSION).await?;
    let n = match payload.as_slice() {
        [n] if *n > 0 => usize::try_from(*n).ok(),
        _ => None,
    };
    n.filter(|&n| Matrix::cell_count(n).is_some()).ok_or_else(|| {
        Error::Protocol(format!(
            "expected one positive, addressable dimension, got {:?}",
            payload
        ))
    })
}

/// Blocks until all `n` rows tagged `tag` have arrived.
pub async fn receive_matrix<C>(comm: &C, n: usize, tag: Tag) -> Result<Matrix, Error>
where
    C: Communicator + ?Sized,
{
    let mut data = Vec::new();
    for i in 0..n {
        let row = comm.recv(COORDINATOR_RANK, tag).await?;
        if row.len() != n {
            return Err(Error::Protocol(format!(
                "row {} of tag {} has {} values, expected {}",
                i,
                tag,
                row.len(),
                n
            )));
        }
        data.extend(row);
    }
    Matrix::from_flat(n, data)
}

/// Leaves every worker holding its own copy of both operands.
///
/// Every worker calls this with the same code; the coordinator passes
/// `Some((a, b))` and the others pass `None`. The coordinator sends the
/// dimension to all peers before any matrix row.
pub async fn distribute<C>(comm: &C, inputs: Option<(Matrix, Matrix)>) -> Result<(Matrix, Matrix), Error>
where
    C: Communicator + ?Sized,
{
    let identity = comm.identity();

    if identity.is_coordinator() {
        let (a, b) = inputs
            .ok_or_else(|| Error::Config("coordinator started without operands".to_string()))?;
        if a.dim() != b.dim() {
            return Err(Error::DimensionMismatch(a.dim(), b.dim()));
        }
        if a.dim() == 0 {
            return Err(Error::Config("matrix dimension must be positive".to_string()));
        }

        broadcast_dimension(comm, a.dim()).await?;
        broadcast_matrix(comm, &a, MATRIX_A).await?;
        broadcast_matrix(comm, &b, MATRIX_B).await?;
        info!(n = a.dim(), peers = identity.total_workers() - 1, "operands distributed");
        Ok((a, b))
    } else {
        let n = receive_dimension(comm).await?;
        let a = receive_matrix(comm, n, MATRIX_A).await?;
        let b = receive_matrix(comm, n, MATRIX_B).await?;
        debug!(rank = identity.rank(), n, "operands received");
        Ok((a, b))
    }
}
