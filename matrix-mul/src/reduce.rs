//! Combines the workers' partial products on the coordinator.

use matmul_comm::{COORDINATOR_RANK, Communicator, Tag};

use crate::{Error, Matrix};

/// Partial products travelling to the coordinator.
pub const PARTIAL_SUM: Tag = 3;

/// Collective element-wise sum of every worker's `partial`.
///
/// Every worker must call this once per round. The coordinator gets the
/// summed matrix; every other worker gets `None`. Each worker sends its
/// N×N payload once, whatever the world size.
pub async fn reduce_sum<C>(comm: &C, partial: Matrix) -> Result<Option<Matrix>, Error>
where
    C: Communicator + ?Sized,
{
    let n = partial.dim();
    let summed = comm
        .reduce_sum_rows(partial.to_rows(), COORDINATOR_RANK, PARTIAL_SUM)
        .await?;

    match summed {
        Some(rows) => {
            let result = Matrix::from_rows(rows)?;
            if result.dim() != n {
                return Err(Error::Protocol(format!(
                    "reduced matrix is {}x{}, expected {}x{}",
                    result.dim(),
                    result.dim(),
                    n,
                    n
                )));
            }
            Ok(Some(result))
        }
        None => Ok(None),
    }
}

/// Element-wise sum of in-memory partial products.
///
/// Uses true (wrapping) addition, so overlapping contributions add up
/// instead of one of them winning.
pub fn sum_partials(partials: &[Matrix]) -> Result<Matrix, Error> {
    let Some(first) = partials.first() else {
        return Err(Error::Config("nothing to reduce".to_string()));
    };

    let mut total = Matrix::zeros(first.dim());
    for partial in partials {
        if partial.dim() != total.dim() {
            return Err(Error::DimensionMismatch(total.dim(), partial.dim()));
        }
        for (acc, value) in total.as_mut_slice().iter_mut().zip(partial.as_slice()) {
            *acc = acc.wrapping_add(*value);
        }
    }
    Ok(total)
}
