use crate::Error;

/// Rank of the worker that loads inputs, distributes them and receives the
/// reduced result.
pub const COORDINATOR_RANK: usize = 0;

/// Position of one worker in a fixed-size world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerIdentity {
    rank: usize,
    total_workers: usize,
}

impl WorkerIdentity {
    /// Rejects empty worlds and ranks outside `[0, total_workers)`.
    pub fn new(rank: usize, total_workers: usize) -> Result<Self, Error> {
        if total_workers == 0 || rank >= total_workers {
            return Err(Error::InvalidWorld {
                rank,
                total_workers,
            });
        }
        Ok(Self {
            rank,
            total_workers,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn total_workers(&self) -> usize {
        self.total_workers
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }

    /// Fails with [`Error::InvalidRank`] unless `rank` belongs to this world.
    pub fn check_rank(&self, rank: usize) -> Result<(), Error> {
        if rank < self.total_workers {
            Ok(())
        } else {
            Err(Error::InvalidRank {
                rank,
                total_workers: self.total_workers,
            })
        }
    }

    /// All ranks other than this one, in increasing order.
    pub fn peers(&self) -> impl Iterator<Item = usize> + use<> {
        let rank = self.rank;
        (0..self.total_workers).filter(move |&r| r != rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_world() {
        assert!(matches!(
            WorkerIdentity::new(0, 0),
            Err(Error::InvalidWorld { .. })
        ));
    }

    #[test]
    fn rejects_rank_past_world() {
        assert!(WorkerIdentity::new(3, 3).is_err());
        assert!(WorkerIdentity::new(2, 3).is_ok());
    }

    #[test]
    fn coordinator_is_rank_zero() {
        assert!(WorkerIdentity::new(0, 4).unwrap().is_coordinator());
        assert!(!WorkerIdentity::new(1, 4).unwrap().is_coordinator());
    }

    #[test]
    fn peers_skip_self() {
        let identity = WorkerIdentity::new(2, 4).unwrap();
        assert_eq!(identity.peers().collect::<Vec<_>>(), vec![0, 1, 3]);
    }
}
