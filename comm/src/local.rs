//! In-process transport: every worker of the world lives in one address space.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Communicator, Error, Inbox, Tag, WorkerIdentity};

/// One endpoint of a world whose workers share a process.
///
/// Endpoints only exchange owned payloads through their inboxes, so workers
/// still never touch each other's data.
#[derive(Clone)]
pub struct LocalCommunicator {
    identity: WorkerIdentity,
    inboxes: Arc<Vec<Inbox>>,
    recv_timeout: Option<Duration>,
}

impl LocalCommunicator {
    /// Creates the endpoints of a `total_workers` world, ordered by rank.
    pub fn world(total_workers: usize) -> Result<Vec<Self>, Error> {
        WorkerIdentity::new(0, total_workers)?;
        let inboxes = Arc::new((0..total_workers).map(|_| Inbox::new()).collect::<Vec<_>>());

        (0..total_workers)
            .map(|rank| {
                Ok(Self {
                    identity: WorkerIdentity::new(rank, total_workers)?,
                    inboxes: Arc::clone(&inboxes),
                    recv_timeout: None,
                })
            })
            .collect()
    }

    /// Makes every receive on this endpoint fail after `timeout`.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Communicator for LocalCommunicator {
    fn identity(&self) -> WorkerIdentity {
        self.identity
    }

    async fn send(&self, dest: usize, tag: Tag, payload: Vec<i64>) -> Result<(), Error> {
        self.identity.check_rank(dest)?;
        self.inboxes[dest].push(self.identity.rank(), tag, payload);
        Ok(())
    }

    async fn recv(&self, source: usize, tag: Tag) -> Result<Vec<i64>, Error> {
        self.identity.check_rank(source)?;
        self.inboxes[self.identity.rank()]
            .take_within(source, tag, self.recv_timeout)
            .await
    }

    async fn recv_unbounded(&self, source: usize, tag: Tag) -> Result<Vec<i64>, Error> {
        self.identity.check_rank(source)?;
        Ok(self.inboxes[self.identity.rank()].take(source, tag).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn reduce_all(world: Vec<LocalCommunicator>, root: usize) -> Vec<Option<Vec<Vec<i64>>>> {
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| {
                tokio::spawn(async move {
                    let rank = comm.identity().rank() as i64;
                    let rows = vec![vec![rank, 1], vec![10 * rank, 2]];
                    comm.reduce_sum_rows(rows, root, 3).await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        results
    }

    #[test]
    fn world_rejects_zero_workers() {
        assert!(matches!(
            LocalCommunicator::world(0),
            Err(Error::InvalidWorld { .. })
        ));
    }

    #[tokio::test]
    async fn send_then_recv() {
        let world = LocalCommunicator::world(3).unwrap();
        world[0].send(2, 1, vec![5, 6]).await.unwrap();
        world[1].send(2, 1, vec![7]).await.unwrap();

        assert_eq!(world[2].recv(1, 1).await.unwrap(), vec![7]);
        assert_eq!(world[2].recv(0, 1).await.unwrap(), vec![5, 6]);
    }

    #[tokio::test]
    async fn send_to_unknown_rank_fails() {
        let world = LocalCommunicator::world(2).unwrap();
        let err = world[0].send(2, 0, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRank { rank: 2, total_workers: 2 }));
    }

    #[tokio::test]
    async fn rows_arrive_in_order() {
        let world = LocalCommunicator::world(2).unwrap();
        world[0]
            .send_rows(1, 4, vec![vec![1], vec![2], vec![3]])
            .await
            .unwrap();
        let rows = world[1].recv_rows(0, 4, 3).await.unwrap();
        assert_eq!(rows, vec![vec![1], vec![2], vec![3]]);
    }

    #[tokio::test]
    async fn reduce_reaches_root_only() {
        for size in 1..=7 {
            let world = LocalCommunicator::world(size).unwrap();
            let results = reduce_all(world, 0).await;

            let n = size as i64;
            let rank_sum = n * (n - 1) / 2;
            assert_eq!(
                results[0],
                Some(vec![vec![rank_sum, n], vec![10 * rank_sum, 2 * n]]),
                "world of {}",
                size
            );
            assert!(results[1..].iter().all(Option::is_none));
        }
    }

    #[tokio::test]
    async fn reduce_to_non_zero_root() {
        let world = LocalCommunicator::world(5).unwrap();
        let results = reduce_all(world, 3).await;

        assert_eq!(results[3], Some(vec![vec![10, 5], vec![100, 10]]));
        assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
    }

    #[tokio::test]
    async fn missing_contribution_times_out() {
        let mut world = LocalCommunicator::world(2).unwrap();
        let _silent = world.pop().unwrap();
        let root = world
            .pop()
            .unwrap()
            .with_recv_timeout(Duration::from_millis(50));

        let err = root
            .reduce_sum_rows(vec![vec![1]], 0, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { from: 1, tag: 3, .. }));
    }

    #[tokio::test]
    async fn unbounded_recv_outlasts_the_deadline() {
        let world = LocalCommunicator::world(2).unwrap();
        let sender = world[0].clone();
        let receiver = world[1].clone().with_recv_timeout(Duration::from_millis(30));

        assert!(matches!(
            receiver.recv(0, 0).await,
            Err(Error::Timeout { from: 0, tag: 0, .. })
        ));

        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            sender.send(1, 0, vec![9]).await
        });
        assert_eq!(receiver.recv_unbounded(0, 0).await.unwrap(), vec![9]);
        late.await.unwrap().unwrap();
    }
}
