//! Buffered incoming messages, keyed by sender and tag.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use crate::{Error, Tag};

type Queues = HashMap<(usize, Tag), VecDeque<Vec<i64>>>;

/// Messages that arrived at a worker but were not received yet.
///
/// Payloads from one sender with one tag come out in the order they were
/// pushed. Receivers waiting on different `(source, tag)` keys never see each
/// other's messages.
pub struct Inbox {
    queues: Mutex<Queues>,
    arrived: Notify,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            arrived: Notify::new(),
        }
    }

    pub fn push(&self, source: usize, tag: Tag, payload: Vec<i64>) {
        self.lock()
            .entry((source, tag))
            .or_default()
            .push_back(payload);
        self.arrived.notify_waiters();
    }

    pub fn try_take(&self, source: usize, tag: Tag) -> Option<Vec<i64>> {
        let mut queues = self.lock();
        let queue = queues.get_mut(&(source, tag))?;
        let payload = queue.pop_front();
        if queue.is_empty() {
            queues.remove(&(source, tag));
        }
        payload
    }

    /// Waits until a payload from `source` with `tag` is available.
    pub async fn take(&self, source: usize, tag: Tag) -> Vec<i64> {
        loop {
            let arrived = self.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            if let Some(payload) = self.try_take(source, tag) {
                return payload;
            }
            arrived.await;
        }
    }

    /// Like [`Inbox::take`], but gives up after `deadline` when one is set.
    pub async fn take_within(
        &self,
        source: usize,
        tag: Tag,
        deadline: Option<Duration>,
    ) -> Result<Vec<i64>, Error> {
        match deadline {
            None => Ok(self.take(source, tag).await),
            Some(waited) => tokio::time::timeout(waited, self.take(source, tag))
                .await
                .map_err(|_| Error::Timeout {
                    from: source,
                    tag,
                    waited,
                }),
        }
    }

    /// Number of buffered payloads across all senders and tags.
    pub fn len(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn keeps_per_sender_order() {
        let inbox = Inbox::new();
        inbox.push(1, 0, vec![1]);
        inbox.push(1, 0, vec![2]);
        inbox.push(2, 0, vec![3]);

        assert_eq!(inbox.len(), 3);
        assert_eq!(inbox.try_take(1, 0), Some(vec![1]));
        assert_eq!(inbox.try_take(1, 0), Some(vec![2]));
        assert_eq!(inbox.try_take(1, 0), None);
        assert_eq!(inbox.try_take(2, 0), Some(vec![3]));
        assert!(inbox.is_empty());
    }

    #[test]
    fn tags_do_not_mix() {
        let inbox = Inbox::new();
        inbox.push(0, 1, vec![10]);
        inbox.push(0, 2, vec![20]);

        assert_eq!(inbox.try_take(0, 2), Some(vec![20]));
        assert_eq!(inbox.try_take(0, 1), Some(vec![10]));
    }

    #[tokio::test]
    async fn take_waits_for_push() {
        let inbox = Arc::new(Inbox::new());
        let waiter = {
            let inbox = Arc::clone(&inbox);
            tokio::spawn(async move { inbox.take(3, 9).await })
        };

        tokio::task::yield_now().await;
        inbox.push(3, 8, vec![0]);
        inbox.push(3, 9, vec![42]);

        assert_eq!(waiter.await.unwrap(), vec![42]);
        assert_eq!(inbox.try_take(3, 8), Some(vec![0]));
    }

    #[tokio::test]
    async fn take_within_times_out() {
        let inbox = Inbox::new();
        let err = inbox
            .take_within(1, 5, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { from: 1, tag: 5, .. }));
    }
}
