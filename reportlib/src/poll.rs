//! Waiting for a submitted query to be approved.
//!
//! A query submitted from the builder starts out `pending`. The poller checks
//! its status right away and then on a fixed interval until it is approved,
//! rejected, cancelled, or the attempt/time ceiling is reached.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::{DeveloperQuery, QueryStatus};
use crate::error::ReportError;
use crate::Result;

/// Anything that can report the current state of a saved query.
pub trait QuerySource {
    fn fetch_query(&self, id: i64) -> impl Future<Output = Result<DeveloperQuery>> + Send;
}

/// How often and for how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl PollPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Poll `source` until query `id` is approved.
///
/// Returns the approved query. Fetch errors are logged and count as an
/// attempt; they never end the wait on their own.
pub async fn wait_for_approval<S: QuerySource>(
    source: &S,
    id: i64,
    policy: PollPolicy,
    cancel: CancellationToken,
) -> Result<DeveloperQuery> {
    let polling = poll_until_decided(source, id, policy, &cancel);
    match timeout(policy.timeout, polling).await {
        Ok(outcome) => outcome,
        Err(_) => {
            log::warn!("gave up on query {} after {:?}", id, policy.timeout);
            Err(ReportError::PollTimeout {
                id,
                seconds: policy.timeout.as_secs(),
            })
        }
    }
}

async fn poll_until_decided<S: QuerySource>(
    source: &S,
    id: i64,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<DeveloperQuery> {
    let mut ticker = interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("stopped polling query {}", id);
                return Err(ReportError::PollCancelled(id));
            }
            _ = ticker.tick() => {}
        }
        attempts += 1;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::PollCancelled(id)),
            fetched = source.fetch_query(id) => fetched,
        };

        match fetched {
            Ok(query) => match query.status {
                QueryStatus::Approved => {
                    log::info!("query {} approved after {} checks", id, attempts);
                    return Ok(query);
                }
                QueryStatus::Rejected => return Err(ReportError::QueryRejected(id)),
                QueryStatus::Pending => {
                    log::debug!("query {} still pending (check {})", id, attempts);
                }
            },
            Err(err) => log::warn!("checking query {} failed: {}", id, err),
        }
    }

    Err(ReportError::PollExhausted { id, attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Answers with a scripted sequence of statuses, repeating the last one.
    struct Scripted {
        statuses: Vec<Option<QueryStatus>>,
        calls: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(statuses: Vec<Option<QueryStatus>>) -> Self {
            Self {
                statuses,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QuerySource for Scripted {
        async fn fetch_query(&self, id: i64) -> Result<DeveloperQuery> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let status = self.statuses[n.min(self.statuses.len() - 1)];
            match status {
                Some(status) => Ok(DeveloperQuery {
                    id,
                    name: "user_query_1".to_string(),
                    variation_name: None,
                    query: "SELECT close_price FROM stock_prices".to_string(),
                    status,
                    created_at: String::new(),
                }),
                None => Err(ReportError::Api {
                    status: 502,
                    detail: "Bad Gateway".to_string(),
                }),
            }
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy::new()
            .interval(Duration::from_secs(5))
            .max_attempts(10)
            .timeout(Duration::from_secs(600))
    }

    #[tokio::test(start_paused = true)]
    async fn test_approved_immediately() {
        let source = Scripted::new(vec![Some(QueryStatus::Approved)]);
        let query = wait_for_approval(&source, 1, fast_policy(), CancellationToken::new())
            .await
            .unwrap();
        assert!(query.is_approved());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_approved_after_pending() {
        let source = Scripted::new(vec![
            Some(QueryStatus::Pending),
            Some(QueryStatus::Pending),
            Some(QueryStatus::Approved),
        ]);
        let started = tokio::time::Instant::now();
        let query = wait_for_approval(&source, 4, fast_policy(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(query.id, 4);
        assert_eq!(source.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_stops_polling() {
        let source = Scripted::new(vec![Some(QueryStatus::Pending), Some(QueryStatus::Rejected)]);
        let err = wait_for_approval(&source, 2, fast_policy(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::QueryRejected(2)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts() {
        let source = Scripted::new(vec![Some(QueryStatus::Pending)]);
        let err = wait_for_approval(&source, 3, fast_policy().max_attempts(3), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::PollExhausted { id: 3, attempts: 3 }));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_count_as_attempts() {
        let source = Scripted::new(vec![None, None, Some(QueryStatus::Approved)]);
        let query = wait_for_approval(&source, 5, fast_policy(), CancellationToken::new())
            .await
            .unwrap();
        assert!(query.is_approved());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let source = Scripted::new(vec![Some(QueryStatus::Pending)]);
        let policy = fast_policy()
            .max_attempts(1000)
            .timeout(Duration::from_secs(12));
        let err = wait_for_approval(&source, 6, policy, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::PollTimeout { id: 6, seconds: 12 }));
        // Checks at 0s, 5s and 10s
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let source = Scripted::new(vec![Some(QueryStatus::Pending)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });
        let err = wait_for_approval(&source, 8, fast_policy(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::PollCancelled(8)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled() {
        let source = Scripted::new(vec![Some(QueryStatus::Approved)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wait_for_approval(&source, 9, fast_policy(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::PollCancelled(9)));
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 120);
        assert_eq!(policy.timeout, Duration::from_secs(600));
    }
}
