use crate::model::{Error, FetchFilter, FetchRecord, RepositoryRef, Result, WorkerPoolConfig};
use crate::source::{FetchError, PullRequestSource};
use futures::future;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::Mutex;
use tokio::time::Instant;

const LOG_TARGET: &str = "pool";

type WorkQueue = Arc<Mutex<VecDeque<RepositoryRef>>>;

/// Outcome of one repository's fetch, created once by the worker that
/// processed it.
#[derive(Debug, Clone)]
pub struct RepositoryResult {
    pub repository: RepositoryRef,
    pub outcome: std::result::Result<Vec<FetchRecord>, FetchError>,
}

impl RepositoryResult {
    /// Records of a successful fetch, empty on failure.
    pub fn records(&self) -> &[FetchRecord] {
        self.outcome.as_deref().unwrap_or(&[])
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}

/// Bounded pool of workers draining a shared queue of repositories.
pub struct WorkerPool<S> {
    source: Arc<S>,
    config: Arc<WorkerPoolConfig>,
}

impl<S: PullRequestSource> WorkerPool<S> {
    pub fn new(source: S, config: WorkerPoolConfig) -> Result<Self> {
        if config.max_workers < 1 {
            return Err(Error::PoolStart(format!(
                "at least one worker is required, got {}",
                config.max_workers
            )));
        }
        Ok(Self {
            source: Arc::new(source),
            config: Arc::new(config),
        })
    }

    pub async fn run(
        &self,
        repos: &[RepositoryRef],
        filter: &FetchFilter,
    ) -> Vec<RepositoryResult> {
        self.run_with(repos, filter, None, |_| {}).await
    }

    /// Fetches every repository and returns exactly one result per input.
    ///
    /// `on_result` sees each result as it arrives. Once `deadline` passes,
    /// in-flight fetches are abandoned and queued repositories are reported
    /// as cancelled.
    pub async fn run_with<F>(
        &self,
        repos: &[RepositoryRef],
        filter: &FetchFilter,
        deadline: Option<Instant>,
        mut on_result: F,
    ) -> Vec<RepositoryResult>
    where
        F: FnMut(&RepositoryResult),
    {
        if repos.is_empty() {
            return vec![];
        }

        let queue: WorkQueue = Arc::new(Mutex::new(repos.iter().cloned().collect()));
        let filter = Arc::new(filter.clone());
        let (sender, mut receiver) = unbounded_channel();

        let workers = self.config.max_workers.min(repos.len());
        log::debug!(
            target: LOG_TARGET,
            "dispatching {} repositories to {workers} workers",
            repos.len()
        );
        let handles = (0..workers)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    Arc::clone(&self.source),
                    Arc::clone(&queue),
                    Arc::clone(&filter),
                    Arc::clone(&self.config),
                    deadline,
                    sender.clone(),
                ))
            })
            .collect::<Vec<_>>();
        // Only workers hold senders now, so the channel closes once they all exit.
        drop(sender);

        let mut results = Vec::with_capacity(repos.len());
        while let Some(result) = receiver.recv().await {
            on_result(&result);
            results.push(result);
        }

        for joined in future::join_all(handles).await {
            if let Err(e) = joined {
                log::error!(target: LOG_TARGET, "worker exited abnormally: {e}");
            }
        }
        results
    }
}

async fn worker<S: PullRequestSource>(
    id: usize,
    source: Arc<S>,
    queue: WorkQueue,
    filter: Arc<FetchFilter>,
    config: Arc<WorkerPoolConfig>,
    deadline: Option<Instant>,
    results: UnboundedSender<RepositoryResult>,
) {
    log::debug!(target: LOG_TARGET, "worker #{id} started");
    loop {
        let next = queue.lock().await.pop_front();
        let Some(repository) = next else {
            break;
        };

        let outcome = if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Err(FetchError::Cancelled)
        } else {
            log::debug!(target: LOG_TARGET, "worker #{id} fetching {repository}");
            fetch_one(&source, &repository, &filter, &config, deadline).await
        };

        if results.send(RepositoryResult { repository, outcome }).is_err() {
            break;
        }
    }
    log::debug!(target: LOG_TARGET, "worker #{id} finished");
}

/// Runs a single fetch on its own task so a panic or an expired timer only
/// affects this repository.
async fn fetch_one<S: PullRequestSource>(
    source: &Arc<S>,
    repository: &RepositoryRef,
    filter: &Arc<FetchFilter>,
    config: &Arc<WorkerPoolConfig>,
    deadline: Option<Instant>,
) -> std::result::Result<Vec<FetchRecord>, FetchError> {
    let task = {
        let source = Arc::clone(source);
        let repository = repository.clone();
        let filter = Arc::clone(filter);
        let config = Arc::clone(config);
        tokio::spawn(async move { source.fetch(&repository, &filter, &config).await })
    };
    let abort = task.abort_handle();

    let timeout_at = config.fetch_timeout.map(|timeout| Instant::now() + timeout);
    let expires_at = match (timeout_at, deadline) {
        (Some(timeout_at), Some(deadline)) => Some(timeout_at.min(deadline)),
        (timeout_at, deadline) => timeout_at.or(deadline),
    };

    let joined = match expires_at {
        None => task.await,
        Some(expires_at) => match tokio::time::timeout_at(expires_at, task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.abort();
                let cancelled = deadline.is_some_and(|deadline| deadline <= expires_at);
                return Err(match (cancelled, config.fetch_timeout) {
                    (false, Some(timeout)) => FetchError::Timeout(timeout),
                    _ => FetchError::Cancelled,
                });
            }
        },
    };
    joined.unwrap_or_else(|e| Err(FetchError::Panicked(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PullRequestState;
    use chrono::{TimeZone, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(number: u64) -> FetchRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        FetchRecord::new(
            number,
            format!("PR {number}"),
            PullRequestState::Merged,
            at,
            Some(at),
            None,
        )
    }

    fn repos(names: &[&str]) -> Vec<RepositoryRef> {
        names.iter().map(|name| RepositoryRef::new("acme", name)).collect()
    }

    enum Reply {
        Records(Vec<u64>),
        Fail,
        Panic,
        Hang,
    }

    /// Answers per repository name and tracks how many fetches overlap.
    struct ScriptedSource {
        replies: HashMap<String, Reply>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(replies: Vec<(&'static str, Reply)>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|(name, reply)| (name.to_string(), reply))
                    .collect(),
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl PullRequestSource for ScriptedSource {
        async fn fetch(
            &self,
            repository: &RepositoryRef,
            _filter: &FetchFilter,
            _config: &WorkerPoolConfig,
        ) -> std::result::Result<Vec<FetchRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.replies.get(&repository.name) {
                Some(Reply::Records(numbers)) => Ok(numbers.iter().copied().map(record).collect()),
                Some(Reply::Fail) | None => {
                    Err(FetchError::Api(format!("{repository} unavailable")))
                }
                Some(Reply::Panic) => panic!("source blew up on {repository}"),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec![])
                }
            }
        }
    }

    fn by_name(results: &[RepositoryResult]) -> HashMap<&str, &RepositoryResult> {
        results.iter().map(|r| (r.repository.name.as_str(), r)).collect()
    }

    #[test]
    fn zero_workers_cannot_start() {
        let source = ScriptedSource::new(vec![]);
        let err = WorkerPool::new(source, WorkerPoolConfig::new(0, 0, 100)).err().unwrap();
        assert!(matches!(err, Error::PoolStart(_)));
    }

    #[tokio::test]
    async fn empty_dispatch_list_is_a_no_op() {
        let pool =
            WorkerPool::new(ScriptedSource::new(vec![]), WorkerPoolConfig::default()).unwrap();
        assert!(pool.run(&[], &FetchFilter::default()).await.is_empty());
        assert_eq!(pool.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failure_is_isolated_to_its_repository() {
        let source = ScriptedSource::new(vec![
            ("a", Reply::Records(vec![2, 1])),
            ("b", Reply::Fail),
            ("c", Reply::Records(vec![])),
        ]);
        let pool = WorkerPool::new(source, WorkerPoolConfig::new(2, 0, 100)).unwrap();
        let results = pool.run(&repos(&["a", "b", "c"]), &FetchFilter::default()).await;

        assert_eq!(results.len(), 3);
        let results = by_name(&results);
        assert_eq!(results["a"].records().iter().map(|r| r.number).collect::<Vec<_>>(), vec![2, 1]);
        assert!(matches!(results["b"].error(), Some(FetchError::Api(_))));
        assert!(results["b"].records().is_empty());
        assert!(results["c"].error().is_none());
        assert!(results["c"].records().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_repository_reports_exactly_once() {
        let names = (0..40).map(|i| format!("repo-{i}")).collect::<Vec<_>>();
        let input = names.iter().map(|name| RepositoryRef::new("acme", name)).collect::<Vec<_>>();
        let source = ScriptedSource::new(vec![]).with_delay(Duration::from_millis(2));
        let pool = WorkerPool::new(source, WorkerPoolConfig::new(7, 0, 100)).unwrap();

        let mut seen_by_callback = 0;
        let results = pool
            .run_with(&input, &FetchFilter::default(), None, |_| seen_by_callback += 1)
            .await;

        assert_eq!(results.len(), input.len());
        assert_eq!(seen_by_callback, input.len());
        let unique = results.iter().map(|r| r.repository.clone()).collect::<HashSet<_>>();
        assert_eq!(unique, input.into_iter().collect::<HashSet<_>>());
        assert_eq!(pool.source.calls.load(Ordering::SeqCst), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallelism_is_bounded_by_max_workers() {
        let source = ScriptedSource::new(vec![]).with_delay(Duration::from_millis(20));
        let pool = WorkerPool::new(source, WorkerPoolConfig::new(3, 0, 100)).unwrap();
        let input = repos(&["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
        let results = pool.run(&input, &FetchFilter::default()).await;

        assert_eq!(results.len(), 9);
        let peak = pool.source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "observed {peak} concurrent fetches");
        assert!(peak >= 2, "fetches never overlapped");
    }

    #[tokio::test]
    async fn panicking_fetch_is_captured() {
        let source = ScriptedSource::new(vec![("a", Reply::Panic), ("b", Reply::Records(vec![5]))]);
        let pool = WorkerPool::new(source, WorkerPoolConfig::new(1, 0, 100)).unwrap();
        let results = pool.run(&repos(&["a", "b"]), &FetchFilter::default()).await;

        let results = by_name(&results);
        assert!(matches!(results["a"].error(), Some(FetchError::Panicked(_))));
        assert_eq!(results["b"].records().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_fetch_times_out_without_blocking_others() {
        let source = ScriptedSource::new(vec![("a", Reply::Hang), ("b", Reply::Records(vec![1]))]);
        let config =
            WorkerPoolConfig::new(2, 0, 100).with_fetch_timeout(Some(Duration::from_secs(5)));
        let pool = WorkerPool::new(source, config).unwrap();
        let results = pool.run(&repos(&["a", "b"]), &FetchFilter::default()).await;

        let results = by_name(&results);
        assert_eq!(results["a"].error(), Some(&FetchError::Timeout(Duration::from_secs(5))));
        assert!(results["b"].error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_remaining_work() {
        let source = ScriptedSource::new(vec![("a", Reply::Hang), ("b", Reply::Records(vec![1]))]);
        let pool = WorkerPool::new(source, WorkerPoolConfig::new(1, 0, 100)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        let results = pool
            .run_with(&repos(&["a", "b"]), &FetchFilter::default(), Some(deadline), |_| {})
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error() == Some(&FetchError::Cancelled)));
    }
}
