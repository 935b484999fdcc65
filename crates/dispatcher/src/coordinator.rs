//! BatchCoordinator - runs one broadcast batch end to end
//!
//! ```text
//! Idle -> Running -> Draining -> Reported -> Idle
//! ```
//!
//! `Running` enumerates destinations and feeds them into a bounded queue
//! drained by exactly `concurrency_bound` workers. Closing the queue moves the
//! batch to `Draining`. The summary is emitted once the pool has drained, or
//! once the global deadline or a shutdown request has cancelled it.

use std::future::{self, Future};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use contracts::{
    AdmissionPolicy, BatchReport, BatchRequest, DestinationId, DestinationSource, DispatchConfig,
    Reporter, SenderGateway,
};
use observability::{record_batch_rejected, record_batch_report, record_enumeration_error};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::counters::{AggregateCounters, CountersSnapshot};
use crate::engine::{DispatchEngine, DEFAULT_PROGRESS_EVERY};
use crate::error::DispatcherError;
use crate::source::list_valid_destinations;

/// Usage message for a batch triggered without payload
pub const USAGE_MISSING_TEXT: &str = "missing text param";

/// Ceiling for deadlines too far out to represent as an instant
const MAX_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lifecycle of the coordinator's current batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BatchState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Reported = 3,
}

impl BatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Draining,
            3 => Self::Reported,
            _ => Self::Idle,
        }
    }
}

/// How the pump phase of a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchEnd {
    Drained,
    DeadlineExpired,
    Interrupted,
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(BatchState::Idle as u8))
    }

    fn get(&self) -> BatchState {
        BatchState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: BatchState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Coordinator settings not carried by the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// What to do when a batch is triggered while one is active
    pub admission: AdmissionPolicy,
    /// Progress line stride
    pub progress_every: u64,
    /// Work queue capacity, 0 = twice the concurrency bound
    pub queue_capacity: usize,
}

impl CoordinatorConfig {
    /// Effective queue capacity for a given concurrency bound
    pub fn queue_capacity_for(&self, bound: usize) -> usize {
        if self.queue_capacity == 0 {
            bound.saturating_mul(2).max(1)
        } else {
            self.queue_capacity
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionPolicy::Queue,
            progress_every: DEFAULT_PROGRESS_EVERY,
            queue_capacity: 0,
        }
    }
}

impl From<&DispatchConfig> for CoordinatorConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            admission: config.admission,
            progress_every: config.progress_every,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Owns the counters and serializes batches over one source and gateway
pub struct BatchCoordinator<S, G> {
    source: Arc<S>,
    gateway: Arc<G>,
    config: CoordinatorConfig,
    counters: Arc<AggregateCounters>,
    gate: Mutex<()>,
    state: StateCell,
}

impl<S, G> BatchCoordinator<S, G>
where
    S: DestinationSource + Send + Sync + 'static,
    G: SenderGateway + 'static,
{
    pub fn new(source: Arc<S>, gateway: Arc<G>, config: CoordinatorConfig) -> Self {
        Self {
            source,
            gateway,
            config,
            counters: Arc::new(AggregateCounters::new()),
            gate: Mutex::new(()),
            state: StateCell::new(),
        }
    }

    /// Current batch state
    pub fn state(&self) -> BatchState {
        self.state.get()
    }

    /// Live counters of the running batch (zero between batches)
    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run one batch and return its report
    ///
    /// Delivery failures and deadline expiry are part of the report, not
    /// errors.
    ///
    /// # Errors
    /// - `Usage` when the payload is empty (the usage line is reported first)
    /// - `InvalidRequest` when the concurrency bound is zero
    /// - `BatchInProgress` under [`AdmissionPolicy::Reject`] while another batch runs
    pub async fn run(
        &self,
        request: &BatchRequest,
        reporter: Arc<dyn Reporter>,
    ) -> Result<BatchReport, DispatcherError> {
        self.run_until(request, reporter, future::pending()).await
    }

    /// [`run`](Self::run), cancelled early when `shutdown` completes
    ///
    /// An interrupted batch still reports: the summary carries the counts
    /// reached so far and is the last line emitted.
    #[instrument(
        name = "broadcast_batch",
        skip(self, request, reporter, shutdown),
        fields(
            source = self.source.name(),
            concurrency = request.concurrency_bound,
            deadline_secs = request.deadline.as_secs()
        )
    )]
    pub async fn run_until<F>(
        &self,
        request: &BatchRequest,
        reporter: Arc<dyn Reporter>,
        shutdown: F,
    ) -> Result<BatchReport, DispatcherError>
    where
        F: Future<Output = ()>,
    {
        if request.payload.is_empty() {
            reporter.emit_usage(USAGE_MISSING_TEXT);
            record_batch_rejected("usage");
            return Err(DispatcherError::usage(USAGE_MISSING_TEXT));
        }
        if request.concurrency_bound == 0 {
            record_batch_rejected("invalid_request");
            return Err(DispatcherError::invalid_request(
                "concurrency_bound",
                "must be at least 1",
            ));
        }

        let _admitted = self.admit().await?;
        Ok(self.execute(request, reporter, shutdown).await)
    }

    async fn admit(&self) -> Result<MutexGuard<'_, ()>, DispatcherError> {
        match self.config.admission {
            AdmissionPolicy::Queue => {
                if self.state() != BatchState::Idle {
                    debug!("Batch active, waiting for admission");
                }
                Ok(self.gate.lock().await)
            }
            AdmissionPolicy::Reject => self.gate.try_lock().map_err(|_| {
                warn!("Batch already running, rejecting trigger");
                record_batch_rejected("in_progress");
                DispatcherError::BatchInProgress
            }),
        }
    }

    async fn execute<F>(
        &self,
        request: &BatchRequest,
        reporter: Arc<dyn Reporter>,
        shutdown: F,
    ) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        self.state.set(BatchState::Running);

        let bound = request.concurrency_bound;
        let (tx, rx) = async_channel::bounded(self.config.queue_capacity_for(bound));
        let engine = Arc::new(
            DispatchEngine::new(self.gateway.clone(), self.counters.clone(), reporter.clone())
                .with_progress_every(self.config.progress_every),
        );
        let payload: Arc<str> = Arc::from(request.payload.as_str());

        let mut workers = JoinSet::new();
        for worker in 0..bound {
            let rx = rx.clone();
            let engine = engine.clone();
            let payload = payload.clone();
            workers.spawn(async move {
                while let Ok(destination) = rx.recv().await {
                    engine.run_unit(&destination, &payload).await;
                }
                debug!(worker, "Worker drained");
            });
        }
        // only workers hold receivers, so a dead pool closes the queue
        drop(rx);
        debug!(workers = bound, "Worker pool started");

        let pump = async {
            self.feed(&tx).await;
            tx.close();
            self.state.set(BatchState::Draining);

            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    self.worker_lost(e);
                }
            }
        };

        let deadline = start
            .checked_add(request.deadline)
            .unwrap_or_else(|| start + MAX_DEADLINE);
        let end = tokio::select! {
            drained = timeout_at(deadline, pump) => match drained {
                Ok(()) => BatchEnd::Drained,
                Err(_) => BatchEnd::DeadlineExpired,
            },
            () = shutdown => BatchEnd::Interrupted,
        };

        if end != BatchEnd::Drained {
            tx.close();
            workers.shutdown().await;
        }
        match end {
            BatchEnd::Drained => {}
            BatchEnd::DeadlineExpired => warn!(
                deadline_secs = request.deadline.as_secs(),
                "Global deadline reached, remaining units cancelled"
            ),
            BatchEnd::Interrupted => warn!("Shutdown requested, remaining units cancelled"),
        }

        self.finish(start, end, reporter.as_ref())
    }

    /// Push every valid destination as it is discovered
    async fn feed(&self, tx: &Sender<DestinationId>) {
        let mut valid =
            match list_valid_destinations(self.source.as_ref(), self.gateway.as_ref()).await {
                Ok(valid) => valid,
                Err(e) => {
                    record_enumeration_error();
                    error!(source = self.source.name(), error = %e, "Destination enumeration failed");
                    return;
                }
            };

        while let Some(destination) = valid.next().await {
            if tx.send(destination).await.is_err() {
                warn!("Worker pool gone, stopping feed");
                break;
            }
            self.counters.record_submitted();
        }

        debug!(
            excluded = valid.excluded(),
            lookup_errors = valid.lookup_errors(),
            "Feed complete"
        );
    }

    fn worker_lost(&self, e: JoinError) {
        if e.is_panic() {
            self.counters.record_failure();
            error!(error = %e, "Worker panicked outside a delivery unit");
        } else {
            debug!(error = %e, "Worker cancelled");
        }
    }

    fn finish(&self, start: Instant, end: BatchEnd, reporter: &dyn Reporter) -> BatchReport {
        let elapsed = start.elapsed();
        let counts = self.counters.take();
        self.state.set(BatchState::Reported);

        let report = BatchReport {
            succeeded: counts.succeeded,
            failed: counts.failed,
            elapsed,
            submitted: counts.submitted,
            skipped: counts.skipped,
            deadline_expired: end == BatchEnd::DeadlineExpired,
            interrupted: end == BatchEnd::Interrupted,
        };

        reporter.emit_summary(&report);
        record_batch_report(&report);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            submitted = report.submitted,
            skipped = report.skipped,
            elapsed_secs = elapsed.as_secs_f64(),
            deadline_expired = report.deadline_expired,
            interrupted = report.interrupted,
            "Broadcast batch reported"
        );

        self.state.set(BatchState::Idle);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::MemoryReporter;
    use crate::source::{DirectorySource, StaticSource};
    use contracts::ReportLine;
    use gateway::{MockConfig, MockGateway};

    fn coordinator(
        ids: StaticSource,
        config: MockConfig,
        coordinator_config: CoordinatorConfig,
    ) -> (BatchCoordinator<StaticSource, MockGateway>, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::with_config(config));
        let coordinator =
            BatchCoordinator::new(Arc::new(ids), gateway.clone(), coordinator_config);
        (coordinator, gateway)
    }

    fn ids(names: &[&str]) -> StaticSource {
        StaticSource::new(names.iter().copied())
    }

    #[tokio::test]
    async fn test_mixed_batch_counts() {
        let names = ["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7", "d8", "d9"];
        let (coordinator, gateway) = coordinator(
            ids(&names),
            MockConfig::default()
                .with_fail_delivery(["d1", "d4", "d7"])
                .with_missing(["d2", "d8"]),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());

        let report = coordinator
            .run(&BatchRequest::new("hello").with_concurrency(3), reporter.clone())
            .await
            .unwrap();

        assert_eq!((report.succeeded, report.failed), (5, 3));
        assert_eq!(report.submitted, 8);
        assert!(!report.deadline_expired);
        assert_eq!(gateway.delivered().len(), 5);

        let mut failures = reporter.failures();
        failures.sort();
        assert_eq!(failures, vec!["d1".into(), "d4".into(), DestinationId::from("d7")]);
        assert!(matches!(reporter.lines().last(), Some(ReportLine::Summary(_))));
        assert_eq!(coordinator.state(), BatchState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bound_is_respected() {
        let (coordinator, gateway) = coordinator(
            StaticSource::numbered("conv", 40),
            MockConfig::default().with_latency(Duration::from_millis(10)),
            CoordinatorConfig::default(),
        );

        let report = coordinator
            .run(
                &BatchRequest::new("hi").with_concurrency(4),
                Arc::new(MemoryReporter::new()),
            )
            .await
            .unwrap();

        assert_eq!(report.succeeded, 40);
        assert!(gateway.peak_in_flight() <= 4);
        assert!(gateway.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_counters_reset_between_batches() {
        let (coordinator, _gateway) = coordinator(
            ids(&["a", "b", "c"]),
            MockConfig::default().with_fail_delivery(["b"]),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());
        let request = BatchRequest::new("hi");

        let first = coordinator.run(&request, reporter.clone()).await.unwrap();
        assert!(coordinator.counters().is_zero());
        let second = coordinator.run(&request, reporter.clone()).await.unwrap();

        assert_eq!((first.succeeded, first.failed), (2, 1));
        assert_eq!((second.succeeded, second.failed), (2, 1));
        assert_eq!(reporter.summaries().len(), 2);
    }

    #[tokio::test]
    async fn test_deadline_cancels_outstanding_units() {
        let (coordinator, gateway) = coordinator(
            ids(&["stuck", "a", "b", "c", "d"]),
            MockConfig::default().with_hang(["stuck"]),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());
        let request = BatchRequest::new("hi")
            .with_concurrency(2)
            .with_deadline(Duration::from_millis(200));

        let report = coordinator.run(&request, reporter.clone()).await.unwrap();

        assert!(report.deadline_expired);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 0);
        assert_eq!(gateway.in_flight(), 0);
        assert!(coordinator.counters().is_zero());
        assert!(matches!(
            reporter.lines().last(),
            Some(ReportLine::Summary(summary)) if summary.deadline_expired
        ));
    }

    #[tokio::test]
    async fn test_reject_admission_while_running() {
        let (coordinator, _gateway) = coordinator(
            ids(&["stuck"]),
            MockConfig::default().with_hang(["stuck"]),
            CoordinatorConfig {
                admission: AdmissionPolicy::Reject,
                ..Default::default()
            },
        );
        let reporter = Arc::new(MemoryReporter::new());
        let slow = BatchRequest::new("hi").with_deadline(Duration::from_millis(300));

        let (first, second, observed) = tokio::join!(
            coordinator.run(&slow, reporter.clone()),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                coordinator.run(&BatchRequest::new("again"), reporter.clone()).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                coordinator.state()
            }
        );

        assert!(first.unwrap().deadline_expired);
        assert!(matches!(second, Err(DispatcherError::BatchInProgress)));
        assert_ne!(observed, BatchState::Idle);
        assert_eq!(reporter.summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_queue_admission_serializes_batches() {
        let (coordinator, gateway) = coordinator(
            ids(&["a", "b"]),
            MockConfig::default().with_latency(Duration::from_millis(20)),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());
        let request = BatchRequest::new("hi");

        let (first, second) = tokio::join!(
            coordinator.run(&request, reporter.clone()),
            coordinator.run(&request, reporter.clone())
        );

        assert_eq!(first.unwrap().succeeded, 2);
        assert_eq!(second.unwrap().succeeded, 2);
        assert_eq!(gateway.delivered().len(), 4);
        assert_eq!(reporter.summaries().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_payload_is_usage_error() {
        let (coordinator, gateway) =
            coordinator(ids(&["a"]), MockConfig::default(), CoordinatorConfig::default());
        let reporter = Arc::new(MemoryReporter::new());

        let result = coordinator.run(&BatchRequest::new(""), reporter.clone()).await;

        assert!(matches!(result, Err(DispatcherError::Usage { .. })));
        assert_eq!(reporter.rendered(), vec![USAGE_MISSING_TEXT.to_string()]);
        assert_eq!(gateway.resolve_calls(), 0);
        assert!(coordinator.counters().is_zero());
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_invalid() {
        let (coordinator, _gateway) =
            coordinator(ids(&["a"]), MockConfig::default(), CoordinatorConfig::default());

        let result = coordinator
            .run(
                &BatchRequest::new("hi").with_concurrency(0),
                Arc::new(MemoryReporter::new()),
            )
            .await;

        assert!(matches!(result, Err(DispatcherError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn test_unreadable_store_reports_empty_batch() {
        let coordinator = BatchCoordinator::new(
            Arc::new(DirectorySource::new("/nonexistent/fanout/store")),
            Arc::new(MockGateway::new()),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());

        let report = coordinator
            .run(&BatchRequest::new("hi"), reporter.clone())
            .await
            .unwrap();

        assert_eq!(report.submitted, 0);
        assert_eq!(reporter.summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_unit_counts_as_named_failure() {
        let (coordinator, gateway) = coordinator(
            ids(&["a", "boom", "c", "d"]),
            MockConfig::default().with_panic(["boom"]),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());

        let report = coordinator
            .run(&BatchRequest::new("hi").with_concurrency(2), reporter.clone())
            .await
            .unwrap();

        assert_eq!((report.succeeded, report.failed), (3, 1));
        assert_eq!(reporter.failures(), vec![DestinationId::from("boom")]);
        assert_eq!(gateway.delivered().len(), 3);
    }

    #[tokio::test]
    async fn test_panicking_unit_does_not_stop_siblings() {
        let (coordinator, gateway) = coordinator(
            ids(&["boom", "a", "b", "c", "d", "e"]),
            MockConfig::default().with_panic(["boom"]),
            CoordinatorConfig {
                queue_capacity: 1,
                ..Default::default()
            },
        );
        let reporter = Arc::new(MemoryReporter::new());

        let report = coordinator
            .run(&BatchRequest::new("hi").with_concurrency(1), reporter.clone())
            .await
            .unwrap();

        assert_eq!((report.succeeded, report.failed), (5, 1));
        assert_eq!(report.submitted, 6);
        assert_eq!(reporter.failures(), vec![DestinationId::from("boom")]);
        assert_eq!(
            gateway.delivered(),
            vec!["a".into(), "b".into(), "c".into(), "d".into(), DestinationId::from("e")]
        );
        assert!(matches!(reporter.lines().last(), Some(ReportLine::Summary(_))));
    }

    #[tokio::test]
    async fn test_shutdown_reports_partial_summary() {
        let (coordinator, gateway) = coordinator(
            ids(&["a", "b", "stuck", "c"]),
            MockConfig::default().with_hang(["stuck"]),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());

        let report = coordinator
            .run_until(
                &BatchRequest::new("hi").with_concurrency(1),
                reporter.clone(),
                tokio::time::sleep(Duration::from_millis(100)),
            )
            .await
            .unwrap();

        assert!(report.interrupted);
        assert!(!report.deadline_expired);
        assert_eq!((report.succeeded, report.failed), (2, 0));
        assert_eq!(gateway.in_flight(), 0);
        assert_eq!(coordinator.state(), BatchState::Idle);
        assert!(coordinator.counters().is_zero());
        assert!(matches!(
            reporter.lines().last(),
            Some(ReportLine::Summary(summary)) if summary.interrupted
        ));
        assert!(reporter
            .rendered()
            .last()
            .unwrap()
            .starts_with("Processed: 2/0 convs in "));
    }

    #[test]
    fn test_queue_capacity_defaults_to_twice_bound() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.queue_capacity_for(20), 40);

        let fixed = CoordinatorConfig {
            queue_capacity: 7,
            ..Default::default()
        };
        assert_eq!(fixed.queue_capacity_for(20), 7);
    }
}
