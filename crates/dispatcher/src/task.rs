//! BroadcastTask - administrative trigger over string parameters
//!
//! Parameters arrive as a multimap of strings (query string, CLI flags, admin
//! form). Only the first value of each key is used.

use std::collections::HashMap;
use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use contracts::{BatchReport, BatchRequest, DestinationSource, Reporter, SenderGateway};
use observability::record_batch_rejected;
use tracing::{debug, instrument};

use crate::coordinator::{BatchCoordinator, USAGE_MISSING_TEXT};
use crate::error::DispatcherError;

/// Usage message for an unusable `th` parameter
pub const USAGE_INVALID_TH: &str = "invalid th param";

/// Name the task is registered under
pub const TASK_NAME: &str = "broadcast";

/// Payload parameter
pub const PARAM_TEXT: &str = "text";

/// Concurrency bound parameter
pub const PARAM_TH: &str = "th";

/// String multimap of task parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskParams {
    values: HashMap<String, Vec<String>>,
}

impl TaskParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value for `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    /// First value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of `key`
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Broadcast the `text` parameter to every valid destination
pub struct BroadcastTask<S, G> {
    coordinator: Arc<BatchCoordinator<S, G>>,
    default_concurrency: usize,
    deadline: Duration,
}

impl<S, G> BroadcastTask<S, G>
where
    S: DestinationSource + Send + Sync + 'static,
    G: SenderGateway + 'static,
{
    pub fn new(
        coordinator: Arc<BatchCoordinator<S, G>>,
        default_concurrency: usize,
        deadline: Duration,
    ) -> Self {
        Self {
            coordinator,
            default_concurrency,
            deadline,
        }
    }

    pub fn name(&self) -> &'static str {
        TASK_NAME
    }

    pub fn coordinator(&self) -> &Arc<BatchCoordinator<S, G>> {
        &self.coordinator
    }

    /// Turn parameters into a request, reporting usage problems
    ///
    /// # Errors
    /// `Usage` when `text` is missing or empty, or `th` is not a positive integer
    pub fn request(
        &self,
        params: &TaskParams,
        reporter: &dyn Reporter,
    ) -> Result<BatchRequest, DispatcherError> {
        let text = match params.get(PARAM_TEXT) {
            Some(text) if !text.is_empty() => text,
            _ => return Err(Self::usage(reporter, USAGE_MISSING_TEXT)),
        };

        let concurrency = match params.get(PARAM_TH) {
            None => self.default_concurrency,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(th) if th > 0 => th,
                _ => return Err(Self::usage(reporter, USAGE_INVALID_TH)),
            },
        };

        Ok(BatchRequest::new(text)
            .with_concurrency(concurrency)
            .with_deadline(self.deadline))
    }

    /// Validate parameters and run the batch
    ///
    /// # Errors
    /// Usage errors from [`request`](Self::request), plus whatever
    /// [`BatchCoordinator::run`] rejects
    pub async fn execute(
        &self,
        params: &TaskParams,
        reporter: Arc<dyn Reporter>,
    ) -> Result<BatchReport, DispatcherError> {
        self.execute_until(params, reporter, future::pending()).await
    }

    /// [`execute`](Self::execute) with a shutdown trigger, see
    /// [`BatchCoordinator::run_until`]
    #[instrument(name = "broadcast_task", skip_all)]
    pub async fn execute_until<F>(
        &self,
        params: &TaskParams,
        reporter: Arc<dyn Reporter>,
        shutdown: F,
    ) -> Result<BatchReport, DispatcherError>
    where
        F: Future<Output = ()>,
    {
        let request = self.request(params, reporter.as_ref())?;
        debug!(
            concurrency = request.concurrency_bound,
            payload_len = request.payload.len(),
            "Broadcast task accepted"
        );
        self.coordinator.run_until(&request, reporter, shutdown).await
    }

    fn usage(reporter: &dyn Reporter, message: &str) -> DispatcherError {
        reporter.emit_usage(message);
        record_batch_rejected("usage");
        DispatcherError::usage(message)
    }
}
