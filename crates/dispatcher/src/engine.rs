//! DispatchEngine - executes one delivery unit
//!
//! A unit resolves the sender for one destination, checks it has recipients
//! and hands over the payload. Every outcome lands in the shared counters;
//! no error ever leaves a unit, and a panicking gateway call is caught at the
//! unit boundary so the worker carries on with its next destination.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use contracts::{ContractError, DeliveryOutcome, DestinationId, Reporter, SenderGateway};
use futures::FutureExt;
use observability::{record_delivery, record_delivery_latency_ms};
use tracing::{debug, error, instrument};

use crate::counters::AggregateCounters;

/// Default stride between progress lines
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Per-destination delivery executor, shared by all workers of a batch
pub struct DispatchEngine<G> {
    gateway: Arc<G>,
    counters: Arc<AggregateCounters>,
    reporter: Arc<dyn Reporter>,
    progress_every: u64,
}

impl<G: SenderGateway> DispatchEngine<G> {
    pub fn new(
        gateway: Arc<G>,
        counters: Arc<AggregateCounters>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            gateway,
            counters,
            reporter,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    /// Emit a progress line every `every` successes (0 is treated as 1)
    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every.max(1);
        self
    }

    /// Counters this engine writes to
    pub fn counters(&self) -> &Arc<AggregateCounters> {
        &self.counters
    }

    /// Deliver `payload` to one destination
    ///
    /// The sender is resolved again here, since a session can go away between
    /// enumeration and delivery.
    #[instrument(name = "delivery_unit", skip(self, payload), fields(destination = %destination))]
    pub async fn run_unit(&self, destination: &DestinationId, payload: &str) -> DeliveryOutcome {
        let attempt = AssertUnwindSafe(self.attempt(destination, payload))
            .catch_unwind()
            .await;

        let outcome = match attempt {
            Ok(Ok(true)) => {
                let succeeded = self.counters.record_success();
                if succeeded % self.progress_every == 0 {
                    self.reporter.emit_progress(succeeded);
                }
                DeliveryOutcome::Delivered
            }
            Ok(Ok(false)) => {
                self.counters.record_skip();
                debug!("Skipped, no usable session or recipients");
                DeliveryOutcome::SkippedNoRecipients
            }
            Ok(Err(e)) => {
                error!(error = %e, "Delivery failed");
                self.fail(destination, e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(panic = %reason, "Delivery unit panicked");
                self.fail(destination, format!("panicked: {reason}"))
            }
        };

        record_delivery(&outcome);
        outcome
    }

    fn fail(&self, destination: &DestinationId, reason: String) -> DeliveryOutcome {
        self.counters.record_failure();
        self.reporter.emit_failure(destination);
        DeliveryOutcome::Failed(reason)
    }

    /// Ok(true) when delivered, Ok(false) when there was nobody to deliver to
    async fn attempt(&self, destination: &DestinationId, payload: &str) -> Result<bool, ContractError> {
        let Some(sender) = self.gateway.resolve(destination).await? else {
            return Ok(false);
        };
        if !self.gateway.has_recipients(&sender).await? {
            return Ok(false);
        }

        let start = Instant::now();
        self.gateway.deliver(&sender, payload).await?;
        record_delivery_latency_ms(start.elapsed().as_secs_f64() * 1000.0);
        Ok(true)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
