//! Mock gateway
//!
//! In-memory gateway for tests, with injectable failure scenarios and latency.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use contracts::{ContractError, DestinationId, SenderGateway};
use tracing::instrument;

/// Mock gateway configuration
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Ids that resolve to no session
    pub missing: HashSet<String>,
    /// Ids that resolve but have no recipients
    pub no_recipients: HashSet<String>,
    /// Ids whose session lookup errors
    pub fail_resolve: HashSet<String>,
    /// Ids whose delivery errors
    pub fail_delivery: HashSet<String>,
    /// Ids whose delivery never completes
    pub hang: HashSet<String>,
    /// Ids whose delivery panics while the ledger is locked
    pub panic: HashSet<String>,
    /// Latency applied to every delivery
    pub delivery_latency: Option<Duration>,
}

impl MockConfig {
    pub fn with_missing<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_no_recipients<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_recipients.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_fail_resolve<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail_resolve.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_fail_delivery<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail_delivery.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_hang<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hang.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_panic<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.panic.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.delivery_latency = Some(latency);
        self
    }
}

/// Sender handle produced by [`MockGateway`]
#[derive(Debug, Clone)]
pub struct MockSender {
    pub destination: DestinationId,
    pub recipients: usize,
}

/// Mock gateway
pub struct MockGateway {
    /// Configuration (failure scenarios)
    config: MockConfig,
    /// Successfully delivered destinations, in completion order
    delivered: Mutex<Vec<(DestinationId, String)>>,
    /// Resolve calls
    resolve_calls: AtomicU64,
    /// Deliveries currently executing
    in_flight: AtomicUsize,
    /// Highest simultaneous deliveries observed
    peak_in_flight: AtomicUsize,
}

impl MockGateway {
    /// Create a gateway where everything resolves and delivers
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a gateway with a failure configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            delivered: Mutex::new(Vec::new()),
            resolve_calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Destinations delivered so far
    pub fn delivered(&self) -> Vec<DestinationId> {
        self.ledger().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Payloads delivered so far
    pub fn payloads(&self) -> Vec<String> {
        self.ledger()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Number of resolve calls
    pub fn resolve_calls(&self) -> u64 {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Highest number of deliveries observed executing at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Deliveries executing right now
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// A panicked delivery leaves the ledger poisoned but intact
    fn ledger(&self) -> MutexGuard<'_, Vec<(DestinationId, String)>> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn transmit(&self, sender: &MockSender, payload: &str) -> Result<(), ContractError> {
        let id = sender.destination.as_str();

        if self.config.hang.contains(id) {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = self.config.delivery_latency {
            tokio::time::sleep(latency).await;
        }
        if self.config.fail_delivery.contains(id) {
            return Err(ContractError::delivery(id, "mock delivery failure"));
        }

        let mut ledger = self.ledger();
        if self.config.panic.contains(id) {
            panic!("mock gateway panicked delivering to {id}");
        }
        ledger.push((sender.destination.clone(), payload.to_string()));
        Ok(())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight gauge even when the delivery future is cancelled
struct InFlightGuard<'a>(&'a MockGateway);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.leave();
    }
}

impl SenderGateway for MockGateway {
    type Sender = MockSender;

    async fn resolve(
        &self,
        destination: &DestinationId,
    ) -> Result<Option<MockSender>, ContractError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let id = destination.as_str();

        if self.config.fail_resolve.contains(id) {
            return Err(ContractError::session_lookup(id, "mock session lookup failure"));
        }
        if self.config.missing.contains(id) {
            return Ok(None);
        }

        let recipients = if self.config.no_recipients.contains(id) {
            0
        } else {
            1
        };
        Ok(Some(MockSender {
            destination: destination.clone(),
            recipients,
        }))
    }

    async fn has_recipients(&self, sender: &MockSender) -> Result<bool, ContractError> {
        Ok(sender.recipients > 0)
    }

    #[instrument(
        name = "mock_gateway_deliver",
        skip(self, sender, payload),
        fields(destination = %sender.destination)
    )]
    async fn deliver(&self, sender: &MockSender, payload: &str) -> Result<(), ContractError> {
        self.enter();
        let _guard = InFlightGuard(self);
        self.transmit(sender, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_resolution_scenarios() {
        let gateway = MockGateway::with_config(
            MockConfig::default()
                .with_missing(["gone"])
                .with_no_recipients(["empty"])
                .with_fail_resolve(["broken"]),
        );

        assert!(gateway.resolve(&"gone".into()).await.unwrap().is_none());
        assert!(gateway.resolve(&"broken".into()).await.is_err());

        let empty = gateway.resolve(&"empty".into()).await.unwrap().unwrap();
        assert!(!gateway.has_recipients(&empty).await.unwrap());

        let ok = gateway.resolve(&"ok".into()).await.unwrap().unwrap();
        assert!(gateway.has_recipients(&ok).await.unwrap());
        assert_eq!(gateway.resolve_calls(), 4);
    }

    #[tokio::test]
    async fn test_delivery_failure_not_recorded() {
        let gateway = MockGateway::with_config(MockConfig::default().with_fail_delivery(["bad"]));
        let bad = gateway.resolve(&"bad".into()).await.unwrap().unwrap();
        let good = gateway.resolve(&"good".into()).await.unwrap().unwrap();

        assert!(gateway.deliver(&bad, "hi").await.is_err());
        gateway.deliver(&good, "hi").await.unwrap();

        assert_eq!(gateway.delivered(), vec![DestinationId::from("good")]);
        assert_eq!(gateway.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_delivery_releases_in_flight() {
        let gateway = MockGateway::with_config(MockConfig::default().with_hang(["stuck"]));
        let stuck = gateway.resolve(&"stuck".into()).await.unwrap().unwrap();

        let result =
            tokio::time::timeout(Duration::from_millis(20), gateway.deliver(&stuck, "hi")).await;
        assert!(result.is_err());
        assert_eq!(gateway.in_flight(), 0);
        assert_eq!(gateway.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_panicked_delivery_keeps_ledger_usable() {
        let gateway = Arc::new(MockGateway::with_config(
            MockConfig::default().with_panic(["boom"]),
        ));
        let boom = gateway.resolve(&"boom".into()).await.unwrap().unwrap();
        let good = gateway.resolve(&"good".into()).await.unwrap().unwrap();

        let panicked = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.deliver(&boom, "hi").await }
        })
        .await;
        assert!(panicked.unwrap_err().is_panic());
        assert!(gateway.delivered.is_poisoned());

        gateway.deliver(&good, "hi").await.unwrap();
        assert_eq!(gateway.delivered(), vec![DestinationId::from("good")]);
        assert_eq!(gateway.payloads(), vec!["hi".to_string()]);
        assert_eq!(gateway.in_flight(), 0);
    }
}
