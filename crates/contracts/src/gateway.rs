//! Sender gateway abstraction
//!
//! The messaging channel the dispatcher delivers through. Session storage,
//! serialization and transport all live behind this trait.

use std::future::Future;

use crate::{ContractError, DestinationId};

/// Sender gateway trait
///
/// Resolves a destination into a sender handle and transmits through it.
/// Implementations must be shareable across the worker pool.
pub trait SenderGateway: Send + Sync {
    /// Handle able to transmit to one destination
    type Sender: Send + Sync;

    /// Resolve a destination into a usable sender
    ///
    /// # Returns
    /// `Ok(None)` when the destination has no usable session (stale, expired,
    /// missing). `Err` only when the session exists but cannot be read.
    fn resolve(
        &self,
        destination: &DestinationId,
    ) -> impl Future<Output = Result<Option<Self::Sender>, ContractError>> + Send;

    /// Whether the sender has at least one active recipient
    fn has_recipients(
        &self,
        sender: &Self::Sender,
    ) -> impl Future<Output = Result<bool, ContractError>> + Send;

    /// Deliver the payload
    ///
    /// # Errors
    /// Returns a delivery error naming the destination
    fn deliver(
        &self,
        sender: &Self::Sender,
        payload: &str,
    ) -> impl Future<Output = Result<(), ContractError>> + Send;
}
