//! DestinationSource trait - destination directory abstraction
//!
//! Decouples the dispatcher from the backing store that knows which
//! destinations exist (a directory of session state, database rows, a remote
//! registry).

use crate::{ContractError, DestinationId};

/// Destination directory trait
///
/// Produces a one-shot snapshot of raw candidate ids. Validity filtering
/// against the gateway is done by the dispatcher, so sources stay pure
/// listings.
#[trait_variant::make(DestinationSource: Send)]
pub trait LocalDestinationSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Enumerate candidate destinations
    ///
    /// Ids in the returned snapshot are unique. Changes to the backing store
    /// after this call are not reflected.
    ///
    /// # Errors
    /// Returns an enumeration error when the store itself cannot be read
    async fn enumerate(&self) -> Result<Vec<DestinationId>, ContractError>;
}
