//! # Contracts
//!
//! Frozen interface contracts shared by every fanout crate: the data model of a
//! broadcast batch and the traits of its external collaborators.
//! Business crates only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Batch Model
//! - One payload, many independent destinations addressed by `DestinationId`
//! - Exactly one `DeliveryOutcome` per destination per batch
//! - A batch ends with exactly one `BatchReport`

mod config;
mod destination_id;
mod error;
mod gateway;
mod outcome;
mod reporter;
mod request;
mod source;

pub use config::*;
pub use destination_id::DestinationId;
pub use error::*;
pub use gateway::SenderGateway;
pub use outcome::*;
pub use reporter::Reporter;
pub use request::*;
pub use source::{DestinationSource, LocalDestinationSource};
