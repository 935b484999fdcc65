//! # Dispatcher
//!
//! Broadcast fan-out core.
//!
//! Responsibilities:
//! - Enumerate destinations and filter out those without a usable session
//! - Deliver one payload per destination on a bounded worker pool
//! - Isolate each delivery so one failure never aborts the batch
//! - Aggregate success/failure counts and report them once per batch

pub mod coordinator;
pub mod counters;
pub mod engine;
pub mod error;
pub mod reporters;
pub mod source;
pub mod task;

pub use contracts::{BatchReport, BatchRequest, DeliveryOutcome, DestinationId, Reporter};
pub use coordinator::{BatchCoordinator, BatchState, CoordinatorConfig, USAGE_MISSING_TEXT};
pub use counters::{AggregateCounters, CountersSnapshot};
pub use engine::DispatchEngine;
pub use error::DispatcherError;
pub use reporters::{LogReporter, MemoryReporter, TeeReporter, WriterReporter};
pub use source::{list_valid_destinations, DirectorySource, StaticSource, ValidDestinations};
pub use task::{BroadcastTask, TaskParams, USAGE_INVALID_TH};
