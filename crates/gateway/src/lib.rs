//! # Gateway
//!
//! Sender gateway implementations.
//!
//! Responsibilities:
//! - Resolve a destination id into a sender handle (session lookup)
//! - Report whether the destination has recipients
//! - Transmit the payload
//!
//! `FileGateway` keeps sessions and outboxes on disk, `MockGateway` injects
//! failures and latency for tests.

mod file_gateway;
mod mock_gateway;

pub use contracts::SenderGateway;
pub use file_gateway::{FileGateway, FileSender, OutboxEntry, Session, OUTBOX_FILE, SESSION_FILE};
pub use mock_gateway::{MockConfig, MockGateway, MockSender};
