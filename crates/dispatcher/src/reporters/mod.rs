//! Reporter implementations
//!
//! Contains WriterReporter, LogReporter, MemoryReporter and TeeReporter.

mod log;
mod memory;
mod tee;
mod writer;

pub use self::log::LogReporter;
pub use self::memory::MemoryReporter;
pub use self::tee::TeeReporter;
pub use self::writer::WriterReporter;
