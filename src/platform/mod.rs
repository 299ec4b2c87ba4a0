//! Platform abstraction layer
//!
//! Handles the outside world for the score subsystem:
//! - Wall-clock time (injectable for tests)
//! - Durable key/value storage (directory of JSON files, or in memory)

pub mod storage;
pub mod time;

pub use storage::{FileBackend, MemoryBackend, StorageBackend};
pub use time::{Clock, ManualClock, SystemClock};
