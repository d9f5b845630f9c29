//! Ports: the capability traits the pipeline core is written against.
//!
//! Implementations live in `impls` (in-memory, for development and tests)
//! or in adapter crates wrapping a real store/transport.

pub mod processor;
pub mod record_store;
pub mod task_queue;

pub use self::processor::{ProcessOutcome, TaskProcessor};
pub use self::record_store::{CreateOutcome, RecordStore};
pub use self::task_queue::{MAX_ENQUEUE_DELAY, TaskQueue};
