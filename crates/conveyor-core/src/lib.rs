//! conveyor-core
//!
//! At-least-once task pipeline: a submission gate with dedup, a worker pool
//! with exponential backoff, and a dead-letter monitor, all written against
//! pluggable store/transport ports.
//!
//! Module map:
//! - **domain**: task records, queue messages, the backoff policy, audits
//! - **ports**: `RecordStore`, `TaskQueue`, `TaskProcessor` capability traits
//! - **impls**: in-memory implementations for development and tests
//! - **gate / worker / monitor**: the three pipeline roles
//!
//! The state machine per task id:
//!
//! ```text
//! [absent] --submit--> [pending, retry_count=0]
//! [pending, r] --success--> [absent]
//! [pending, r] --fail, r+1<=max--> [pending, r+1]   (re-enqueued with backoff)
//! [pending, r] --fail, r+1>max--> [exhausted]       (nacked; record retained)
//! [exhausted] --monitor--> [absent]                 (record deleted, audit emitted)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod impls;
pub mod monitor;
pub mod observability;
pub mod ports;
pub mod worker;

pub use config::PipelineConfig;
pub use error::PipelineError;
