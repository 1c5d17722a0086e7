//! Batched delivery of log records to a remote collector.
//!
//! Records enqueue into an in-memory buffer and leave in batches, either
//! when the buffer reaches the configured batch size or when the recurring
//! flush timer fires:
//!
//! ```text
//!   Logger
//!      │ enqueue
//!      v
//!   ┌──────────────┐
//!   │ Batch Buffer │  (FIFO, capped on reinsertion)
//!   └──────┬───────┘
//!          │ batch-size threshold or timer
//!          v
//!   ┌──────────────┐
//!   │  Transport   │  (JSON array, optional gzip, one POST)
//!   └──────┬───────┘
//!          │ failure
//!          v
//!   ┌──────────────┐     ┌───────────────┐
//!   │   Backoff    │     │ Durable Queue │  (reliable mode, JSON lines)
//!   └──────────────┘     └───────────────┘
//! ```
//!
//! On failure the batch either returns to the front of the buffer or, in
//! reliable mode, is appended to a disk-backed queue that survives restarts;
//! either way the timer is suspended for an exponentially growing, jittered
//! delay. Persisted records are only re-attempted when the caller explicitly
//! drains the queue.
//!
//! Nothing in this pipeline ever reports an error to the logging caller:
//! failures are visible only through the growing fail count, the growing
//! queue file, and records dropped past the buffer cap.

pub mod backoff;
pub mod buffer;
pub mod queue;
pub mod service;
pub mod transport;

pub use service::{RemoteHandle, RemoteService};
