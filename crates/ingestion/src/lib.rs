//! # Ingestion
//!
//! The capture side of the pipeline: one `CaptureWorker` thread per physical
//! input stream, each appending decoded frames into its own `InputChannel`
//! (a fixed-capacity cyclic sample buffer with a retained history region).
//!
//! Concurrency model: each channel has exactly one writer (its capture
//! worker) and one reader (the ingest coordinator). All blocking points are
//! explicit `Mutex`/`Condvar` waits; shutdown wakes them via a shared stop
//! flag.

mod channel;
mod metrics;
mod realtime;
pub mod sources;
mod worker;

pub use channel::{AppendOutcome, ChannelConfig, InputChannel, ReadWindow};
pub use metrics::{CaptureMetrics, CaptureSnapshot};
pub use realtime::SchedulingPolicy;
pub use worker::CaptureWorker;
