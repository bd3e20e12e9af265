//! # Dispatcher
//!
//! Maps subbands onto a round-robin sequence of compute-worker links grouped
//! by processing set and streams, per subband: a begin-work command, a
//! batched metadata message and the sample payload. Runs inline on the
//! coordinator thread; the links are exclusively owned, so no pooling or
//! locking exists here.

mod dispatcher;
mod error;
pub mod links;
mod metrics;
pub mod wire;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::DispatcherError;
pub use metrics::{LinkMetrics, LinkSnapshot};
