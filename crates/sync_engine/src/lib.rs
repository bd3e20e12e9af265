//! # Sync Engine
//!
//! The periodic driver of the pipeline: once per integration period the
//! `IngestCoordinator` advances the delay state, opens a delay-corrected
//! read window against every input channel, assembles per-subband metadata
//! and drives the dispatcher. One iteration per period, one thread total;
//! missing data is carried as gap metadata, never as an error.
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::{CoordinatorConfig, DelayTracker, IngestCoordinator};
//!
//! let mut coordinator = IngestCoordinator::new(
//!     config, bindings, tracker, dispatcher, stop,
//! )?;
//!
//! coordinator.run(Some(100), |summary| {
//!     println!("period {} flagged {}", summary.period_index, summary.total_flagged());
//! })?;
//! ```

mod coordinator;
mod delay;
mod oracle;

pub use coordinator::{ChannelBinding, CoordinatorConfig, IngestCoordinator};
pub use delay::DelayTracker;
pub use oracle::{FixedDelayOracle, LinearDriftOracle};

// Re-export contracts types used at this crate's seams.
pub use contracts::{DelayOracle, DelaySample, DelaySign, DispatchFailurePolicy, PeriodSummary};
