//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses an integral sample count (`SampleTime`, 64-bit signed) as primary clock
//! - The sample rate is process-wide, fixed at startup, and carried by `SampleClock`

mod blueprint;
mod delay;
mod error;
mod frame;
mod gaps;
mod link;
mod period;
mod sample;
mod sample_time;
mod source;
mod stream_id;

pub use blueprint::*;
pub use delay::*;
pub use error::*;
pub use frame::*;
pub use gaps::*;
pub use link::WorkerLink;
pub use period::*;
pub use sample::{Sample, SAMPLE_BYTES};
pub use sample_time::{SampleClock, SampleTime};
pub use source::{FrameSource, SourceError};
pub use stream_id::StreamId;
