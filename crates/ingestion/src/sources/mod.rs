//! Frame source implementations.
//!
//! Live pipelines receive frames over UDP; offline and test pipelines use
//! the deterministic generator. Both implement `contracts::FrameSource`, so
//! the capture worker is oblivious to the transport.

mod generator;
mod udp;

pub use generator::GeneratorSource;
pub use udp::UdpFrameSource;
