//! FrameSource trait - network frame source abstraction.
//!
//! Decouples the capture worker from the concrete transport. UDP sockets and
//! the deterministic generator implement the same interface, so live and
//! offline pipelines share one capture path.

use thiserror::Error;

/// Frame source failure.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source will deliver no further frames (end of stream, reset peer).
    /// Fatal to the owning capture worker only.
    #[error("frame source closed: {reason}")]
    Closed { reason: String },

    /// Transport-level I/O failure. Fatal to the owning capture worker only.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking source of fixed-size frames.
///
/// `recv_frame` blocks for at most a short internal interval so the caller
/// can observe its stop flag between frame receptions:
/// - `Ok(Some(len))` - one frame of `len` bytes was written into `buf`
/// - `Ok(None)` - no frame arrived within the interval; poll again
/// - `Err(_)` - the source is dead; the worker terminates its loop
pub trait FrameSource: Send {
    /// Human-readable source description (for logging).
    fn descriptor(&self) -> &str;

    /// Receive one frame into `buf`.
    fn recv_frame(&mut self, buf: &mut [u8]) -> Result<Option<usize>, SourceError>;
}
