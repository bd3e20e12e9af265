//! WorkerLink trait - compute-worker output interface.
//!
//! A link is an ordered byte stream toward one compute worker. The
//! dispatcher writes, in sequence, a begin-work command, a metadata batch
//! and a sample payload per subband; the link only moves bytes.

use crate::ContractError;

/// Ordered byte stream toward one compute worker.
pub trait WorkerLink: Send {
    /// Link description (used for logging/metrics).
    fn descriptor(&self) -> &str;

    /// Append bytes to the stream.
    ///
    /// # Errors
    /// Returns a transport error; the caller decides retry/skip/fatal policy.
    fn send(&mut self, data: &[u8]) -> Result<(), ContractError>;

    /// Flush buffered bytes to the transport.
    fn flush(&mut self) -> Result<(), ContractError>;
}
