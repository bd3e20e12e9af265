//! WorkerLink implementations.

mod record;
mod tcp;

pub use record::{RecordingHandle, RecordingLink};
pub use tcp::TcpWorkerLink;

use contracts::{LinkConfig, WorkerLink};

use crate::error::DispatcherError;

/// Build a link from its configuration.
///
/// The returned handle for recording links is discarded here; tests that
/// need to inspect the byte stream construct `RecordingLink` directly.
pub fn connect(name: &str, config: &LinkConfig) -> Result<Box<dyn WorkerLink>, DispatcherError> {
    match config {
        LinkConfig::Tcp { addr } => {
            let link = TcpWorkerLink::connect(name, addr)
                .map_err(|e| DispatcherError::link_creation(name, e.to_string()))?;
            Ok(Box::new(link))
        }
        LinkConfig::Record => {
            let (link, _handle) = RecordingLink::new(name);
            Ok(Box::new(link))
        }
    }
}
