//! RecordingLink - in-memory worker link for tests and dry runs.

use std::sync::{Arc, Mutex};

use contracts::{ContractError, WorkerLink};

/// Worker link that appends every write into a shared byte buffer.
pub struct RecordingLink {
    descriptor: String,
    buffer: Arc<Mutex<Vec<u8>>>,
}

/// Reader side of a `RecordingLink`.
#[derive(Clone)]
pub struct RecordingHandle {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl RecordingLink {
    /// Create a link plus the handle used to inspect its stream.
    pub fn new(name: &str) -> (Self, RecordingHandle) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                descriptor: format!("{name} (record)"),
                buffer: Arc::clone(&buffer),
            },
            RecordingHandle { buffer },
        )
    }
}

impl RecordingHandle {
    /// Copy of everything written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.lock().expect("recording mutex poisoned").clone()
    }

    /// Drain the recorded stream.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock().expect("recording mutex poisoned"))
    }
}

impl WorkerLink for RecordingLink {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn send(&mut self, data: &[u8]) -> Result<(), ContractError> {
        self.buffer
            .lock()
            .expect("recording mutex poisoned")
            .extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
