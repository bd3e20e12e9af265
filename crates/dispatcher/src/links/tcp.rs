//! TcpWorkerLink - buffered TCP stream toward one compute worker.

use std::io::{BufWriter, Write};
use std::net::TcpStream;

use tracing::debug;

use contracts::{ContractError, WorkerLink};

/// Worker link over a connected TCP stream.
pub struct TcpWorkerLink {
    descriptor: String,
    writer: BufWriter<TcpStream>,
}

impl TcpWorkerLink {
    /// Connect to a worker at `addr`.
    pub fn connect(name: &str, addr: &str) -> Result<Self, ContractError> {
        let stream = TcpStream::connect(addr).map_err(|e| {
            ContractError::link_connection(name, format!("connect {addr}: {e}"))
        })?;
        stream
            .set_nodelay(true)
            .map_err(|e| ContractError::link_connection(name, e.to_string()))?;

        debug!(link = name, addr, "worker link connected");

        Ok(Self {
            descriptor: format!("{name} (tcp://{addr})"),
            writer: BufWriter::new(stream),
        })
    }
}

impl WorkerLink for TcpWorkerLink {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn send(&mut self, data: &[u8]) -> Result<(), ContractError> {
        self.writer
            .write_all(data)
            .map_err(|e| ContractError::link_write(&self.descriptor, e.to_string()))
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::link_write(&self.descriptor, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_send_reaches_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let reader = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).unwrap();
            buf
        });

        let mut link = TcpWorkerLink::connect("w0", &addr).unwrap();
        link.send(b"begin").unwrap();
        link.send(b"-work").unwrap();
        link.flush().unwrap();
        drop(link);

        assert_eq!(reader.join().unwrap(), b"begin-work");
    }

    #[test]
    fn test_connect_refused_is_connection_error() {
        // Port 1 is essentially never listening.
        let result = TcpWorkerLink::connect("w0", "127.0.0.1:1");
        assert!(matches!(
            result,
            Err(ContractError::LinkConnection { .. })
        ));
    }
}
