//! Byte transports below the AT layer.
//!
//! The engine only needs two things from a transport: "write these raw
//! bytes" and "deliver raw bytes as they arrive". Framing above that (lines,
//! result codes, edit-mode prompts) is entirely the engine's business.
//!
//! [`ChannelTransport`] is an in-process loopback over tokio channels, used
//! by the integration tests and by harnesses that script a fake phone. The
//! [`serial`] submodule (behind the `serial` feature) wraps a real
//! `serialport` device.

use std::io;

use tokio::sync::mpsc;

#[cfg(feature = "serial")]
pub mod serial;

/// Raw byte transport contract consumed by the engine.
///
/// Implementations do not interpret the bytes; `read_chunk` resolves with
/// whatever the device produced next, in arrival order.
#[allow(async_fn_in_trait)]
pub trait AtTransport {
    /// Write `data` verbatim to the device.
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Wait for the next burst of bytes from the device.
    async fn read_chunk(&mut self) -> io::Result<Vec<u8>>;
}

/// In-process loopback transport: one half of a connected pair.
///
/// Everything written to one half arrives at the other's `read_chunk`.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Create a connected pair. By convention the first half goes to the
    /// engine and the second to the scripted device.
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            ChannelTransport { tx: a_tx, rx: b_rx },
            ChannelTransport { tx: b_tx, rx: a_rx },
        )
    }
}

impl AtTransport for ChannelTransport {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.tx
            .send(data.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }

    async fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed"))
    }
}
