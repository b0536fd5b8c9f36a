//! Serial port transport for cable or IrDA-adapter connections.

use std::io;
use std::io::Read;

use anyhow::{anyhow, Result};
use log::{debug, info, trace};
use serialport::SerialPort;
use tokio::time::{sleep, Duration};

use crate::logutil::hex_snippet;
use crate::transport::AtTransport;

/// How long to park between polls when the device is quiet.
const POLL_INTERVAL_MS: u64 = 10;

/// A `serialport`-backed [`AtTransport`].
pub struct SerialTransport {
    port_name: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `port_name` at `baud_rate` and prepare it for AT traffic.
    pub async fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        info!("Opening {} at {} baud", port_name, baud_rate);
        let mut builder = serialport::new(port_name, baud_rate).timeout(Duration::from_millis(500));
        // Some USB serial adapters need explicit settings
        #[cfg(unix)]
        {
            builder = builder
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None);
        }
        let mut port = builder
            .open()
            .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;
        let _ = port.write_data_terminal_ready(true);
        let _ = port.write_request_to_send(true);
        // Small settle delay, then drop whatever the phone buffered before we
        // attached: stale unsolicited lines would desynchronize the parser.
        sleep(Duration::from_millis(150)).await;
        let mut purge_buf = [0u8; 512];
        if let Ok(available) = port.bytes_to_read() {
            if available > 0 {
                let _ = port.read(&mut purge_buf);
                debug!("Purged {} stale bytes from {}", available, port_name);
            }
        }
        Ok(SerialTransport {
            port_name: port_name.to_string(),
            port,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl AtTransport for SerialTransport {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        trace!("serial tx {} bytes: {}", data.len(), hex_snippet(data, 64));
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        let mut buffer = [0u8; 1024];
        loop {
            let available = self.port.bytes_to_read().map(|n| n as usize).unwrap_or(0);
            if available == 0 {
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                continue;
            }
            match self.port.read(&mut buffer) {
                Ok(n) if n > 0 => {
                    trace!("serial rx {} bytes: {}", n, hex_snippet(&buffer[..n], 64));
                    return Ok(buffer[..n].to_vec());
                }
                Ok(_) => sleep(Duration::from_millis(POLL_INTERVAL_MS)).await,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
