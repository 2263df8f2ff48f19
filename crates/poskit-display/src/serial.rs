//! Serial port display driver.
//!
//! Talks to ESC/POS compatible pole displays over RS-232 or USB-serial
//! adapters. The `serialport` API is blocking, so every port access runs on
//! tokio's blocking pool.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use poskit_core::DisplayConfig;
use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::commands;
use crate::error::{DisplayError, Result};
use crate::traits::DisplayDriver;

/// Per-call timeout of the underlying port.
const PORT_TIMEOUT: Duration = Duration::from_millis(500);

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Display attached to a serial port.
#[derive(Default)]
pub struct SerialDisplay {
    port: Option<SharedPort>,
    name: Option<String>,
}

impl std::fmt::Debug for SerialDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDisplay")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the serial ports present on this machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the ports cannot be enumerated.
    pub fn available_ports() -> Result<Vec<String>> {
        let ports = serialport::available_ports()
            .map_err(|e| DisplayError::device(format!("failed to list serial ports: {e}")))?;
        Ok(ports.into_iter().map(|port| port.port_name).collect())
    }
}

async fn write_blocking(port: SharedPort, bytes: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let mut port = port.lock().unwrap_or_else(|e| e.into_inner());
        port.write_all(&bytes)?;
        port.flush()
    })
    .await
    .map_err(|e| DisplayError::device(format!("serial write task failed: {e}")))??;
    Ok(())
}

impl DisplayDriver for SerialDisplay {
    async fn open(&mut self, port: &str, config: &DisplayConfig) -> Result<()> {
        if self.port.is_some() {
            self.close().await?;
        }

        info!(port, baud_rate = config.baud_rate, "Opening serial display");

        let name = port.to_string();
        let baud_rate = config.baud_rate;
        let opened = tokio::task::spawn_blocking(move || {
            serialport::new(&name, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None)
                .timeout(PORT_TIMEOUT)
                .open()
        })
        .await
        .map_err(|e| DisplayError::open_failed(port, e.to_string()))?
        .map_err(|e| DisplayError::open_failed(port, e.to_string()))?;

        let shared: SharedPort = Arc::new(Mutex::new(opened));
        write_blocking(Arc::clone(&shared), commands::encode_init().to_vec())
            .await
            .map_err(|e| DisplayError::open_failed(port, e.to_string()))?;

        self.port = Some(shared);
        self.name = Some(port.to_string());
        debug!(port, "Serial display initialized");
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(port) = &self.port else {
            return Err(DisplayError::device("serial port is not open"));
        };
        write_blocking(Arc::clone(port), bytes.to_vec()).await
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            match self.name.take() {
                Some(name) => info!(port = %name, "Serial display closed"),
                None => warn!("Serial display closed without a port name"),
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_when_closed() {
        let mut display = SerialDisplay::new();
        assert!(!display.is_open());
        assert!(matches!(
            display.write(&[0x0C]).await,
            Err(DisplayError::Device { .. })
        ));
        display.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        let mut display = SerialDisplay::new();
        let result = display
            .open("/dev/poskit-does-not-exist", &DisplayConfig::default())
            .await;
        assert!(matches!(result, Err(DisplayError::OpenFailed { .. })));
        assert!(!display.is_open());
    }
}
