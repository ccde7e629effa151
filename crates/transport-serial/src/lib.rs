//! Native serial transport for the grid link.
//!
//! The `serialport` crate only offers blocking I/O, so reads run on a
//! dedicated thread that feeds a channel. Writes go through a cloned
//! handle owned by the bridge loop, which serializes them.

use core_types::{FlowControl, ParityMode, SerialConfig};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// How long a blocking read waits before returning, so the read thread can
/// notice a dropped receiver instead of parking forever.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Read buffer size. Grid messages are 3 bytes, so this holds a burst.
const CHUNK_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to clone serial handle: {0}")]
    Clone(#[source] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Events emitted by the serial read thread.
#[derive(Debug)]
pub enum SerialEvent {
    /// A chunk of bytes read from the device.
    Data(Vec<u8>),
    /// The device went away (EOF). Fatal.
    Disconnected(String),
}

/// Write half of the grid link.
///
/// The bridge owns exactly one sink and routes every hardware write
/// through it; one call covers one complete hardware message, so writes
/// from different OSC messages never interleave.
pub trait SerialSink: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError>;
}

/// An open serial link to the grid.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open `path` with the given line parameters.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self, SerialError> {
        let port = serialport::new(path, config.baud_rate)
            .data_bits(data_bits(config.data_bits))
            .stop_bits(stop_bits(config.stop_bits))
            .parity(parity(config.parity))
            .flow_control(flow_control(config.flow_control))
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| SerialError::Open {
                path: path.to_string(),
                source,
            })?;
        Ok(Self { port })
    }

    /// Clone the write half. The read thread keeps the original handle.
    pub fn writer(&self) -> Result<SerialWriter, SerialError> {
        let port = self.port.try_clone().map_err(SerialError::Clone)?;
        Ok(SerialWriter { port })
    }

    /// Consume the link and run the read loop on a dedicated thread.
    ///
    /// Timeouts are the idle case and stay silent. Other read errors are
    /// transient: logged under debug and retried. Only EOF reports
    /// `Disconnected`.
    pub fn spawn_reader(
        self,
        tx: mpsc::Sender<SerialEvent>,
    ) -> Result<thread::JoinHandle<()>, SerialError> {
        let mut port = self.port;
        let handle = thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || {
                let mut buf = [0u8; CHUNK_CAPACITY];
                loop {
                    match port.read(&mut buf) {
                        Ok(0) => {
                            let _ = tx.blocking_send(SerialEvent::Disconnected(
                                "serial device reached EOF".into(),
                            ));
                            return;
                        }
                        Ok(n) => {
                            if tx.blocking_send(SerialEvent::Data(buf[..n].to_vec())).is_err() {
                                // Bridge is gone; nothing left to read for.
                                return;
                            }
                        }
                        Err(e)
                            if e.kind() == ErrorKind::TimedOut
                                || e.kind() == ErrorKind::Interrupted =>
                        {
                            if tx.is_closed() {
                                return;
                            }
                        }
                        Err(e) => {
                            log::debug!("transient serial read error, retrying: {e}");
                            if tx.is_closed() {
                                return;
                            }
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                }
            })?;
        Ok(handle)
    }
}

/// Concrete [`SerialSink`] over a cloned serial handle.
pub struct SerialWriter {
    port: Box<dyn SerialPort>,
}

impl SerialSink for SerialWriter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}

fn data_bits(bits: u8) -> serialport::DataBits {
    match bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    }
}

fn stop_bits(bits: u8) -> serialport::StopBits {
    match bits {
        2 => serialport::StopBits::Two,
        _ => serialport::StopBits::One,
    }
}

fn parity(mode: ParityMode) -> serialport::Parity {
    match mode {
        ParityMode::None => serialport::Parity::None,
        ParityMode::Even => serialport::Parity::Even,
        ParityMode::Odd => serialport::Parity::Odd,
    }
}

fn flow_control(mode: FlowControl) -> serialport::FlowControl {
    match mode {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::Hardware => serialport::FlowControl::Hardware,
        FlowControl::Software => serialport::FlowControl::Software,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_maps_to_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(data_bits(config.data_bits), serialport::DataBits::Eight);
        assert_eq!(stop_bits(config.stop_bits), serialport::StopBits::One);
        assert_eq!(parity(config.parity), serialport::Parity::None);
        assert_eq!(
            flow_control(config.flow_control),
            serialport::FlowControl::None
        );
    }

    #[test]
    fn test_odd_line_parameters_map_through() {
        assert_eq!(data_bits(7), serialport::DataBits::Seven);
        assert_eq!(stop_bits(2), serialport::StopBits::Two);
        assert_eq!(parity(ParityMode::Odd), serialport::Parity::Odd);
        assert_eq!(
            flow_control(FlowControl::Hardware),
            serialport::FlowControl::Hardware
        );
    }

    #[test]
    fn test_open_missing_device_names_path() {
        let err = SerialLink::open("/dev/does-not-exist", &SerialConfig::default())
            .err()
            .expect("open should fail");
        assert!(err.to_string().contains("/dev/does-not-exist"));
    }
}
