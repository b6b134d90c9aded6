//! [SerialChannel] for real hardware, backed by the `serialport` crate.

use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::channel::{ChannelConfig, SerialChannel};

/// An open OS serial port.
pub struct PortWrapper(Box<dyn SerialPort>);

/// [std::io::Error] with an [embedded_io::ErrorKind].
#[derive(Debug)]
pub struct IoError(std::io::Error);

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError(err)
    }
}

impl From<serialport::Error> for IoError {
    fn from(err: serialport::Error) -> Self {
        IoError(err.into())
    }
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            std::io::ErrorKind::AddrInUse => embedded_io::ErrorKind::AddrInUse,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::WouldBlock => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

impl SerialChannel for PortWrapper {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.0.bytes_to_read()? as usize)
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        Ok(self.0.clear(ClearBuffer::Input)?)
    }

    fn clear_output(&mut self) -> Result<(), Self::Error> {
        Ok(self.0.clear(ClearBuffer::Output)?)
    }
}

/// Open `config.port` with 8N1 framing and no flow control.
///
/// `serialport` has a single timeout for reads and writes, the longer of the two is used.
pub fn open_serial(config: &ChannelConfig) -> Result<PortWrapper, IoError> {
    let timeout_ms = config
        .read_timeout
        .to_millis()
        .max(config.write_timeout.to_millis());
    let port = serialport::new(&config.port, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(timeout_ms.into()))
        .open()?;
    Ok(PortWrapper(port))
}

/// Names of the serial ports present on this machine.
pub fn available_port_names() -> Result<Vec<String>, IoError> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
