//! The serial channel and its lifecycle.
//!
//! The port should be configured like so:
//! * Default baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

use fugit::MillisDurationU32;
use log::{Level, Log};

use crate::{
    error::{Error, Result},
    logging::emit,
};

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// Goodwe inverters talk at 9600 baud. Other rates are possible but unlikely to get a reply.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Upper bound for any single read or write on the port.
pub const DEFAULT_IO_TIMEOUT: MillisDurationU32 = MillisDurationU32::secs(2);

pub const DATA_BITS: u8 = 8;
pub const STOP_BITS: u8 = 1;

/// Everything needed to open the port. Framing is always 8N1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: MillisDurationU32,
    pub write_timeout: MillisDurationU32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_IO_TIMEOUT,
            write_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl ChannelConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Default::default()
        }
    }
}

/// What the probe needs from a serial port on top of [embedded_io::Read] & [embedded_io::Write].
///
/// Closing is dropping: an implementation releases the device in its `Drop`.
pub trait SerialChannel: embedded_io::Read + embedded_io::Write {
    /// Number of received bytes waiting to be read.
    fn bytes_available(&mut self) -> core::result::Result<usize, Self::Error>;

    /// Discard anything received but not yet read.
    fn clear_input(&mut self) -> core::result::Result<(), Self::Error>;

    /// Discard anything queued but not yet transmitted.
    fn clear_output(&mut self) -> core::result::Result<(), Self::Error>;
}

/// Exclusive owner of an open [SerialChannel].
///
/// The port is released on [Channel::close] or when the channel is dropped, whichever
/// comes first.
pub struct Channel<'l, S: SerialChannel> {
    port: Option<S>,
    name: String,
    logger: &'l dyn Log,
}

impl<'l, S: SerialChannel> Channel<'l, S> {
    /// Open a port with `connect` and start from empty buffers.
    pub fn open<F>(config: &ChannelConfig, logger: &'l dyn Log, connect: F) -> Result<Self, S::Error>
    where
        F: FnOnce(&ChannelConfig) -> core::result::Result<S, S::Error>,
    {
        emit!(logger, Level::Info, "Attempting to connect to {}", config.port);
        emit!(
            logger,
            Level::Info,
            "Configuration: {} baud, {}N{}",
            config.baud_rate,
            DATA_BITS,
            STOP_BITS
        );

        let connection_error = |cause| Error::Connection {
            port: config.port.clone(),
            cause,
        };

        let mut port = connect(config).map_err(connection_error)?;
        port.clear_input().map_err(connection_error)?;
        port.clear_output().map_err(connection_error)?;

        emit!(logger, Level::Info, "Successfully connected to {}", config.port);
        Ok(Self::from_port(port, &config.port, logger))
    }

    /// Wrap a port that is already open. Buffers are left untouched.
    pub fn from_port(port: S, name: impl Into<String>, logger: &'l dyn Log) -> Self {
        Self {
            port: Some(port),
            name: name.into(),
            logger,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Port identifier this channel was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the open port, or fail with [Error::NotOpen].
    pub fn port_mut(&mut self) -> Result<&mut S, S::Error> {
        self.port.as_mut().ok_or(Error::NotOpen)
    }

    /// Release the port. Calling this on a closed channel does nothing.
    pub fn close(&mut self) {
        if let Some(port) = self.port.take() {
            drop(port);
            emit!(self.logger, Level::Info, "Serial connection closed");
        }
    }
}

impl<S: SerialChannel> Drop for Channel<'_, S> {
    fn drop(&mut self) {
        self.close();
    }
}
