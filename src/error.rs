//! Our error types for the RS485 probe.
//!
//! [`Error`] ends a run. [`SendError`] only fails a single attempt and is
//! counted by the phase driver.

use thiserror::Error;

use crate::packets::PacketKind;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Conditions which terminate a run early.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Failed to connect to {port}: {cause:?}")]
    Connection { port: String, cause: I },
    #[error("Serial connection not established")]
    NotOpen,
    #[error("Test interrupted by user")]
    Interrupted,
    #[error("Packet {0:?} missing from catalog")]
    MissingPacket(PacketKind),
}

/// Why a single transmission attempt failed.
#[derive(Error, Debug)]
pub enum SendError<I: embedded_io::Error> {
    #[error("Timeout while sending packet")]
    Timeout,
    #[error("Serial error while sending packet: {0:?}")]
    Transport(I),
    #[error("Failed to send complete packet. Sent {written}/{expected} bytes")]
    PartialWrite { written: usize, expected: usize },
    #[error("Timeout while reading response")]
    ReadTimeout,
    #[error("Serial error while reading response: {0:?}")]
    ReadFailed(I),
    #[error("Serial connection not established")]
    NotOpen,
}

impl<I: embedded_io::Error> SendError<I> {
    /// Classify a failure on the receive side, after the frame went out.
    pub fn from_read(err: I) -> Self {
        match err.kind() {
            embedded_io::ErrorKind::TimedOut => SendError::ReadTimeout,
            _ => SendError::ReadFailed(err),
        }
    }
}

impl<I: embedded_io::Error> From<I> for SendError<I> {
    fn from(err: I) -> Self {
        match err.kind() {
            embedded_io::ErrorKind::TimedOut => SendError::Timeout,
            _ => SendError::Transport(err),
        }
    }
}
