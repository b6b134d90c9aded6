//! This crate exercises the RS485 link between a host and a Goodwe solar inverter.
//!
//! It sends a fixed sequence of frames, waits, and records whatever bytes come back.
//! Replies are never decoded or checked, the point is to find out whether the bus works
//! at all and how the inverter reacts.
//!
//! Inverters this has been used with:
//! * GW3000SS
//!
//! Adapters this has been used with:
//! * Waveshare USB to RS485 (FT232RNL)
//!
//! The serial port used for inverter comms should be configured like so:
//! * Default baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! A run is five phases, each sending one frame five times, two seconds apart:
//! 1. Off-line Query
//! 2. Remove Register
//! 3. Off-line Query (Repeated)
//! 4. Allocate Register Address
//! 5. Read Data

pub mod channel;
pub mod delay;
pub mod error;
pub mod logging;
pub mod packets;
pub mod port;
pub mod sequencer;
pub mod types;

#[cfg(test)]
mod mock_serial;
