//! Crate for talking to VESC motor controllers over a UART link.
//!
//! [`VescConnection`] drives one request/response exchange at a time over any
//! [`Transport`]. The wire format itself lives in [`protocol`].

pub use vesc_packet as protocol;

use std::{io, time::Instant};

use thiserror::Error;
use vesc_packet::{DecodeError, EncodeError};

pub mod config;
pub mod connection;
pub mod recv;
#[cfg(feature = "serial")]
pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

pub use config::VescConfig;
pub use connection::VescConnection;

/// Byte-level link to a controller.
///
/// Reads are poll-driven: callers check [`bytes_available`](Transport::bytes_available)
/// before calling [`read_byte`](Transport::read_byte), so `read_byte` is only
/// expected to be called when a byte is buffered.
pub trait Transport {
    /// Writes `bytes` and returns how many were written.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read_byte(&mut self) -> io::Result<u8>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
}

/// Monotonic time source used for receive deadlines.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Error, Debug)]
pub enum VescError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Packet encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Packet decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Timed out waiting for a reply")]
    Timeout,

    #[error("No transport attached")]
    TransportUnavailable,

    #[cfg(feature = "serial")]
    #[error("Serialport Error: {0}")]
    Serialport(#[from] serialport::Error),
}
