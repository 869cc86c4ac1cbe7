//! [`Transport`] over a hardware serial port.

use std::{
    io::{self, Read, Write},
    time::Duration,
};

use log::debug;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::{Transport, VescConfig, VescConnection, VescError};

/// An open serial port wired to a controller's UART.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl SerialTransport {
    /// Opens `path` as 8N1 without flow control.
    ///
    /// `timeout` bounds individual reads and writes on the port; reply
    /// deadlines are handled separately by the receiver.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, VescError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;

        debug!("Opened {} at {} baud", path, baud_rate);

        Ok(Self { port })
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(bytes.len())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

impl VescConnection<SerialTransport> {
    /// Opens the serial port at `path` using the baud rate from `config`.
    pub fn open(path: &str, config: VescConfig) -> Result<Self, VescError> {
        let transport = SerialTransport::open(path, config.baud_rate, config.reply_timeout)?;
        Ok(Self::with_transport(transport, config))
    }
}
