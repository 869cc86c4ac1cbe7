//! Implementation of the VESC UART packet protocol in Rust.
//!
//! This crate is structured around two key traits: [`Encode`] and [`Decode`].
//! Commands sent to a controller implement [`Encode`], replies received from it
//! implement [`Decode`]. Payloads travel inside a [`frame`], which adds a start
//! marker, a length prefix, a [CRC16](crc16) and a stop marker.

#![no_std]

extern crate alloc;

pub mod chuck;
pub mod commands;
pub mod frame;
pub mod values;

mod crc;
mod decode;
mod encode;
mod fixed;

pub use crc::{crc16, VESC_CRC16};
pub use decode::{Decode, DecodeError, DecodeErrorKind, MalformedReason};
pub use encode::{Encode, EncodeError, MessageEncoder};
pub use fixed::{Fixed16, Fixed32};

/// Start marker for frames whose payload length fits in one byte.
pub const SHORT_START: u8 = 0x02;

/// Start marker for frames carrying a two byte, big-endian payload length.
pub const LONG_START: u8 = 0x03;

/// Terminator byte closing every frame.
pub const STOP: u8 = 0x03;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;
