use alloc::vec::Vec;
use core::mem::size_of;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Failed to decode {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Payload was too short.")]
    ShortPayload,

    #[error("Frame was malformed: {0}")]
    Malformed(MalformedReason),

    #[error("CRC16 checksum mismatch. Found {value:x}, expected {expected:x}.")]
    CrcMismatch { value: u16, expected: u16 },

    #[error("Reply carried command {value}, expected {expected}.")]
    UnexpectedCommand { value: u8, expected: u8 },

    #[error("Unknown command identifier {0}.")]
    UnknownCommand(u8),
}

/// Why a candidate frame was thrown away.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("expected stop marker, found {found:#04x}")]
    StopMarker { found: u8 },

    #[error("declared length {len} exceeds maximum of {max}")]
    LengthExceedsMax { len: usize, max: usize },

    #[error("buffer ended before the frame was complete")]
    Truncated,

    #[error("{count} bytes followed the stop marker")]
    TrailingBytes { count: usize },
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// The input slice is advanced by the number of bytes consumed.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or too short to hold
    /// a complete value of this type.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl Decode for () {
    fn decode(_data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    let (bytes, rest) = data
                        .split_first_chunk::<{ size_of::<$t>() }>()
                        .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::ShortPayload))?;
                    *data = rest;
                    Ok(Self::from_be_bytes(*bytes))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, i8, i16, i32);

impl Decode for bool {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(u8::decode(data)? != 0)
    }
}

/// Consumes the rest of the input.
impl Decode for Vec<u8> {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = data.to_vec();
        *data = &[];
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_big_endian() {
        let mut data: &[u8] = &[0x12, 0x34, 0xFF, 0xFF, 0xFF, 0xFE, 0x07];
        assert_eq!(u16::decode(&mut data), Ok(0x1234));
        assert_eq!(i32::decode(&mut data), Ok(-2));
        assert_eq!(data, &[0x07]);
    }

    #[test]
    fn short_input() {
        let mut data: &[u8] = &[0x01, 0x02, 0x03];
        let err = u32::decode(&mut data).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::ShortPayload);

        // Nothing is consumed on failure.
        assert_eq!(data.len(), 3);
    }
}
