use core::mem::size_of;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Payload is too large ({size} bytes, max {max}).")]
    PayloadTooLarge { size: usize, max: usize },
}

/// A type that can be encoded into a sequence of bytes.
///
/// Multi-byte values are written big-endian, which is what the firmware
/// expects on the wire.
pub trait Encode {
    /// Returns the number of bytes this value will take when encoded.
    fn size(&self) -> usize;

    /// Encodes this instance into the provided byte slice.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than [`Encode::size`].
    fn encode(&self, data: &mut [u8]);

    /// Encodes this instance into a freshly allocated buffer.
    fn to_vec(&self) -> alloc::vec::Vec<u8> {
        let mut data = alloc::vec![0; self.size()];
        self.encode(&mut data);
        data
    }
}

macro_rules! impl_encode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn size(&self) -> usize {
                    size_of::<Self>()
                }

                fn encode(&self, data: &mut [u8]) {
                    data[..size_of::<Self>()].copy_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

impl_encode_for_primitive!(u8, u16, u32, i8, i16, i32);

impl Encode for bool {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = u8::from(*self);
    }
}

impl Encode for () {
    fn size(&self) -> usize {
        0
    }
    fn encode(&self, _data: &mut [u8]) {}
}

impl Encode for &[u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[..self.len()].copy_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}

impl Encode for alloc::vec::Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        self.as_slice().encode(data)
    }
}

/// Sequential writer over a byte slice.
///
/// Each [`write`](MessageEncoder::write) places a value directly after the
/// previous one.
pub struct MessageEncoder<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self::new_with_position(data, 0)
    }

    pub fn new_with_position(data: &'a mut [u8], position: usize) -> Self {
        Self { data, position }
    }

    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) {
        value.encode(&mut self.data[self.position..]);
        self.position += value.size();
    }

    /// Number of bytes written so far, including the starting offset.
    pub fn position(&self) -> usize {
        self.position
    }
}
