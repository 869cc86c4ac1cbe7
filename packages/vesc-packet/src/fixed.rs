//! Fixed-point wire fields.
//!
//! The firmware never puts IEEE floats on the wire. A fractional value is
//! multiplied by a power-of-ten `SCALE` and sent as a signed integer; the
//! receiver divides by the same scale.

use crate::{
    decode::{Decode, DecodeError},
    encode::Encode,
};

/// Rounds half away from zero. The float-to-int cast saturates at the bounds
/// of `i64`; callers clamp to their wire type.
///
/// `f32::round` lives in `std`, so this crate does it by hand.
fn round_to_i64(value: f64) -> i64 {
    if value >= 0.0 {
        (value + 0.5) as i64
    } else {
        (value - 0.5) as i64
    }
}

macro_rules! fixed_point {
    ($(#[$meta:meta])* $name:ident, $raw:ty) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name<const SCALE: u32> {
            raw: $raw,
        }

        impl<const SCALE: u32> $name<SCALE> {
            /// Wraps an already scaled wire value.
            pub const fn from_raw(raw: $raw) -> Self {
                Self { raw }
            }

            /// Scales `value` and rounds it to the nearest representable integer.
            ///
            /// Values outside the range of the wire type saturate.
            pub fn from_f32(value: f32) -> Self {
                let scaled = round_to_i64(value as f64 * SCALE as f64);
                let raw = scaled.clamp(<$raw>::MIN as i64, <$raw>::MAX as i64) as $raw;
                Self { raw }
            }

            pub const fn raw(self) -> $raw {
                self.raw
            }

            pub fn to_f32(self) -> f32 {
                (self.raw as f64 / SCALE as f64) as f32
            }
        }

        impl<const SCALE: u32> Encode for $name<SCALE> {
            fn size(&self) -> usize {
                self.raw.size()
            }

            fn encode(&self, data: &mut [u8]) {
                self.raw.encode(data)
            }
        }

        impl<const SCALE: u32> Decode for $name<SCALE> {
            fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                Ok(Self::from_raw(<$raw>::decode(data)?))
            }
        }
    };
}

fixed_point!(
    /// A 32-bit fixed-point value carrying `SCALE` steps per unit.
    Fixed32,
    i32
);

fixed_point!(
    /// A 16-bit fixed-point value carrying `SCALE` steps per unit.
    Fixed16,
    i16
);
