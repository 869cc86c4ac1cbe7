use crc::Crc;

/// [CRC16 error-detecting algorithm](https://en.wikipedia.org/wiki/Cyclic_redundancy_check)
/// used to check every frame payload.
///
/// The firmware computes CRC-16/XMODEM: polynomial `0x1021`, initial value `0`,
/// no reflection and no final xor.
pub const VESC_CRC16: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_XMODEM);

/// Computes the checksum of a frame payload.
#[inline]
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    VESC_CRC16.checksum(data)
}
