//! Deadline-bounded frame reception.

use std::{thread, time::Instant};

use log::{trace, warn};
use vesc_packet::frame::{FrameDecoder, RawFrame};

use crate::{Clock, Transport, VescConfig, VescError};

/// Polls `transport` until a stop-terminated frame has been assembled or
/// `deadline` passes.
///
/// Noise before a start marker is dropped. Candidates with a bad stop marker
/// or an oversized length are discarded and seeking resumes right after their
/// start marker; the deadline is never extended. The returned frame has not been checked against its CRC.
///
/// # Errors
///
/// On expiry this returns [`VescError::Timeout`] if nothing resembling a frame
/// arrived, or the last [`Malformed`](vesc_packet::DecodeErrorKind::Malformed)
/// rejection if candidates arrived but none were well-formed.
pub fn receive_frame<T, C>(
    transport: &mut T,
    clock: &C,
    deadline: Instant,
    config: &VescConfig,
) -> Result<RawFrame, VescError>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut decoder = FrameDecoder::with_max_payload(config.max_payload);
    let mut last_rejection = None;

    loop {
        if clock.now() >= deadline {
            return Err(match last_rejection {
                Some(err) => VescError::Decode(err),
                None => VescError::Timeout,
            });
        }

        let available = transport.bytes_available()?;
        if available == 0 {
            if !config.poll_interval.is_zero() {
                thread::sleep(config.poll_interval);
            }
            continue;
        }

        for _ in 0..available {
            let byte = transport.read_byte()?;
            let mut next = decoder.push(byte);
            while let Some(result) = next {
                match result {
                    Ok(frame) => {
                        trace!(
                            "received frame: payload {:x?}, crc {:04x}",
                            frame.payload,
                            frame.crc
                        );
                        return Ok(frame);
                    }
                    Err(err) => {
                        warn!("Discarding frame: {}", err);
                        last_rejection = Some(err);
                        next = decoder.poll();
                    }
                }
            }
        }
    }
}
