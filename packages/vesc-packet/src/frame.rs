//! Packet framing.
//!
//! # Encoding
//!
//! | Field     | Size | Description |
//! |-----------|------|-------------|
//! | `start`   | 1    | [`SHORT_START`] when the payload is shorter than 256 bytes, [`LONG_START`] otherwise. |
//! | `length`  | 1–2  | Payload length, big-endian. Two bytes only after [`LONG_START`]. |
//! | `payload` | n    | Command identifier followed by command-specific fields. |
//! | `crc16`   | 2    | [`crc16`] of `payload` only, big-endian. |
//! | `stop`    | 1    | Must be [`STOP`]. |

use alloc::{collections::VecDeque, vec::Vec};

use crate::{
    crc::crc16,
    decode::{DecodeError, DecodeErrorKind, MalformedReason},
    encode::{Encode, EncodeError, MessageEncoder},
    LONG_START, MAX_PAYLOAD, SHORT_START, STOP,
};

/// An outbound frame borrowing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wraps `payload` for framing.
    ///
    /// # Errors
    ///
    /// Fails with [`EncodeError::PayloadTooLarge`] if the payload cannot be
    /// described by a two byte length.
    pub fn new(payload: &'a [u8]) -> Result<Self, EncodeError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(EncodeError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        Ok(Self { payload })
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    fn is_long(&self) -> bool {
        self.payload.len() > u8::MAX as usize
    }
}

impl Encode for Frame<'_> {
    fn size(&self) -> usize {
        let header = if self.is_long() { 3 } else { 2 };
        header + self.payload.len() + 3
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);

        if self.is_long() {
            enc.write(&LONG_START);
            enc.write(&(self.payload.len() as u16));
        } else {
            enc.write(&SHORT_START);
            enc.write(&(self.payload.len() as u8));
        }

        enc.write(&self.payload);
        enc.write(&crc16(self.payload));
        enc.write(&STOP);
    }
}

/// Frames `payload` into a buffer ready to be written to the transport.
///
/// # Errors
///
/// Fails with [`EncodeError::PayloadTooLarge`] for payloads over 65535 bytes.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    Ok(Frame::new(payload)?.to_vec())
}

/// A stop-terminated frame whose checksum has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub payload: Vec<u8>,
    pub crc: u16,
}

impl RawFrame {
    /// Checks the embedded CRC and hands out the payload if it matches.
    pub fn validate(self) -> Result<Vec<u8>, DecodeError> {
        validate(&self.payload, self.crc)?;
        Ok(self.payload)
    }
}

/// Recomputes the payload checksum and compares it to the one that came
/// with the frame.
pub fn validate(payload: &[u8], embedded_crc: u16) -> Result<(), DecodeError> {
    let expected = crc16(payload);
    if expected != embedded_crc {
        return Err(DecodeError::new::<RawFrame>(DecodeErrorKind::CrcMismatch {
            value: embedded_crc,
            expected,
        }));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekStart,
    ReadLength { wide: bool },
    Accumulate { header: usize, len: usize },
    Done,
}

/// Byte-at-a-time frame extractor.
///
/// Bytes that cannot start a frame are dropped while seeking. Once a start
/// marker is seen the decoder reads the length, then exactly `length + 3`
/// bytes (payload, CRC, stop marker), and yields the candidate.
///
/// A wrong stop marker or an oversized length rejects the candidate. Only its
/// start marker is dropped: every byte read after it is fed through seeking
/// again, so a stray marker byte in the noise cannot swallow the frame that
/// follows it. Replayed bytes are consumed by later calls to
/// [`push`](Self::push) or [`poll`](Self::poll).
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: State,
    buffer: Vec<u8>,
    backlog: VecDeque<u8>,
    max_payload: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD)
    }

    /// Creates a decoder that rejects frames announcing more than
    /// `max_payload` bytes.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            state: State::SeekStart,
            buffer: Vec::new(),
            backlog: VecDeque::new(),
            max_payload: max_payload.min(MAX_PAYLOAD),
        }
    }

    pub fn reset(&mut self) {
        self.state = State::SeekStart;
        self.buffer.clear();
        self.backlog.clear();
    }

    /// Returns `true` while the decoder is not inside a candidate frame and
    /// has no replayed bytes left to look at.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::SeekStart | State::Done) && self.backlog.is_empty()
    }

    /// Feeds one byte.
    ///
    /// Returns `Some` when a candidate has been completed or rejected and
    /// `None` while more bytes are needed. After a rejection, call
    /// [`poll`](Self::poll) until it returns `None` to drain the replayed
    /// bytes before waiting for more input.
    pub fn push(&mut self, byte: u8) -> Option<Result<RawFrame, DecodeError>> {
        self.backlog.push_back(byte);
        self.poll()
    }

    /// Runs the bytes queued inside the decoder until one yields a result.
    pub fn poll(&mut self) -> Option<Result<RawFrame, DecodeError>> {
        while let Some(byte) = self.backlog.pop_front() {
            if let Some(result) = self.step(byte) {
                return Some(result);
            }
        }
        None
    }

    fn step(&mut self, byte: u8) -> Option<Result<RawFrame, DecodeError>> {
        match self.state {
            State::SeekStart | State::Done => {
                self.buffer.clear();
                self.state = match byte {
                    SHORT_START => State::ReadLength { wide: false },
                    LONG_START => State::ReadLength { wide: true },
                    _ => State::SeekStart,
                };
                None
            }
            State::ReadLength { wide } => {
                self.buffer.push(byte);
                let len = match (wide, self.buffer.as_slice()) {
                    (false, &[len]) => len as usize,
                    (true, &[high, low]) => u16::from_be_bytes([high, low]) as usize,
                    _ => return None,
                };

                if len > self.max_payload {
                    return Some(Err(self.reject(MalformedReason::LengthExceedsMax {
                        len,
                        max: self.max_payload,
                    })));
                }

                let header = self.buffer.len();
                self.buffer.reserve(len + 3);
                self.state = State::Accumulate { header, len };
                None
            }
            State::Accumulate { header, len } => {
                self.buffer.push(byte);
                if self.buffer.len() < header + len + 3 {
                    return None;
                }

                if byte != STOP {
                    return Some(Err(self.reject(MalformedReason::StopMarker { found: byte })));
                }

                self.state = State::Done;
                let crc_at = header + len;
                let crc = u16::from_be_bytes([self.buffer[crc_at], self.buffer[crc_at + 1]]);
                self.buffer.truncate(crc_at);
                self.buffer.drain(..header);
                let payload = core::mem::take(&mut self.buffer);
                Some(Ok(RawFrame { payload, crc }))
            }
        }
    }

    /// Drops the candidate's start marker and queues everything read after it
    /// ahead of any bytes still waiting.
    fn reject(&mut self, reason: MalformedReason) -> DecodeError {
        self.state = State::SeekStart;
        for byte in self.buffer.drain(..).rev() {
            self.backlog.push_front(byte);
        }
        malformed(reason)
    }
}

fn malformed(reason: MalformedReason) -> DecodeError {
    DecodeError::new::<RawFrame>(DecodeErrorKind::Malformed(reason))
}

/// Decodes a buffer holding exactly one frame and returns its validated
/// payload.
///
/// Leading bytes that are not a start marker are skipped, as on the wire.
pub fn decode_frame(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = FrameDecoder::new();

    for (index, &byte) in data.iter().enumerate() {
        if let Some(result) = decoder.push(byte) {
            let frame = result?;
            let trailing = data.len() - index - 1 + decoder.backlog.len();
            if trailing > 0 {
                return Err(malformed(MalformedReason::TrailingBytes { count: trailing }));
            }
            return frame.validate();
        }
    }

    Err(malformed(MalformedReason::Truncated))
}
