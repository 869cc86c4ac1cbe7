//! Outbound commands and reply dispatch.

use alloc::{format, string::String, vec::Vec};
use core::fmt;

use crate::{
    chuck::JoystickState,
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::{Encode, EncodeError, MessageEncoder},
    fixed::Fixed32,
};

/// Firmware command identifiers.
///
/// Values come from the `COMM_PACKET_ID` enumeration of the VESC firmware.
/// Only the identifiers this crate sends or expects back are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    FwVersion = 0,
    GetValues = 4,
    SetDuty = 5,
    SetCurrent = 6,
    SetCurrentBrake = 7,
    SetRpm = 8,
    TerminalCmd = 20,
    Print = 21,
    Alive = 30,
    ForwardCan = 34,
    SetChuckData = 35,
    PingCan = 62,
}

impl TryFrom<u8> for CommandId {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::FwVersion,
            4 => Self::GetValues,
            5 => Self::SetDuty,
            6 => Self::SetCurrent,
            7 => Self::SetCurrentBrake,
            8 => Self::SetRpm,
            20 => Self::TerminalCmd,
            21 => Self::Print,
            30 => Self::Alive,
            34 => Self::ForwardCan,
            35 => Self::SetChuckData,
            62 => Self::PingCan,
            v => {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::UnknownCommand(v)));
            }
        })
    }
}

impl Decode for CommandId {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        Self::try_from(u8::decode(data)?)
    }
}

impl Encode for CommandId {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = *self as u8;
    }
}

/// Address of a controller reached over the CAN bus of the directly attached
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerId(pub u8);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAN {}", self.0)
    }
}

impl From<u8> for ControllerId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Motor current in amps, 1 mA per step.
pub type Current = Fixed32<1000>;

/// Duty cycle, 1e-5 per step.
pub type Duty = Fixed32<100_000>;

/// A command understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Requests a telemetry snapshot, answered with
    /// [`TelemetryRecord`](crate::values::TelemetryRecord).
    GetValues,

    /// Asks the controller to ping every CAN id, answered with
    /// [`ScanReply`](crate::values::ScanReply).
    PingCan,

    /// Drives the motor with the given current in amps.
    SetCurrent(f32),

    /// Brakes with the given current in amps.
    SetCurrentBrake(f32),

    /// Holds the given electrical RPM.
    SetRpm(i32),

    /// Sets the duty cycle, `-1.0..=1.0`.
    SetDuty(f32),

    SetChuckData(JoystickState),

    /// Spins a rotating current vector at `erpm` without position feedback.
    ///
    /// The firmware only exposes this through its terminal and stops the motor
    /// on its own after a few seconds. Signs are passed through unchanged; a
    /// negative `erpm` spins the motor backwards.
    OpenLoop { current: f32, erpm: i32 },

    /// Releases the motor by commanding zero current.
    Stop,

    /// Resets the controller's command timeout.
    Alive,
}

impl Command {
    pub fn id(&self) -> CommandId {
        match self {
            Self::GetValues => CommandId::GetValues,
            Self::PingCan => CommandId::PingCan,
            Self::SetCurrent(_) | Self::Stop => CommandId::SetCurrent,
            Self::SetCurrentBrake(_) => CommandId::SetCurrentBrake,
            Self::SetRpm(_) => CommandId::SetRpm,
            Self::SetDuty(_) => CommandId::SetDuty,
            Self::SetChuckData(_) => CommandId::SetChuckData,
            Self::OpenLoop { .. } => CommandId::TerminalCmd,
            Self::Alive => CommandId::Alive,
        }
    }

    fn terminal_line(&self) -> Option<String> {
        match self {
            Self::OpenLoop { current, erpm } => Some(format!("foc_openloop {current:.2} {erpm}")),
            _ => None,
        }
    }
}

impl Encode for Command {
    fn size(&self) -> usize {
        1 + match self {
            Self::GetValues | Self::PingCan | Self::Alive => 0,
            Self::SetCurrent(_) | Self::SetCurrentBrake(_) | Self::SetDuty(_) | Self::Stop => 4,
            Self::SetRpm(rpm) => rpm.size(),
            Self::SetChuckData(state) => state.size(),
            Self::OpenLoop { .. } => self.terminal_line().map_or(0, |line| line.len()),
        }
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&self.id());

        match self {
            Self::GetValues | Self::PingCan | Self::Alive => {}
            Self::SetCurrent(current) | Self::SetCurrentBrake(current) => {
                enc.write(&Current::from_f32(*current));
            }
            Self::Stop => enc.write(&Current::from_raw(0)),
            Self::SetDuty(duty) => enc.write(&Duty::from_f32(*duty)),
            Self::SetRpm(rpm) => enc.write(rpm),
            Self::SetChuckData(state) => enc.write(state),
            Self::OpenLoop { .. } => {
                if let Some(line) = self.terminal_line() {
                    enc.write(&line.as_bytes());
                }
            }
        }
    }
}

/// A command together with the controller it is meant for.
///
/// # Encoding
///
/// Without a target the payload is the command itself. With one, it is
/// wrapped in a forwarding envelope:
///
/// | Field     | Size | Description |
/// |-----------|------|-------------|
/// | `id`      | 1    | [`CommandId::ForwardCan`]. |
/// | `target`  | 1    | [`ControllerId`] of the receiving controller. |
/// | `length`  | 1    | Length of `inner`. |
/// | `inner`   | n    | The unaddressed command payload. |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub command: Command,
    pub target: Option<ControllerId>,
}

impl Request {
    /// Largest inner payload a forwarding envelope can describe.
    pub const MAX_FORWARDED: usize = u8::MAX as usize;

    pub fn new(command: Command, target: Option<ControllerId>) -> Self {
        Self { command, target }
    }

    pub fn local(command: Command) -> Self {
        Self::new(command, None)
    }

    pub fn forwarded(command: Command, target: ControllerId) -> Self {
        Self::new(command, Some(target))
    }

    /// Builds the payload for this request.
    ///
    /// # Errors
    ///
    /// Fails if the command is too large for a forwarding envelope.
    pub fn to_payload(&self) -> Result<Vec<u8>, EncodeError> {
        let inner = self.command.to_vec();

        let Some(target) = self.target else {
            return Ok(inner);
        };

        if inner.len() > Self::MAX_FORWARDED {
            return Err(EncodeError::PayloadTooLarge {
                size: inner.len(),
                max: Self::MAX_FORWARDED,
            });
        }

        let mut payload = alloc::vec![0; 3 + inner.len()];
        let mut enc = MessageEncoder::new(&mut payload);
        enc.write(&CommandId::ForwardCan);
        enc.write(&target.0);
        enc.write(&(inner.len() as u8));
        enc.write(&inner);
        Ok(payload)
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        Self::local(command)
    }
}

/// A payload the controller sends back in answer to a command.
pub trait Reply: Decode {
    /// Identifier the reply payload starts with.
    const ID: CommandId;
}

/// Checks the leading command identifier of `payload` and decodes the rest
/// as `R`.
pub fn decode_reply<R: Reply>(payload: &[u8]) -> Result<R, DecodeError> {
    let mut data = payload;

    let id = u8::decode(&mut data).map_err(|_| DecodeError::new::<R>(DecodeErrorKind::ShortPayload))?;
    if id != R::ID as u8 {
        return Err(DecodeError::new::<R>(DecodeErrorKind::UnexpectedCommand {
            value: id,
            expected: R::ID as u8,
        }));
    }

    R::decode(&mut data)
}
