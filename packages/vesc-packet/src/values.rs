//! Replies carrying controller state.

use alloc::vec::Vec;
use core::fmt;

use crate::{
    commands::{CommandId, ControllerId, Reply},
    decode::{Decode, DecodeError},
    fixed::{Fixed16, Fixed32},
};

/// Telemetry snapshot returned for [`Command::GetValues`](crate::commands::Command::GetValues).
///
/// # Encoding
///
/// Fields follow the command identifier back to back, all big-endian.
///
/// | Field               | Size | Scale |
/// |---------------------|------|-------|
/// | `avg_motor_current` | 4    | 100   |
/// | `avg_input_current` | 4    | 100   |
/// | `duty_cycle`        | 2    | 1000  |
/// | `rpm`               | 4    | 1     |
/// | `input_voltage`     | 2    | 10    |
/// | `amp_hours`         | 4    | 10000 |
/// | `amp_hours_charged` | 4    | 10000 |
/// | `tachometer`        | 4    | 1     |
/// | `tachometer_abs`    | 4    | 1     |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryRecord {
    /// Amps.
    pub avg_motor_current: f32,
    /// Amps.
    pub avg_input_current: f32,
    pub duty_cycle: f32,
    /// Electrical RPM.
    pub rpm: i32,
    /// Volts.
    pub input_voltage: f32,
    pub amp_hours: f32,
    pub amp_hours_charged: f32,
    pub tachometer: i32,
    pub tachometer_abs: i32,
}

impl TelemetryRecord {
    /// Number of payload bytes following the command identifier.
    pub const ENCODED_SIZE: usize = 4 + 4 + 2 + 4 + 2 + 4 + 4 + 4 + 4;
}

impl Decode for TelemetryRecord {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let avg_motor_current = Fixed32::<100>::decode(data)?.to_f32();
        let avg_input_current = Fixed32::<100>::decode(data)?.to_f32();
        let duty_cycle = Fixed16::<1000>::decode(data)?.to_f32();
        let rpm = i32::decode(data)?;
        let input_voltage = Fixed16::<10>::decode(data)?.to_f32();
        let amp_hours = Fixed32::<10000>::decode(data)?.to_f32();
        let amp_hours_charged = Fixed32::<10000>::decode(data)?.to_f32();
        let tachometer = i32::decode(data)?;
        let tachometer_abs = i32::decode(data)?;

        Ok(Self {
            avg_motor_current,
            avg_input_current,
            duty_cycle,
            rpm,
            input_voltage,
            amp_hours,
            amp_hours_charged,
            tachometer,
            tachometer_abs,
        })
    }
}

impl Reply for TelemetryRecord {
    const ID: CommandId = CommandId::GetValues;
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "avgMotorCurrent: {:.2} A", self.avg_motor_current)?;
        writeln!(f, "avgInputCurrent: {:.2} A", self.avg_input_current)?;
        writeln!(f, "dutyCycleNow:    {:.3}", self.duty_cycle)?;
        writeln!(f, "rpm:             {}", self.rpm)?;
        writeln!(f, "inputVoltage:    {:.1} V", self.input_voltage)?;
        writeln!(f, "ampHours:        {:.4} Ah", self.amp_hours)?;
        writeln!(f, "ampHoursCharged: {:.4} Ah", self.amp_hours_charged)?;
        writeln!(f, "tachometer:      {}", self.tachometer)?;
        write!(f, "tachometerAbs:   {}", self.tachometer_abs)
    }
}

/// Controllers that answered a CAN ping, in the order the firmware reports
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReply {
    pub controllers: Vec<ControllerId>,
}

impl Decode for ScanReply {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let controllers = Vec::<u8>::decode(data)?
            .into_iter()
            .map(ControllerId)
            .collect();
        Ok(Self { controllers })
    }
}

impl Reply for ScanReply {
    const ID: CommandId = CommandId::PingCan;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::decode_reply,
        crc::crc16,
        decode::DecodeErrorKind,
        frame::{decode_frame, encode_frame},
    };
    use alloc::vec;

    fn fixture() -> Vec<u8> {
        let mut payload = vec![CommandId::GetValues as u8];
        payload.extend(1234i32.to_be_bytes()); // 12.34 A
        payload.extend(500i32.to_be_bytes()); // 5.00 A
        payload.extend(500i16.to_be_bytes()); // 0.500
        payload.extend(1500i32.to_be_bytes());
        payload.extend(480i16.to_be_bytes()); // 48.0 V
        payload.extend(12345i32.to_be_bytes()); // 1.2345 Ah
        payload.extend(0i32.to_be_bytes());
        payload.extend(1000i32.to_be_bytes());
        payload.extend(1000i32.to_be_bytes());
        payload
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn decodes_fixture() {
        let payload = fixture();
        assert_eq!(payload.len(), 1 + TelemetryRecord::ENCODED_SIZE);

        let record = decode_reply::<TelemetryRecord>(&payload).unwrap();
        assert!(close(record.avg_motor_current, 12.34));
        assert!(close(record.avg_input_current, 5.0));
        assert!(close(record.duty_cycle, 0.5));
        assert_eq!(record.rpm, 1500);
        assert!(close(record.input_voltage, 48.0));
        assert!(close(record.amp_hours, 1.2345));
        assert!(close(record.amp_hours_charged, 0.0));
        assert_eq!(record.tachometer, 1000);
        assert_eq!(record.tachometer_abs, 1000);
    }

    #[test]
    fn negative_fields() {
        let mut payload = vec![CommandId::GetValues as u8];
        payload.extend((-250i32).to_be_bytes());
        payload.extend(0i32.to_be_bytes());
        payload.extend((-100i16).to_be_bytes());
        payload.extend((-4200i32).to_be_bytes());
        payload.extend(0i16.to_be_bytes());
        payload.extend([0; 8]);
        payload.extend((-7i32).to_be_bytes());
        payload.extend(7i32.to_be_bytes());

        let record = decode_reply::<TelemetryRecord>(&payload).unwrap();
        assert!(close(record.avg_motor_current, -2.5));
        assert!(close(record.duty_cycle, -0.1));
        assert_eq!(record.rpm, -4200);
        assert_eq!(record.tachometer, -7);
    }

    #[test]
    fn short_payload_is_rejected() {
        let payload = fixture();
        for len in 1..payload.len() {
            let err = decode_reply::<TelemetryRecord>(&payload[..len]).unwrap_err();
            assert_eq!(err.kind(), DecodeErrorKind::ShortPayload, "length {len}");
        }
    }

    #[test]
    fn wrong_reply_id() {
        let mut payload = fixture();
        payload[0] = CommandId::Print as u8;
        assert_eq!(
            decode_reply::<TelemetryRecord>(&payload).unwrap_err().kind(),
            DecodeErrorKind::UnexpectedCommand {
                value: CommandId::Print as u8,
                expected: CommandId::GetValues as u8,
            }
        );
    }

    #[test]
    fn single_bit_flips_never_decode() {
        let payload = fixture();
        let frame = encode_frame(&payload).unwrap();

        // Payload and CRC bytes sit between the two header bytes and the stop marker.
        for byte in 2..frame.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;

                let err = decode_frame(&corrupted).unwrap_err();
                assert!(
                    matches!(
                        err.kind(),
                        DecodeErrorKind::CrcMismatch { .. } | DecodeErrorKind::Malformed(_)
                    ),
                    "byte {byte} bit {bit}: {err}"
                );
            }
        }

        assert_eq!(crc16(&payload).to_be_bytes(), frame[frame.len() - 3..frame.len() - 1]);
    }

    #[test]
    fn scan_reply() {
        let reply = decode_reply::<ScanReply>(&[62, 3, 17, 42]).unwrap();
        assert_eq!(
            reply.controllers,
            [ControllerId(3), ControllerId(17), ControllerId(42)]
        );

        let empty = decode_reply::<ScanReply>(&[62]).unwrap();
        assert!(empty.controllers.is_empty());
    }

    #[test]
    fn display_lists_every_field() {
        let text = alloc::format!("{}", decode_reply::<TelemetryRecord>(&fixture()).unwrap());
        assert!(text.contains("avgMotorCurrent: 12.34 A"));
        assert!(text.contains("rpm:             1500"));
        assert!(text.contains("tachometerAbs:   1000"));
    }
}
