//! Request/response exchanges with a controller.

use std::time::Duration;

use log::{debug, trace};
use vesc_packet::{
    chuck::JoystickState,
    commands::{decode_reply, Command, CommandId, ControllerId, Reply, Request},
    frame::encode_frame,
    values::{ScanReply, TelemetryRecord},
    DecodeErrorKind,
};

use crate::{recv::receive_frame, Clock, MonotonicClock, Transport, VescConfig, VescError};

/// A connection to a controller over a [`Transport`].
///
/// The protocol carries no request ids, so a reply is taken to belong to the
/// most recent request. Every exchange borrows the connection mutably, which
/// keeps at most one request in flight.
///
/// The last telemetry record decoded successfully is kept and can be read
/// back with [`telemetry`](Self::telemetry). Failed exchanges leave it as it
/// was.
#[derive(Debug)]
pub struct VescConnection<T, C = MonotonicClock> {
    transport: Option<T>,
    clock: C,
    config: VescConfig,
    telemetry: Option<TelemetryRecord>,
}

impl<T: Transport> VescConnection<T> {
    /// Creates a connection with no transport attached yet.
    pub fn new(config: VescConfig) -> Self {
        Self::with_clock(None, MonotonicClock, config)
    }

    pub fn with_transport(transport: T, config: VescConfig) -> Self {
        Self::with_clock(Some(transport), MonotonicClock, config)
    }
}

impl<T: Transport, C: Clock> VescConnection<T, C> {
    pub fn with_clock(transport: Option<T>, clock: C, config: VescConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            telemetry: None,
        }
    }

    /// Attaches a transport, returning the one it replaces.
    pub fn attach(&mut self, transport: T) -> Option<T> {
        self.transport.replace(transport)
    }

    pub fn detach(&mut self) -> Option<T> {
        self.transport.take()
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn config(&self) -> &VescConfig {
        &self.config
    }

    /// The most recent telemetry decoded by [`request_telemetry`](Self::request_telemetry).
    pub fn telemetry(&self) -> Option<&TelemetryRecord> {
        self.telemetry.as_ref()
    }

    /// Frames and writes a request. Returns the number of bytes written.
    pub fn send(&mut self, request: impl Into<Request>) -> Result<usize, VescError> {
        let request = request.into();
        let transport = self
            .transport
            .as_mut()
            .ok_or(VescError::TransportUnavailable)?;

        let payload = request.to_payload()?;
        let frame = encode_frame(&payload)?;

        trace!("sent frame: {:x?}", frame);

        Ok(transport.write(&frame)?)
    }

    /// Waits up to `timeout` for a reply of type `R`.
    ///
    /// Valid frames carrying a different command, such as terminal output,
    /// are skipped. A frame that fails its CRC or is too short for `R` ends
    /// the wait with an error.
    pub fn recv<R: Reply>(&mut self, timeout: Duration) -> Result<R, VescError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(VescError::TransportUnavailable)?;
        let deadline = self.clock.now() + timeout;

        loop {
            let payload = receive_frame(transport, &self.clock, deadline, &self.config)?.validate()?;

            match decode_reply::<R>(&payload) {
                Ok(reply) => return Ok(reply),
                Err(err) if matches!(err.kind(), DecodeErrorKind::UnexpectedCommand { .. }) => {
                    if payload[0] == CommandId::Print as u8 {
                        debug!(
                            "controller printed: {}",
                            String::from_utf8_lossy(&payload[1..]).trim_end()
                        );
                    } else {
                        debug!("Skipping unrelated reply: {}", err);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Sends `request` and waits up to `timeout` for its reply.
    pub fn request<R: Reply>(
        &mut self,
        request: impl Into<Request>,
        timeout: Duration,
    ) -> Result<R, VescError> {
        self.send(request)?;
        self.recv(timeout)
    }

    /// Fetches a telemetry snapshot and stores it as the current record.
    pub fn request_telemetry(
        &mut self,
        target: Option<ControllerId>,
    ) -> Result<TelemetryRecord, VescError> {
        let timeout = self.config.reply_timeout;
        let record: TelemetryRecord =
            self.request(Request::new(Command::GetValues, target), timeout)?;
        self.telemetry = Some(record);
        Ok(record)
    }

    /// Lists the controllers reachable over the CAN bus of the attached one.
    pub fn scan_for_controllers(&mut self) -> Result<Vec<ControllerId>, VescError> {
        let timeout = self.config.scan_timeout;
        let reply: ScanReply = self.request(Command::PingCan, timeout)?;
        Ok(reply.controllers)
    }

    fn command(&mut self, command: Command, target: Option<ControllerId>) -> Result<(), VescError> {
        self.send(Request::new(command, target)).map(|_| ())
    }

    /// Drives the motor with `current` amps.
    pub fn set_current(&mut self, current: f32, target: Option<ControllerId>) -> Result<(), VescError> {
        self.command(Command::SetCurrent(current), target)
    }

    /// Brakes the motor with `current` amps.
    pub fn set_brake_current(
        &mut self,
        current: f32,
        target: Option<ControllerId>,
    ) -> Result<(), VescError> {
        self.command(Command::SetCurrentBrake(current), target)
    }

    /// Holds the motor at `erpm` electrical RPM (mechanical RPM times pole pairs).
    pub fn set_rpm(&mut self, erpm: i32, target: Option<ControllerId>) -> Result<(), VescError> {
        self.command(Command::SetRpm(erpm), target)
    }

    pub fn set_duty(&mut self, duty: f32, target: Option<ControllerId>) -> Result<(), VescError> {
        self.command(Command::SetDuty(duty), target)
    }

    /// Passes joystick input to the controller's nunchuck app.
    pub fn set_joystick_state(
        &mut self,
        state: &JoystickState,
        target: Option<ControllerId>,
    ) -> Result<(), VescError> {
        self.command(Command::SetChuckData(*state), target)
    }

    /// Runs the motor open loop for a few seconds. Hard on the motor; low
    /// current and low eRPM cause cogging.
    pub fn run_open_loop(
        &mut self,
        current: f32,
        erpm: i32,
        target: Option<ControllerId>,
    ) -> Result<(), VescError> {
        self.command(Command::OpenLoop { current, erpm }, target)
    }

    pub fn stop(&mut self, target: Option<ControllerId>) -> Result<(), VescError> {
        self.command(Command::Stop, target)
    }

    /// Keeps the controller's command timeout from releasing the motor.
    pub fn send_keepalive(&mut self, target: Option<ControllerId>) -> Result<(), VescError> {
        self.command(Command::Alive, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockClock, MockTransport};
    use vesc_packet::frame::decode_frame;

    fn connection(transport: MockTransport) -> VescConnection<MockTransport, MockClock> {
        VescConnection::with_clock(
            Some(transport),
            MockClock::new(Duration::from_millis(1)),
            VescConfig::default().with_poll_interval(Duration::ZERO),
        )
    }

    fn telemetry_payload(rpm: i32) -> Vec<u8> {
        let mut payload = vec![CommandId::GetValues as u8];
        payload.extend(1234i32.to_be_bytes());
        payload.extend(500i32.to_be_bytes());
        payload.extend(500i16.to_be_bytes());
        payload.extend(rpm.to_be_bytes());
        payload.extend(480i16.to_be_bytes());
        payload.extend(12345i32.to_be_bytes());
        payload.extend(0i32.to_be_bytes());
        payload.extend(1000i32.to_be_bytes());
        payload.extend(1000i32.to_be_bytes());
        payload
    }

    fn framed(payload: &[u8]) -> Vec<u8> {
        encode_frame(payload).unwrap()
    }

    #[test]
    fn telemetry_round_trip() {
        let mut transport = MockTransport::default();
        transport.queue_reply(framed(&telemetry_payload(1500)));
        let mut vesc = connection(transport);

        let record = vesc.request_telemetry(None).unwrap();
        assert_eq!(record.rpm, 1500);
        assert!((record.input_voltage - 48.0).abs() < 1e-4);
        assert_eq!(vesc.telemetry(), Some(&record));

        let written = vesc.transport().unwrap().written();
        assert_eq!(written.len(), 1);
        assert_eq!(decode_frame(&written[0]).unwrap(), [CommandId::GetValues as u8]);
    }

    #[test]
    fn forwarded_telemetry_request() {
        let mut transport = MockTransport::default();
        transport.queue_reply(framed(&telemetry_payload(-20)));
        let mut vesc = connection(transport);

        let record = vesc.request_telemetry(Some(ControllerId(9))).unwrap();
        assert_eq!(record.rpm, -20);

        let written = &vesc.transport().unwrap().written()[0];
        assert_eq!(decode_frame(written).unwrap(), [34, 9, 1, 4]);
    }

    #[test]
    fn timeout_keeps_previous_telemetry() {
        let mut transport = MockTransport::default();
        transport.queue_reply(framed(&telemetry_payload(1500)));
        let mut vesc = connection(transport);

        let first = vesc.request_telemetry(None).unwrap();
        let result = vesc.request_telemetry(None);

        assert!(matches!(result, Err(VescError::Timeout)));
        assert_eq!(vesc.telemetry(), Some(&first));
    }

    #[test]
    fn crc_failure_keeps_previous_telemetry() {
        let mut transport = MockTransport::default();
        transport.queue_reply(framed(&telemetry_payload(1500)));

        let mut corrupted = framed(&telemetry_payload(9999));
        corrupted[10] ^= 0x01;
        transport.queue_reply(corrupted);

        let mut vesc = connection(transport);
        vesc.request_telemetry(None).unwrap();

        match vesc.request_telemetry(None) {
            Err(VescError::Decode(err)) => {
                assert!(matches!(err.kind(), DecodeErrorKind::CrcMismatch { .. }))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(vesc.telemetry().map(|t| t.rpm), Some(1500));
    }

    #[test]
    fn short_telemetry_is_rejected() {
        let mut transport = MockTransport::default();
        let payload = telemetry_payload(1500);
        transport.queue_reply(framed(&payload[..20]));
        let mut vesc = connection(transport);

        match vesc.request_telemetry(None) {
            Err(VescError::Decode(err)) => assert_eq!(err.kind(), DecodeErrorKind::ShortPayload),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(vesc.telemetry().is_none());
    }

    #[test]
    fn skips_terminal_output_before_reply() {
        let mut transport = MockTransport::default();
        let mut reply = framed(b"\x15hello\n");
        reply.extend([0xEE, 0xEE]);
        reply.extend(framed(&telemetry_payload(77)));
        transport.queue_reply(reply);

        let mut vesc = connection(transport);
        assert_eq!(vesc.request_telemetry(None).unwrap().rpm, 77);
    }

    #[test]
    fn malformed_reply_is_reported() {
        let mut transport = MockTransport::default();
        let mut reply = framed(&telemetry_payload(1));
        let last = reply.len() - 1;
        reply[last] = 0x00;
        transport.queue_reply(reply);

        let mut vesc = connection(transport);
        match vesc.request_telemetry(None) {
            Err(VescError::Decode(err)) => {
                assert!(matches!(err.kind(), DecodeErrorKind::Malformed(_)))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn no_transport() {
        let mut vesc: VescConnection<MockTransport> = VescConnection::new(VescConfig::default());
        assert!(matches!(
            vesc.set_current(1.0, None),
            Err(VescError::TransportUnavailable)
        ));
        assert!(matches!(
            vesc.request_telemetry(None),
            Err(VescError::TransportUnavailable)
        ));

        vesc.attach(MockTransport::default());
        assert!(vesc.stop(None).is_ok());
        assert!(vesc.detach().is_some());
    }

    #[test]
    fn fire_and_forget_commands() {
        let mut vesc = connection(MockTransport::default());
        let target = Some(ControllerId(3));

        vesc.set_current(10.0, None).unwrap();
        vesc.set_brake_current(2.0, None).unwrap();
        vesc.set_rpm(-1200, None).unwrap();
        vesc.set_duty(0.5, None).unwrap();
        vesc.set_joystick_state(&JoystickState::default(), None).unwrap();
        vesc.run_open_loop(3.0, 1000, None).unwrap();
        vesc.stop(target).unwrap();
        vesc.send_keepalive(None).unwrap();

        let payloads: Vec<Vec<u8>> = vesc
            .transport()
            .unwrap()
            .written()
            .iter()
            .map(|frame| decode_frame(frame).unwrap())
            .collect();

        assert_eq!(payloads[0], [6, 0x00, 0x00, 0x27, 0x10]);
        assert_eq!(payloads[1], [7, 0x00, 0x00, 0x07, 0xD0]);
        assert_eq!(payloads[2], [8, 0xFF, 0xFF, 0xFB, 0x50]);
        assert_eq!(payloads[3], [5, 0x00, 0x00, 0xC3, 0x50]);
        assert_eq!(payloads[4][0], 35);
        assert_eq!(&payloads[5][1..], b"foc_openloop 3.00 1000");
        assert_eq!(payloads[6], [34, 3, 5, 6, 0, 0, 0, 0]);
        assert_eq!(payloads[7], [30]);
    }

    #[test]
    fn scan() {
        let mut transport = MockTransport::default();
        transport.queue_reply(framed(&[62, 1, 5, 12]));
        let mut vesc = connection(transport);

        assert_eq!(
            vesc.scan_for_controllers().unwrap(),
            [ControllerId(1), ControllerId(5), ControllerId(12)]
        );
    }
}
