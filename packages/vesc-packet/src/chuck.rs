//! Nunchuck (joystick) input forwarded to the controller's nunchuck app.

use crate::encode::{Encode, MessageEncoder};

/// Joystick position and button state.
///
/// Axes span `0..=255` centred on [`JoystickState::CENTER`]; the firmware
/// applies its own deadband and scaling. The wire carries one unsigned byte
/// per axis, so values outside that span are clamped when encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoystickState {
    pub x: i16,
    pub y: i16,
    pub upper_button: bool,
    pub lower_button: bool,
}

impl JoystickState {
    pub const CENTER: i16 = 128;
}

fn axis_byte(value: i16) -> u8 {
    value.clamp(0, u8::MAX as i16) as u8
}

impl Default for JoystickState {
    fn default() -> Self {
        Self {
            x: Self::CENTER,
            y: Self::CENTER,
            upper_button: false,
            lower_button: false,
        }
    }
}

/// Wire order is x, y, lower button, upper button, then three accelerometer
/// axes that the firmware ignores for UART input.
impl Encode for JoystickState {
    fn size(&self) -> usize {
        4 + 3 * 2
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&axis_byte(self.x));
        enc.write(&axis_byte(self.y));
        enc.write(&self.lower_button);
        enc.write(&self.upper_button);
        enc.write(&[0u8; 6]);
    }
}
