//! Report types exchanged between the polling loop and the transport, and the
//! trait every transport backend implements.

use core::future::Future;

use embassy_usb::driver::EndpointError;
use usbd_hid::descriptor::{KeyboardReport, MouseReport};

use crate::KEYCODE_SLOTS;
use crate::hid_state::HidModifiers;
use crate::keycode::KeyCode;

/// Snapshot of the keyboard state: modifier byte plus up to six held keys.
///
/// Unused slots are `KeyCode::No`, held keys are packed from slot 0 in the
/// order they were pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardData {
    pub modifier: HidModifiers,
    pub keycode: [KeyCode; KEYCODE_SLOTS],
}

impl KeyboardData {
    /// Number of occupied keycode slots
    pub fn key_count(&self) -> usize {
        self.keycode.iter().filter(|k| **k != KeyCode::No).count()
    }
}

impl From<KeyboardData> for KeyboardReport {
    fn from(data: KeyboardData) -> Self {
        KeyboardReport {
            modifier: data.modifier.into_bits(),
            reserved: 0,
            leds: 0,
            keycodes: data.keycode.map(|k| k as u8),
        }
    }
}

/// Pointer delta produced by the joystick on every polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseData {
    pub button: bool,
    pub delta_x: i8,
    pub delta_y: i8,
    pub scroll_v: i8,
    pub scroll_h: i8,
}

impl From<MouseData> for MouseReport {
    fn from(data: MouseData) -> Self {
        MouseReport {
            buttons: data.button as u8,
            x: data.delta_x,
            y: data.delta_y,
            wheel: data.scroll_v,
            pan: data.scroll_h,
        }
    }
}

#[derive(PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidError {
    UsbEndpointError(EndpointError),
    UsbDisabled,
    /// The host hasn't configured the device yet
    NotReady,
}

impl From<EndpointError> for HidError {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::Disabled => HidError::UsbDisabled,
            e => HidError::UsbEndpointError(e),
        }
    }
}

/// Boundary to a physical transport. The core hands structured reports over
/// and never touches wire bytes.
pub trait TransportDriver {
    /// Whether the host side is ready to receive reports.
    fn is_ready(&self) -> bool;

    /// Transmit a keyboard report immediately.
    fn send_keyboard_report(&mut self, report: &KeyboardData) -> impl Future<Output = Result<(), HidError>>;

    /// Transmit a pointer report immediately.
    fn send_pointer_report(&mut self, report: &MouseData) -> impl Future<Output = Result<(), HidError>>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keyboard_report_conversion() {
        let mut data = KeyboardData {
            modifier: HidModifiers::new().with_left_shift(true),
            ..Default::default()
        };
        data.keycode[0] = KeyCode::A;
        data.keycode[1] = KeyCode::Escape;
        assert_eq!(data.key_count(), 2);

        let report: KeyboardReport = data.into();
        assert_eq!(report.modifier, 0b10);
        assert_eq!(report.keycodes, [0x04, 0x29, 0, 0, 0, 0]);
    }

    #[test]
    fn test_mouse_report_conversion() {
        let data = MouseData {
            button: true,
            delta_x: -8,
            delta_y: 4,
            scroll_v: 0,
            scroll_h: 0,
        };
        let report: MouseReport = data.into();
        assert_eq!(report.buttons, 1);
        assert_eq!(report.x, -8);
        assert_eq!(report.y, 4);
    }
}
