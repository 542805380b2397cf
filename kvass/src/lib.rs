//! Firmware core of the RKBoard split keyboard.
//!
//! Two loops run concurrently: the polling loop ([`keyboard::Keyboard`]) scans
//! the key matrix and samples the joystick every tick, the transport loop
//! ([`transport::TransportStateMachine`]) forwards the resulting reports to the
//! active transport. They only share the bounded queues and the notification
//! flags in [`channel::Channels`].
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod hid;
pub mod hid_state;
pub mod input_device;
pub mod keyboard;
pub mod keycode;
pub mod layout;
pub mod matrix;
pub mod state;
pub mod storage;
pub mod transport;
pub mod usb;

use embassy_futures::join::join3;
pub use embassy_futures;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
pub use embassy_time;
use embassy_usb::driver::Driver;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::channel::CHANNELS;
use crate::config::KvassConfig;
use crate::input_device::AnalogInput;
use crate::input_device::joystick::{Joystick, JoystickButton};
use crate::keyboard::Keyboard;
#[cfg(not(feature = "storage"))]
use crate::layout::BoardSide;
use crate::layout::{COL, ROW};
use crate::matrix::Matrix;
#[cfg(feature = "storage")]
use {
    crate::storage::{FlashConfigStore, SideSelector},
    embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash,
};
use crate::transport::TransportStateMachine;
use crate::usb::{UsbTransport, new_usb_builder};

pub type RawMutex = CriticalSectionRawMutex;

/// Capacity of the keyboard report queue
pub const KEYBOARD_QUEUE_SIZE: usize = 10;
/// Capacity of the mouse report queue
pub const MOUSE_QUEUE_SIZE: usize = 10;
/// Keycode slots of a boot keyboard report
pub const KEYCODE_SLOTS: usize = 6;

/// Run the kvass firmware.
///
/// Resolves the board side from the flash, sets up the USB device, then
/// runs the polling loop, the transport loop and the USB device task
/// concurrently. Never returns.
///
/// # Arguments
///
/// * `row_pins` - input pins of the matrix rows, pulled down
/// * `col_pins` - output pins of the matrix columns
/// * `joystick_x` - analog input of the horizontal joystick axis
/// * `joystick_y` - analog input of the vertical joystick axis
/// * `joystick_button` - push button of the joystick
/// * `flash` - flash holding the board side, wrap a blocking flash with [`storage::async_flash_wrapper`]
/// * `usb_driver` - embassy-usb driver of the chip
/// * `config` - firmware configuration, see [`KvassConfig`]
#[allow(clippy::too_many_arguments)]
pub async fn run_kvass<
    In: InputPin,
    Out: OutputPin,
    X: AnalogInput,
    Y: AnalogInput,
    B: JoystickButton,
    #[cfg(feature = "storage")] F: AsyncNorFlash,
    D: Driver<'static>,
>(
    row_pins: [In; ROW],
    col_pins: [Out; COL],
    joystick_x: X,
    joystick_y: Y,
    joystick_button: B,
    #[cfg(feature = "storage")] flash: F,
    usb_driver: D,
    config: KvassConfig<'static>,
) {
    let channels = &CHANNELS;
    channels.init_transport(config.transport.initial_mode);

    // The side is resolved once, before anything is scanned
    #[cfg(feature = "storage")]
    let side = {
        let mut store = FlashConfigStore::new(flash, &config.storage_config).await;
        SideSelector::load(&mut store).await
    };
    #[cfg(not(feature = "storage"))]
    let side = {
        info!("Storage is disabled, using the left layout");
        BoardSide::default()
    };

    let mut usb_builder = new_usb_builder(usb_driver, config.usb_config);
    let usb_transport = UsbTransport::new(&mut usb_builder);
    let mut usb_device = usb_builder.build();

    let matrix = Matrix::new(row_pins, col_pins);
    let joystick = Joystick::new(joystick_x, joystick_y, joystick_button, config.joystick);
    let mut keyboard = Keyboard::new(matrix, joystick, side.layout(), channels, &config.matrix);
    let mut transport = TransportStateMachine::new(channels, usb_transport, config.transport.dequeue_timeout);

    let _ = join3(keyboard.run(), transport.run(), usb_device.run()).await;
}
