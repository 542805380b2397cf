use core::sync::atomic::{AtomicBool, Ordering};

use embassy_usb::class::hid::{HidWriter, ReportId, RequestHandler};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Handler};
use static_cell::StaticCell;
use usbd_hid::descriptor::{KeyboardReport, MouseReport};

use crate::config::KeyboardUsbConfig;
use crate::hid::{HidError, KeyboardData, MouseData, TransportDriver};

/// Set while the host has the device configured
pub(crate) static USB_CONFIGURED: AtomicBool = AtomicBool::new(false);

macro_rules! add_usb_writer {
    ($usb_builder:expr, $descriptor:ty, $n:expr) => {{
        // The hid class needs its state in a static, one per descriptor type
        use usbd_hid::descriptor::SerializedDescriptor;
        paste::paste! {
            static [<$descriptor:snake:upper _STATE>]: ::static_cell::StaticCell<::embassy_usb::class::hid::State> = ::static_cell::StaticCell::new();
            static [<$descriptor:snake:upper _HANDLER>]: ::static_cell::StaticCell<$crate::usb::UsbRequestHandler> = ::static_cell::StaticCell::new();
        }

        let state = paste::paste! { [<$descriptor:snake:upper _STATE>].init(::embassy_usb::class::hid::State::new()) };
        let request_handler = paste::paste! { [<$descriptor:snake:upper _HANDLER>].init($crate::usb::UsbRequestHandler {}) };

        let hid_config = ::embassy_usb::class::hid::Config {
            report_descriptor: <$descriptor>::desc(),
            request_handler: Some(request_handler),
            poll_ms: 1,
            max_packet_size: 64,
            hid_subclass: ::embassy_usb::class::hid::HidSubclass::No,
            hid_boot_protocol: ::embassy_usb::class::hid::HidBootProtocol::None,
        };

        let w: ::embassy_usb::class::hid::HidWriter<_, $n> = ::embassy_usb::class::hid::HidWriter::new($usb_builder, state, hid_config);
        w
    }};
}

/// USB HID transport, one interface for the boot keyboard and one for the mouse.
pub struct UsbTransport<D: Driver<'static>> {
    keyboard_writer: HidWriter<'static, D, 8>,
    mouse_writer: HidWriter<'static, D, 8>,
}

impl<D: Driver<'static>> UsbTransport<D> {
    /// Add the HID interfaces to `builder`.
    ///
    /// Panics if called twice, the interface state lives in statics.
    pub fn new(builder: &mut Builder<'static, D>) -> Self {
        Self {
            keyboard_writer: add_usb_writer!(builder, KeyboardReport, 8),
            mouse_writer: add_usb_writer!(builder, MouseReport, 8),
        }
    }
}

impl<D: Driver<'static>> TransportDriver for UsbTransport<D> {
    fn is_ready(&self) -> bool {
        USB_CONFIGURED.load(Ordering::Acquire)
    }

    async fn send_keyboard_report(&mut self, report: &KeyboardData) -> Result<(), HidError> {
        ensure_configured()?;
        let report: KeyboardReport = (*report).into();
        self.keyboard_writer.write_serialize(&report).await?;
        Ok(())
    }

    async fn send_pointer_report(&mut self, report: &MouseData) -> Result<(), HidError> {
        ensure_configured()?;
        let report: MouseReport = (*report).into();
        self.mouse_writer.write_serialize(&report).await?;
        Ok(())
    }
}

/// Writes to an unconfigured device would block until the host shows up
fn ensure_configured() -> Result<(), HidError> {
    if USB_CONFIGURED.load(Ordering::Acquire) {
        Ok(())
    } else {
        Err(HidError::NotReady)
    }
}

pub(crate) fn new_usb_builder<'d, D: Driver<'d>>(driver: D, keyboard_config: KeyboardUsbConfig<'d>) -> Builder<'d, D> {
    // Create embassy-usb Config
    let mut usb_config = embassy_usb::Config::new(keyboard_config.vid, keyboard_config.pid);
    usb_config.manufacturer = Some(keyboard_config.manufacturer);
    usb_config.product = Some(keyboard_config.product_name);
    usb_config.serial_number = Some(keyboard_config.serial_number);
    usb_config.max_power = 100;

    // Required for windows compatibility.
    usb_config.max_packet_size_0 = 64;
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    const USB_BUF_SIZE: usize = 128;

    static CONFIG_DESC: StaticCell<[u8; USB_BUF_SIZE]> = StaticCell::new();
    static BOS_DESC: StaticCell<[u8; 16]> = StaticCell::new();
    static MSOS_DESC: StaticCell<[u8; 16]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; USB_BUF_SIZE]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        usb_config,
        &mut CONFIG_DESC.init([0; USB_BUF_SIZE])[..],
        &mut BOS_DESC.init([0; 16])[..],
        &mut MSOS_DESC.init([0; 16])[..],
        &mut CONTROL_BUF.init([0; USB_BUF_SIZE])[..],
    );

    static DEVICE_HANDLER: StaticCell<UsbDeviceHandler> = StaticCell::new();
    builder.handler(DEVICE_HANDLER.init(UsbDeviceHandler::new()));

    builder
}

pub(crate) struct UsbRequestHandler {}

impl RequestHandler for UsbRequestHandler {
    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        info!("Set report for {:?}: {:?}", id, data);
        OutResponse::Accepted
    }
}

pub(crate) struct UsbDeviceHandler {}

impl UsbDeviceHandler {
    fn new() -> Self {
        UsbDeviceHandler {}
    }
}

impl Handler for UsbDeviceHandler {
    fn enabled(&mut self, enabled: bool) {
        if enabled {
            info!("Device enabled");
        } else {
            info!("Device disabled");
            USB_CONFIGURED.store(false, Ordering::Release);
        }
    }

    fn reset(&mut self) {
        info!("Bus reset, the Vbus current limit is 100mA");
        USB_CONFIGURED.store(false, Ordering::Release);
    }

    fn addressed(&mut self, addr: u8) {
        info!("USB address set to: {}", addr);
    }

    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED.store(configured, Ordering::Release);
        if configured {
            info!("Device configured, it may now draw up to the configured current from Vbus.")
        } else {
            info!("Device is no longer configured, the Vbus current limit is 100mA.");
        }
    }

    fn suspended(&mut self, suspended: bool) {
        if suspended {
            info!("Device suspended");
        } else {
            info!("Device resumed");
        }
    }
}
