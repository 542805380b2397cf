use embassy_time::Duration;

use crate::state::TransportMode;

/// The config struct for the kvass firmware.
///
/// Every field has a default matching the RKBoard hardware, boards override
/// what differs.
#[derive(Clone, Copy, Debug, Default)]
pub struct KvassConfig<'a> {
    pub matrix: MatrixConfig,
    pub joystick: JoystickConfig,
    pub transport: TransportConfig,
    pub usb_config: KeyboardUsbConfig<'a>,
    pub storage_config: StorageConfig,
}

/// Config for the polling loop
#[derive(Clone, Copy, Debug)]
pub struct MatrixConfig {
    /// Sleep between two polling ticks
    pub scan_period: Duration,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            scan_period: Duration::from_millis(10),
        }
    }
}

/// Linear transform from an averaged raw reading to a pointer delta:
/// `(mean - center) / divisor * scale`, negated if `invert`, saturated to `i8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisConfig {
    /// Raw reading at rest
    pub center: u16,
    /// Sensitivity divisor, 0 is treated as 1
    pub divisor: u16,
    pub scale: i16,
    pub invert: bool,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            center: 2000,
            divisor: 120,
            scale: 2,
            invert: false,
        }
    }
}

/// Config for the analog joystick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoystickConfig {
    /// Raw reads averaged per axis and tick
    pub samples: u16,
    pub x: AxisConfig,
    pub y: AxisConfig,
    /// Raw value above which an analog button counts as pressed
    pub button_threshold: u16,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            samples: 16,
            x: AxisConfig::default(),
            y: AxisConfig::default(),
            button_threshold: 500,
        }
    }
}

/// Config for the transport loop
#[derive(Clone, Copy, Debug)]
pub struct TransportConfig {
    pub initial_mode: TransportMode,
    /// Upper bound for the first dequeue after a notification
    pub dequeue_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            initial_mode: TransportMode::Usb,
            dequeue_timeout: Duration::from_millis(10),
        }
    }
}

/// Configurations for usb
#[derive(Clone, Copy, Debug)]
pub struct KeyboardUsbConfig<'a> {
    /// Vender id
    pub vid: u16,
    /// Product id
    pub pid: u16,
    /// Manufacturer
    pub manufacturer: &'a str,
    /// Product name
    pub product_name: &'a str,
    /// Serial number
    pub serial_number: &'a str,
}

impl Default for KeyboardUsbConfig<'_> {
    fn default() -> Self {
        Self {
            vid: 0x303a,
            pid: 0x4002,
            manufacturer: "RKBoard",
            product_name: "RKBoard v1.0",
            serial_number: "C0FFEE",
        }
    }
}

/// Config for storage
#[derive(Clone, Copy, Debug)]
pub struct StorageConfig {
    /// Start address of local storage, MUST BE start of a sector.
    /// If start_addr is set to 0(this is the default value), the last `num_sectors` sectors will be used.
    pub start_addr: usize,
    // Number of sectors used for storage, >= 2.
    pub num_sectors: u8,
    /// Erase the storage region at startup
    pub clear_storage: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            start_addr: 0,
            num_sectors: 2,
            clear_storage: false,
        }
    }
}
