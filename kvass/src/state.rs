use core::sync::atomic::{AtomicU8, Ordering};

/// Channel the reports are serialized onto.
///
/// Only USB is functional, Bluetooth and ESP-NOW are reserved for future
/// backends and behave like `None` until then.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportMode {
    #[default]
    Usb = 0,
    Bluetooth = 1,
    EspNow = 2,
    /// No transport has been configured yet
    None = 3,
}

impl From<u8> for TransportMode {
    fn from(mode: u8) -> Self {
        match mode {
            0 => TransportMode::Usb,
            1 => TransportMode::Bluetooth,
            2 => TransportMode::EspNow,
            _ => TransportMode::None,
        }
    }
}

/// Process wide transport mode, written by configuration requests and read by
/// the transport loop after every state exit.
pub(crate) struct AtomicTransportMode(AtomicU8);

impl AtomicTransportMode {
    pub(crate) const fn new(mode: TransportMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub(crate) fn load(&self) -> TransportMode {
        self.0.load(Ordering::Acquire).into()
    }

    pub(crate) fn store(&self, mode: TransportMode) {
        self.0.store(mode as u8, Ordering::Release);
    }
}
