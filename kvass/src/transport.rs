//! The transport loop: moves queued reports onto the active transport.

use embassy_time::{Duration, with_timeout};

use crate::channel::{Channels, NotifyFlags};
use crate::hid::TransportDriver;
use crate::state::TransportMode;

/// What the transport loop does while a mode is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum TransportState {
    /// Forward reports to the USB driver
    Usb,
    /// The backend doesn't exist yet, only mode changes are watched
    NotImplemented(TransportMode),
    /// No transport selected, only mode changes are watched
    Unconfigured,
}

impl From<TransportMode> for TransportState {
    fn from(mode: TransportMode) -> Self {
        match mode {
            TransportMode::Usb => TransportState::Usb,
            TransportMode::Bluetooth | TransportMode::EspNow => TransportState::NotImplemented(mode),
            TransportMode::None => TransportState::Unconfigured,
        }
    }
}

/// Serializes reports onto the transport selected in [`Channels`].
///
/// Runs for the whole process lifetime. After every state exit the mode is
/// read again and the matching state entered, there's no terminal state.
pub struct TransportStateMachine<'a, T: TransportDriver> {
    channels: &'a Channels,
    usb: T,
    dequeue_timeout: Duration,
}

impl<'a, T: TransportDriver> TransportStateMachine<'a, T> {
    pub fn new(channels: &'a Channels, usb: T, dequeue_timeout: Duration) -> Self {
        Self {
            channels,
            usb,
            dequeue_timeout,
        }
    }

    pub async fn run(&mut self) {
        loop {
            self.run_once().await;
        }
    }

    /// Enter the state of the current mode and return once it exits.
    pub async fn run_once(&mut self) {
        match TransportState::from(self.channels.transport_mode()) {
            TransportState::Usb => self.run_usb().await,
            TransportState::NotImplemented(mode) => {
                warn!("{:?} transport isn't implemented, idling", mode);
                self.idle().await;
            }
            TransportState::Unconfigured => {
                info!("No transport configured, idling");
                self.idle().await;
            }
        }
    }

    async fn run_usb(&mut self) {
        info!("Entering USB transport");
        loop {
            let flags = self.channels.notification.wait(NotifyFlags::all()).await;
            if flags.contains(NotifyFlags::PROTOCOL_CHANGED) {
                // Report flags consumed with the mode change belong to the next state
                let reports = flags.difference(NotifyFlags::PROTOCOL_CHANGED);
                if !reports.is_empty() {
                    self.channels.notification.raise(reports);
                }
                return;
            }

            if !self.usb.is_ready() {
                // Nothing piles up while the host is away
                debug!("USB isn't ready, dropping queued reports");
                self.channels.discard_reports();
                continue;
            }

            if flags.contains(NotifyFlags::KEY_CHANGED) {
                self.forward_keyboard_reports().await;
            }
            if flags.contains(NotifyFlags::MOUSE_CHANGED) {
                self.forward_mouse_reports().await;
            }
        }
    }

    /// Wait for the first report with a bounded timeout, then drain the rest.
    async fn forward_keyboard_reports(&mut self) {
        let mut next = match with_timeout(self.dequeue_timeout, self.channels.keyboard.receive()).await {
            Ok(report) => Some(report),
            Err(_) => {
                debug!("Keyboard flagged but its queue is empty");
                None
            }
        };
        while let Some(report) = next {
            if let Err(e) = self.usb.send_keyboard_report(&report).await {
                error!("Failed to send keyboard report: {:?}", e);
            }
            next = self.channels.keyboard.try_receive().ok();
        }
    }

    async fn forward_mouse_reports(&mut self) {
        let mut next = match with_timeout(self.dequeue_timeout, self.channels.mouse.receive()).await {
            Ok(report) => Some(report),
            Err(_) => {
                debug!("Mouse flagged but its queue is empty");
                None
            }
        };
        while let Some(report) = next {
            if let Err(e) = self.usb.send_pointer_report(&report).await {
                error!("Failed to send mouse report: {:?}", e);
            }
            next = self.channels.mouse.try_receive().ok();
        }
    }

    /// Block until the mode changes, then drop what was queued meanwhile.
    async fn idle(&mut self) {
        self.channels.notification.wait(NotifyFlags::PROTOCOL_CHANGED).await;
        self.channels.discard_reports();
    }
}
